//! Storage for cell-keyed values.
//!
//! [`VectorStore`] is the capability the point index is written against:
//! append, indexed get, length, iteration, sort by cell and release. Two
//! implementations are provided:
//!
//! - [`MemoryVector`]: a plain `Vec`, sorted in place.
//! - [`FileVector`]: values framed with MessagePack in a temporary file and
//!   sorted with an external merge sort, so the working set stays bounded by
//!   the sort segment size rather than the number of values.
//!
//! # Example
//!
//! ```ignore
//! use s2_tiles_core::store::{FileVector, VectorStore};
//!
//! let mut store = FileVector::new()?;
//! store.push(shape)?;
//! store.sort()?;
//! for value in store.iter() {
//!     let value = value?;
//! }
//! store.close()?;
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use extsort::{ExternalSorter, Sortable};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::cell_id::CellId;
use crate::{Error, Result};

/// Values that can be ordered by the cell they live in.
pub trait VectorKey {
    fn cell(&self) -> CellId;
}

/// Append-only sequence of values that can be sorted by cell.
///
/// Order is insertion order until [`sort`](VectorStore::sort) is called.
/// Values pushed after a sort are appended unsorted.
pub trait VectorStore<V: VectorKey> {
    /// Append a value.
    fn push(&mut self, value: V) -> Result<()>;

    /// The value at `index`, or `None` past the end.
    fn get(&self, index: usize) -> Result<Option<V>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sort ascending by cell. Values sharing a cell keep insertion order.
    fn sort(&mut self) -> Result<()>;

    /// Every value in current order.
    fn iter(&self) -> Box<dyn Iterator<Item = Result<V>> + '_>;

    /// Release the store and any resources behind it.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

// ========== In-memory store ==========

/// [`VectorStore`] backed by a `Vec`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryVector<V> {
    values: Vec<V>,
}

impl<V> MemoryVector<V> {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Borrow the stored values without cloning.
    pub fn as_slice(&self) -> &[V] {
        &self.values
    }
}

impl<V> Default for MemoryVector<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> From<Vec<V>> for MemoryVector<V> {
    fn from(values: Vec<V>) -> Self {
        Self { values }
    }
}

impl<V: VectorKey + Clone> VectorStore<V> for MemoryVector<V> {
    fn push(&mut self, value: V) -> Result<()> {
        self.values.push(value);
        Ok(())
    }

    fn get(&self, index: usize) -> Result<Option<V>> {
        Ok(self.values.get(index).cloned())
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn sort(&mut self) -> Result<()> {
        // Stable, so equal cells keep insertion order.
        self.values.sort_by_key(VectorKey::cell);
        Ok(())
    }

    fn iter(&self) -> Box<dyn Iterator<Item = Result<V>> + '_> {
        Box::new(self.values.iter().cloned().map(Ok))
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

// ========== File-backed store ==========

/// Default number of records the external sort keeps in memory per segment.
pub const DEFAULT_SEGMENT_SIZE: usize = 100_000;

/// One framed value on its way through the external sort.
///
/// The payload stays encoded, so sorting never needs to know `V`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SortRecord {
    /// Primary sort key.
    cell: u64,
    /// Insertion index, breaks ties so the sort is stable.
    seq: u64,
    /// MessagePack-encoded value.
    payload: Vec<u8>,
}

impl PartialOrd for SortRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cell
            .cmp(&other.cell)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl Sortable for SortRecord {
    fn encode<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.cell.to_le_bytes())?;
        writer.write_all(&self.seq.to_le_bytes())?;
        write_frame(writer, &self.payload)
    }

    fn decode<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut word = [0u8; 8];
        reader.read_exact(&mut word)?;
        let cell = u64::from_le_bytes(word);
        reader.read_exact(&mut word)?;
        let seq = u64::from_le_bytes(word);
        let payload = read_frame(reader)?;
        Ok(Self { cell, seq, payload })
    }
}

/// Write `bytes` with a little-endian `u32` length prefix.
fn write_frame<W: Write>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(bytes)
}

/// Read one length-prefixed frame.
fn read_frame<R: Read>(reader: &mut R) -> std::io::Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// Size of a frame holding `payload_len` bytes.
fn frame_len(payload_len: usize) -> u64 {
    4 + payload_len as u64
}

/// [`VectorStore`] backed by a temporary file.
///
/// Each value is one length-prefixed MessagePack frame; only the frame
/// offsets live in memory. Sorting streams every frame through
/// `extsort::ExternalSorter` and rewrites the file in cell order. The file
/// is deleted on [`close`](VectorStore::close) or drop.
pub struct FileVector<V> {
    file: NamedTempFile,
    offsets: Vec<u64>,
    end: u64,
    dir: Option<PathBuf>,
    segment_size: usize,
    _marker: PhantomData<fn() -> V>,
}

impl<V> FileVector<V> {
    /// Store in the system temporary directory.
    pub fn new() -> Result<Self> {
        Self::create(None)
    }

    /// Store in `dir`. Sort segments are spilled there too.
    pub fn new_in(dir: impl AsRef<Path>) -> Result<Self> {
        Self::create(Some(dir.as_ref().to_path_buf()))
    }

    fn create(dir: Option<PathBuf>) -> Result<Self> {
        let file = match &dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        Ok(Self {
            file,
            offsets: Vec::new(),
            end: 0,
            dir,
            segment_size: DEFAULT_SEGMENT_SIZE,
            _marker: PhantomData,
        })
    }

    /// Records held in memory per external sort segment.
    pub fn with_segment_size(mut self, segment_size: usize) -> Self {
        self.segment_size = segment_size.max(1);
        self
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Raw frame bytes at `index`.
    fn read_payload(&self, index: usize) -> Result<Option<Vec<u8>>> {
        let Some(&offset) = self.offsets.get(index) else {
            return Ok(None);
        };
        let mut file = self.file.as_file();
        file.seek(SeekFrom::Start(offset))?;
        Ok(Some(read_frame(&mut file)?))
    }
}

impl<V> fmt::Debug for FileVector<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileVector")
            .field("path", &self.file.path())
            .field("len", &self.offsets.len())
            .field("bytes", &self.end)
            .finish()
    }
}

fn encode_value<V: Serialize>(value: &V) -> Result<Vec<u8>> {
    rmp_serde::to_vec(value).map_err(|e| Error::Storage(format!("encode: {e}")))
}

fn decode_value<V: DeserializeOwned>(bytes: &[u8]) -> Result<V> {
    rmp_serde::from_slice(bytes).map_err(|e| Error::Storage(format!("decode: {e}")))
}

impl<V> VectorStore<V> for FileVector<V>
where
    V: VectorKey + Serialize + DeserializeOwned,
{
    fn push(&mut self, value: V) -> Result<()> {
        let bytes = encode_value(&value)?;
        let mut file = self.file.as_file();
        file.seek(SeekFrom::Start(self.end))?;
        write_frame(&mut file, &bytes)?;

        self.offsets.push(self.end);
        self.end += frame_len(bytes.len());
        Ok(())
    }

    fn get(&self, index: usize) -> Result<Option<V>> {
        match self.read_payload(index)? {
            Some(bytes) => Ok(Some(decode_value(&bytes)?)),
            None => Ok(None),
        }
    }

    fn len(&self) -> usize {
        self.offsets.len()
    }

    fn sort(&mut self) -> Result<()> {
        if self.offsets.len() < 2 {
            return Ok(());
        }

        // Frames are read sequentially; a failure stops the input early and
        // is reported once the sorter has consumed what it got.
        let mut failure: Option<Error> = None;
        let mut reader = BufReader::new(self.file.reopen()?);
        let mut seq = 0u64;
        let count = self.offsets.len() as u64;
        let records = std::iter::from_fn(|| {
            if seq >= count || failure.is_some() {
                return None;
            }
            let record = read_frame(&mut reader)
                .map_err(Error::from)
                .and_then(|payload| {
                    let value: V = decode_value(&payload)?;
                    Ok(SortRecord {
                        cell: value.cell().id(),
                        seq,
                        payload,
                    })
                });
            seq += 1;
            match record {
                Ok(record) => Some(record),
                Err(e) => {
                    failure = Some(e);
                    None
                }
            }
        });

        let mut sorter = ExternalSorter::new().with_segment_size(self.segment_size);
        if let Some(dir) = &self.dir {
            sorter = sorter.with_sort_dir(dir.clone());
        }
        let sorted = sorter.sort(records)?;
        if let Some(e) = failure {
            return Err(e);
        }

        let target = match &self.dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        let mut offsets = Vec::with_capacity(self.offsets.len());
        let mut end = 0u64;
        {
            let mut writer = BufWriter::new(target.as_file());
            for record in sorted {
                let record = record?;
                write_frame(&mut writer, &record.payload)?;
                offsets.push(end);
                end += frame_len(record.payload.len());
            }
            writer.flush()?;
        }

        if offsets.len() != self.offsets.len() {
            return Err(Error::Storage(format!(
                "sort returned {} of {} records",
                offsets.len(),
                self.offsets.len()
            )));
        }

        debug!(
            "Sorted {} records ({} bytes) in {}",
            offsets.len(),
            end,
            target.path().display()
        );

        // The previous file is removed when it drops.
        self.file = target;
        self.offsets = offsets;
        self.end = end;
        Ok(())
    }

    /// Streams frames front to back through one buffered reader. Frames are
    /// always stored in index order, so no seeks are needed.
    fn iter(&self) -> Box<dyn Iterator<Item = Result<V>> + '_> {
        let mut reader = match self.file.reopen() {
            Ok(file) => BufReader::new(file),
            Err(e) => return Box::new(std::iter::once(Err(Error::from(e)))),
        };
        let mut remaining = self.offsets.len();
        Box::new(std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let value = read_frame(&mut reader)
                .map_err(Error::from)
                .and_then(|bytes| decode_value(&bytes));
            if value.is_err() {
                remaining = 0;
            }
            Some(value)
        }))
    }

    fn close(self) -> Result<()> {
        self.file.close()?;
        Ok(())
    }
}

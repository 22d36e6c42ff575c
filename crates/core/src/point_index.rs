//! Sorted point index over leaf cells.
//!
//! Points are appended unsorted and tagged with their leaf [`CellId`]. The
//! first query after an insert sorts the backing store, after which:
//!
//! - [`PointIndex::search_range`] is a binary search plus a forward scan, and
//! - [`PointIndex::search_radius`] covers the query cap with a handful of
//!   cells, range-scans each one and keeps the candidates whose chord
//!   distance to the target is strictly below the radius.

use std::marker::PhantomData;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::angle::ChordAngle;
use crate::cap::Cap;
use crate::cell_id::CellId;
use crate::coords::Face;
use crate::point::S2Point;
use crate::store::{MemoryVector, VectorKey, VectorStore};
use crate::Result;

/// A point, its leaf cell and a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointShape<T> {
    pub cell: CellId,
    pub point: S2Point,
    pub data: T,
}

impl<T> PointShape<T> {
    pub fn new(point: S2Point, data: T) -> Self {
        Self {
            cell: CellId::from_s2_point(&point),
            point,
            data,
        }
    }
}

impl<T> VectorKey for PointShape<T> {
    fn cell(&self) -> CellId {
        self.cell
    }
}

/// Points with payloads, ordered by leaf cell on demand.
///
/// Generic over its store so the same index runs in memory or on disk:
///
/// ```ignore
/// use s2_tiles_core::{FileVector, PointIndex, ChordAngle, S2Point};
///
/// let mut index = PointIndex::with_store(FileVector::new()?);
/// index.insert_lon_lat(2.35, 48.85, "paris")?;
/// let hits = index.search_radius(S2Point::from_lon_lat(2.0, 49.0), ChordAngle::from_degrees(1.0))?;
/// ```
#[derive(Debug)]
pub struct PointIndex<T, S = MemoryVector<PointShape<T>>> {
    store: S,
    /// Set by inserts, cleared by [`PointIndex::sort`].
    dirty: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Clone> PointIndex<T> {
    /// An index held in memory.
    pub fn new() -> Self {
        Self::with_store(MemoryVector::new())
    }
}

impl<T: Clone> Default for PointIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> PointIndex<T, S>
where
    S: VectorStore<PointShape<T>>,
{
    /// An index over `store`. Existing contents are sorted on first query.
    pub fn with_store(store: S) -> Self {
        let dirty = !store.is_empty();
        Self {
            store,
            dirty,
            _marker: PhantomData,
        }
    }

    pub fn insert(&mut self, point: S2Point, data: T) -> Result<()> {
        self.store.push(PointShape::new(point, data))?;
        self.dirty = true;
        Ok(())
    }

    pub fn insert_lon_lat(&mut self, lon: f64, lat: f64, data: T) -> Result<()> {
        self.insert(S2Point::from_lon_lat(lon, lat), data)
    }

    pub fn insert_face_st(&mut self, face: Face, s: f64, t: f64, data: T) -> Result<()> {
        self.insert(S2Point::from_face_st(face, s, t), data)
    }

    /// Insert many points, stopping at the first storage error.
    pub fn insert_points<I>(&mut self, points: I) -> Result<()>
    where
        I: IntoIterator<Item = (S2Point, T)>,
    {
        for (point, data) in points {
            self.insert(point, data)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Sort the store by cell if anything was inserted since the last sort.
    pub fn sort(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.store.sort()?;
        self.dirty = false;
        debug!("Sorted point index of {} entries", self.store.len());
        Ok(())
    }

    /// Index of the first entry whose cell is `>= id`, or `len()` if none.
    pub fn lower_bound(&mut self, id: CellId) -> Result<usize> {
        self.sort()?;
        self.lower_bound_sorted(id)
    }

    fn lower_bound_sorted(&self, id: CellId) -> Result<usize> {
        let (mut lo, mut hi) = (0usize, self.store.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.store.get(mid)? {
                Some(shape) if shape.cell < id => lo = mid + 1,
                _ => hi = mid,
            }
        }
        Ok(lo)
    }

    /// Every entry with `low <= cell <= high`, in cell order.
    pub fn search_range(&mut self, low: CellId, high: CellId) -> Result<Vec<PointShape<T>>> {
        self.sort()?;
        self.scan(low, high)
    }

    fn scan(&self, low: CellId, high: CellId) -> Result<Vec<PointShape<T>>> {
        let mut out = Vec::new();
        let mut index = self.lower_bound_sorted(low)?;
        while index < self.store.len() {
            match self.store.get(index)? {
                Some(shape) if shape.cell <= high => out.push(shape),
                _ => break,
            }
            index += 1;
        }
        Ok(out)
    }

    /// Every entry strictly closer than `radius` to `target`.
    ///
    /// An empty (negative) radius matches nothing.
    pub fn search_radius(
        &mut self,
        target: S2Point,
        radius: ChordAngle,
    ) -> Result<Vec<PointShape<T>>> {
        if radius.is_empty() {
            return Ok(Vec::new());
        }
        self.sort()?;

        let cap = Cap::new(target, radius);
        let covering = cap.intersecting_cells();
        let mut out = Vec::new();
        for cell in &covering {
            let (min, max) = cell.range();
            out.extend(
                self.scan(min, max)?
                    .into_iter()
                    .filter(|shape| ChordAngle::from_points(&target, &shape.point) < radius),
            );
        }
        debug!(
            "Radius search covered {} cells and matched {} points",
            covering.len(),
            out.len()
        );
        Ok(out)
    }

    /// Every entry in cell order.
    pub fn values(&mut self) -> Result<Vec<PointShape<T>>> {
        self.sort()?;
        self.store.iter().collect()
    }

    /// Release the backing store.
    pub fn close(self) -> Result<()> {
        self.store.close()
    }
}

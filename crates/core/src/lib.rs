//! S2 cell ids, on-demand vector tiling and a sorted point index.
//!
//! The sphere is projected onto the six faces of a cube and each face is
//! divided into a 30-level quadtree. Every cell is addressed by a [`CellId`],
//! a 64-bit key whose numeric order follows a Hilbert curve over all faces.
//!
//! On top of the cell codec this crate provides:
//!
//! - [`TileStore`]: splits GeoJSON features into a pyramid of tiles per face,
//!   building deep tiles only when they are requested.
//! - [`PointIndex`]: points sorted by leaf cell, with range and radius search,
//!   backed by memory or a temporary file.
//!
//! # Examples
//!
//! ```no_run
//! use s2_tiles_core::{CellId, TileStore, TileStoreOptions};
//!
//! let data: geojson::GeoJson = std::fs::read_to_string("points.geojson")?.parse()?;
//! let mut store = TileStore::new(&data, TileStoreOptions::new(0, 14))?;
//!
//! let id = CellId::from_ij(0, 8, 8, Some(4));
//! if let Some(tile) = store.get_tile(id) {
//!     println!("{} features", tile.feature_count());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use thiserror::Error;

pub mod angle;
pub mod cap;
pub mod cell_id;
pub mod clip;
pub mod convert;
pub mod coords;
pub mod geometry;
pub mod point;
pub mod point_index;
pub mod simplify;
pub mod store;
pub mod tile;
pub mod tile_store;

pub use angle::ChordAngle;
pub use cap::Cap;
pub use cell_id::CellId;
pub use convert::{
    convert, convert_s2_features, convert_source, ConvertOptions, Projection, S2Feature,
    S2FeatureCollection, SourceData,
};
pub use coords::Face;
pub use geometry::{BBox, Coordinates, VectorFeature, VectorGeometry, VectorLine, VectorPoint};
pub use point::S2Point;
pub use point_index::{PointIndex, PointShape};
pub use store::{FileVector, MemoryVector, VectorKey, VectorStore};
pub use tile::{Layer, Tile};
pub use tile_store::{TileStore, TileStoreOptions};

/// Errors raised by the tiling and indexing APIs.
///
/// Geometry problems never show up here: features that clip or convert to
/// nothing are dropped.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid cell token: {0:?}")]
    InvalidToken(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

//! On-demand tile pyramid.
//!
//! A [`TileStore`] holds one root tile per populated face. Construction splits
//! every root down to `index_maxzoom`; deeper tiles are only built when
//! [`TileStore::get_tile`] asks for them, by splitting along the path from the
//! nearest materialized ancestor.
//!
//! # Tile lifecycle
//!
//! ```text
//! unsplit ──split──▶ split (children stored, parent transformed)
//!    │
//!    └── at maxzoom: transformed on first retrieval, never split
//! ```
//!
//! Splitting always clips children from the parent's face-space geometry
//! before the parent is simplified and transformed, and a transformed tile is
//! never split again.

use std::collections::{BTreeSet, HashMap};

use geojson::GeoJson;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::cell_id::CellId;
use crate::clip::{self, DEFAULT_BUFFER};
use crate::convert::{convert, convert_source, ConvertOptions, Projection, SourceData};
use crate::coords::{Face, NUM_FACES};
use crate::geometry::VectorFeature;
use crate::tile::Tile;
use crate::{Error, Result};

/// Deepest zoom a store may be configured for.
pub const MAX_ZOOM: u8 = 20;

/// Tile store configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileStoreOptions {
    /// Target projection. `None` infers it from the input: WM for GeoJSON,
    /// S2 for S2 features.
    pub projection: Option<Projection>,
    /// Shallowest zoom [`TileStore::get_tile`] serves.
    pub minzoom: u8,
    /// Deepest zoom, at most [`MAX_ZOOM`]. Tiles here are never split.
    pub maxzoom: u8,
    /// Zoom the constructor splits every root down to.
    pub index_maxzoom: u8,
    /// Simplification tolerance in units of a 4096-wide tile (0 disables).
    pub tolerance: f64,
    /// Buffer kept around each child when a tile is split, as a fraction of
    /// the parent's width.
    pub buffer: f64,
    /// Record lon/lat bounds on converted geometries.
    pub build_bbox: bool,
}

impl Default for TileStoreOptions {
    fn default() -> Self {
        Self {
            projection: None,
            minzoom: 0,
            maxzoom: MAX_ZOOM,
            index_maxzoom: 4,
            tolerance: 3.0,
            buffer: DEFAULT_BUFFER,
            build_bbox: false,
        }
    }
}

impl TileStoreOptions {
    /// Options serving `minzoom..=maxzoom`.
    pub fn new(minzoom: u8, maxzoom: u8) -> Self {
        Self {
            minzoom,
            maxzoom,
            ..Default::default()
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_index_maxzoom(mut self, index_maxzoom: u8) -> Self {
        self.index_maxzoom = index_maxzoom;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_buffer(mut self, buffer: f64) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_build_bbox(mut self, build_bbox: bool) -> Self {
        self.build_bbox = build_bbox;
        self
    }

    /// Reject settings the store cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.maxzoom > MAX_ZOOM {
            return Err(Error::InvalidConfig(format!(
                "maxzoom {} is above the limit of {}",
                self.maxzoom, MAX_ZOOM
            )));
        }
        if self.minzoom > self.maxzoom {
            return Err(Error::InvalidConfig(format!(
                "minzoom {} is greater than maxzoom {}",
                self.minzoom, self.maxzoom
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if !self.buffer.is_finite() || self.buffer < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "buffer must be a non-negative number, got {}",
                self.buffer
            )));
        }
        Ok(())
    }
}

/// Features split into an on-demand quadtree of tiles per face.
///
/// Not meant to be shared between writers: every call that can build tiles
/// takes `&mut self`.
#[derive(Debug, Clone)]
pub struct TileStore {
    tiles: HashMap<CellId, Tile>,
    faces: BTreeSet<Face>,
    options: TileStoreOptions,
    projection: Projection,
}

impl TileStore {
    /// Convert GeoJSON `data` and build the index down to `index_maxzoom`.
    ///
    /// Without a configured projection, GeoJSON is tiled in WM.
    pub fn new(data: &GeoJson, options: TileStoreOptions) -> Result<Self> {
        options.validate()?;
        let projection = options.projection.unwrap_or(Projection::WM);
        let features = convert(projection, data, &Self::convert_options(&options));
        Ok(Self::build(features, options, projection))
    }

    /// Convert GeoJSON or S2 features and build the index.
    ///
    /// Without a configured projection, GeoJSON is tiled in WM and S2
    /// features in S2, on the faces they declare.
    pub fn from_source(data: &SourceData, options: TileStoreOptions) -> Result<Self> {
        options.validate()?;
        let projection = options
            .projection
            .unwrap_or_else(|| data.default_projection());
        let features = convert_source(projection, data, &Self::convert_options(&options));
        Ok(Self::build(features, options, projection))
    }

    /// Build a store from features already in face space.
    pub fn from_features(features: Vec<VectorFeature>, options: TileStoreOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(
            features,
            options,
            options.projection.unwrap_or_default(),
        ))
    }

    fn convert_options(options: &TileStoreOptions) -> ConvertOptions {
        ConvertOptions {
            build_bbox: options.build_bbox,
            buffer: options.buffer,
            tolerance: options.tolerance,
            maxzoom: Some(options.maxzoom),
        }
    }

    fn build(
        features: Vec<VectorFeature>,
        options: TileStoreOptions,
        projection: Projection,
    ) -> Self {
        let mut store = Self {
            tiles: HashMap::new(),
            faces: BTreeSet::new(),
            options,
            projection,
        };

        let count = features.len();
        for feature in features {
            store.add_feature(feature);
        }

        let roots: Vec<Face> = store.faces.iter().copied().collect();
        for face in roots {
            store.split_tile(CellId::from_face(face), None, None);
        }

        info!(
            "Indexed {} {} features on {} face(s) into {} tiles (index zoom {}, max zoom {})",
            count,
            store.projection,
            store.faces.len(),
            store.tiles.len(),
            options.index_maxzoom.min(options.maxzoom),
            options.maxzoom
        );
        store
    }

    /// Add a feature to the root tile of its face.
    ///
    /// Returns `false` when the feature was not added: its face is out of
    /// range, or the face root has already been split.
    pub fn add_feature(&mut self, feature: VectorFeature) -> bool {
        if feature.face >= NUM_FACES {
            warn!("Skipping feature {:?} on invalid face {}", feature.id, feature.face);
            return false;
        }

        let id = CellId::from_face(feature.face);
        let root = self.tiles.entry(id).or_insert_with(|| Tile::new(id));
        if root.transformed {
            warn!(
                "Skipping feature {:?}: face {} has already been split",
                feature.id, feature.face
            );
            return false;
        }

        self.faces.insert(feature.face);
        root.add_feature(feature, None);
        true
    }

    /// Split tiles below `start` without recursion.
    ///
    /// With no `end`, descends until `index_maxzoom`. With an `end`, only
    /// descends into tiles containing it, down to `end_zoom` (default
    /// `maxzoom`). Tiles at `maxzoom`, empty tiles and transformed tiles are
    /// never split.
    pub fn split_tile(&mut self, start: CellId, end: Option<CellId>, end_zoom: Option<u8>) {
        let TileStoreOptions {
            maxzoom,
            index_maxzoom,
            tolerance,
            buffer,
            ..
        } = self.options;
        let end_zoom = end_zoom.unwrap_or(maxzoom);

        let mut stack = vec![start];
        let mut splits = 0usize;
        while let Some(id) = stack.pop() {
            let Some(tile) = self.tiles.get(&id) else {
                continue;
            };
            if tile.is_empty() || tile.transformed {
                continue;
            }

            let zoom = tile.zoom;
            if zoom >= maxzoom {
                continue;
            }
            match end {
                None if zoom >= index_maxzoom => continue,
                Some(end) if zoom > end_zoom || !id.contains(end) => continue,
                _ => {}
            }

            let children = clip::split_tile(tile, buffer);
            for (child_id, child) in children {
                if child.is_empty() {
                    continue;
                }
                self.tiles.insert(child_id, child);
                stack.push(child_id);
            }

            if let Some(tile) = self.tiles.get_mut(&id) {
                tile.transform(tolerance, Some(maxzoom));
            }
            splits += 1;
        }

        if splits > 0 {
            debug!(
                "Split {} tile(s) below {} ({} tiles stored)",
                splits,
                start,
                self.tiles.len()
            );
        }
    }

    /// The tile for `id`, building it from its nearest ancestor if needed.
    ///
    /// Returns `None` when `id` is outside `minzoom..=maxzoom`, on a face
    /// with no features, or covers an area no feature reaches. Every tile
    /// returned is in tile-local coordinates.
    pub fn get_tile(&mut self, id: CellId) -> Option<&Tile> {
        if !id.is_valid() {
            return None;
        }
        let zoom = id.level();
        if zoom < self.options.minzoom || zoom > self.options.maxzoom {
            return None;
        }
        if !self.faces.contains(&id.face()) {
            return None;
        }

        let mut ancestor = id;
        while !self.tiles.contains_key(&ancestor) && !ancestor.is_face() {
            ancestor = ancestor.parent(None);
        }
        self.split_tile(ancestor, Some(id), Some(zoom));

        let TileStoreOptions {
            tolerance, maxzoom, ..
        } = self.options;
        let tile = self.tiles.get_mut(&id)?;
        // Only leaves at maxzoom get here unsplit.
        tile.transform(tolerance, Some(maxzoom));
        Some(&*tile)
    }

    /// Faces holding at least one feature.
    pub fn faces(&self) -> &BTreeSet<Face> {
        &self.faces
    }

    pub fn options(&self) -> &TileStoreOptions {
        &self.options
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Number of tiles materialized so far.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// True if `id` has been materialized.
    pub fn contains_tile(&self, id: CellId) -> bool {
        self.tiles.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Coordinates, VectorGeometry, VectorLine, VectorPoint};

    fn point(face: Face, x: f64, y: f64) -> VectorFeature {
        VectorFeature::new(face, VectorGeometry::new(Coordinates::Point(VectorPoint::new(x, y))))
    }

    fn diagonal(face: Face) -> VectorFeature {
        let line = VectorLine::new(vec![VectorPoint::new(0.05, 0.05), VectorPoint::new(0.95, 0.95)]);
        VectorFeature::new(face, VectorGeometry::new(Coordinates::LineString(line)))
    }

    // ========== Options Tests ==========

    #[test]
    fn test_default_options() {
        let options = TileStoreOptions::default();
        assert_eq!(options.projection, None);
        assert_eq!(options.minzoom, 0);
        assert_eq!(options.maxzoom, 20);
        assert_eq!(options.index_maxzoom, 4);
        assert_eq!(options.tolerance, 3.0);
        assert_eq!(options.buffer, 0.0625);
        assert!(!options.build_bbox);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_invalid_options() {
        for options in [
            TileStoreOptions::new(0, 21),
            TileStoreOptions::new(5, 4),
            TileStoreOptions::default().with_tolerance(-1.0),
            TileStoreOptions::default().with_buffer(f64::NAN),
        ] {
            let err = TileStore::from_features(vec![], options).unwrap_err();
            assert!(matches!(err, Error::InvalidConfig(_)), "{:?}", options);
        }
    }

    // ========== Construction Tests ==========

    #[test]
    fn test_eager_split_to_index_maxzoom() {
        let options = TileStoreOptions::new(0, 10).with_index_maxzoom(2);
        let store = TileStore::from_features(vec![point(3, 0.3, 0.6)], options).unwrap();

        assert_eq!(store.faces().iter().copied().collect::<Vec<_>>(), vec![3]);
        // One non-empty tile per zoom 0..=2.
        assert_eq!(store.tile_count(), 3);
        assert!(store.contains_tile(CellId::from_face(3)));
        assert!(store.contains_tile(CellId::from_ij(3, 1, 2, Some(2))));
        assert!(!store.contains_tile(CellId::from_ij(3, 2, 4, Some(3))));
    }

    #[test]
    fn test_add_feature_after_split_is_rejected() {
        let mut store =
            TileStore::from_features(vec![point(0, 0.5, 0.5)], TileStoreOptions::new(0, 5)).unwrap();
        assert!(!store.add_feature(point(0, 0.1, 0.1)));
        assert!(!store.add_feature(point(7, 0.1, 0.1)));
        assert!(store.add_feature(point(2, 0.1, 0.1)));
        assert!(store.faces().contains(&2));
    }

    // ========== Lookup Tests ==========

    #[test]
    fn test_get_tile_out_of_bounds() {
        let options = TileStoreOptions::new(2, 6);
        let mut store = TileStore::from_features(vec![point(1, 0.5, 0.5)], options).unwrap();

        assert!(store.get_tile(CellId::from_face(1)).is_none());
        assert!(store.get_tile(CellId::from_ij(1, 0, 0, Some(7))).is_none());
        assert!(store.get_tile(CellId::from_ij(4, 0, 0, Some(3))).is_none());
        assert!(store.get_tile(CellId::new(0)).is_none());
    }

    #[test]
    fn test_get_tile_materializes_path_only() {
        let options = TileStoreOptions::new(0, 12).with_index_maxzoom(1);
        let mut store = TileStore::from_features(vec![diagonal(0)], options).unwrap();
        let before = store.tile_count();

        let id = CellId::from_st(0, 0.5, 0.5, Some(8));
        let tile = store.get_tile(id).unwrap();
        assert_eq!(tile.zoom, 8);
        assert!(tile.transformed);
        assert_eq!(tile.feature_count(), 1);

        // Only the branch toward the target was split, plus the siblings along it.
        let after = store.tile_count();
        assert!(after > before);
        assert!(after - before <= 4 * 8);
    }

    #[test]
    fn test_leaf_at_maxzoom_is_transformed() {
        let options = TileStoreOptions::new(0, 3).with_index_maxzoom(3).with_tolerance(0.0);
        let mut store = TileStore::from_features(vec![point(0, 0.3, 0.7)], options).unwrap();

        let id = CellId::from_st(0, 0.3, 0.7, Some(3));
        let tile = store.get_tile(id).unwrap();
        assert!(tile.transformed);
        let first = tile.clone();
        match &first.layers["default"].features[0].geometry.coordinates {
            Coordinates::Point(p) => {
                assert!((p.x - 0.4).abs() < 1e-9);
                assert!((p.y - 0.6).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }

        // A second lookup must not transform again.
        let again = store.get_tile(id).unwrap();
        assert_eq!(again, &first);
    }

    #[test]
    fn test_get_tile_empty_area() {
        let options = TileStoreOptions::new(0, 8).with_index_maxzoom(0);
        let mut store = TileStore::from_features(vec![point(0, 0.1, 0.1)], options).unwrap();
        assert!(store.get_tile(CellId::from_st(0, 0.9, 0.9, Some(5))).is_none());
        assert!(store.get_tile(CellId::from_st(0, 0.1, 0.1, Some(5))).is_some());
    }

    // ========== Source Tests ==========

    fn s2_source(face: Face, s: f64, t: f64) -> SourceData {
        serde_json::json!({
            "type": "S2FeatureCollection",
            "features": [{
                "type": "S2Feature",
                "face": face,
                "properties": { "name": "s2" },
                "geometry": { "type": "Point", "coordinates": [s, t] }
            }]
        })
        .to_string()
        .parse()
        .unwrap()
    }

    #[test]
    fn test_s2_feature_on_declared_face() {
        let mut store =
            TileStore::from_source(&s2_source(3, 0.3, 0.6), TileStoreOptions::new(0, 8)).unwrap();
        assert_eq!(store.projection(), Projection::S2);
        assert_eq!(store.faces().iter().copied().collect::<Vec<_>>(), vec![3]);

        let tile = store.get_tile(CellId::from_st(3, 0.3, 0.6, Some(5))).unwrap();
        assert_eq!((tile.face, tile.zoom, tile.i, tile.j), (3, 5, 9, 19));
        let feature = &tile.layers["default"].features[0];
        assert_eq!(feature.properties["name"], serde_json::json!("s2"));
        match &feature.geometry.coordinates {
            Coordinates::Point(p) => {
                assert!((p.x - 0.6).abs() < 1e-9);
                assert!((p.y - 0.2).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_projection_inferred_from_source() {
        let geojson: SourceData = r#"{"type": "Point", "coordinates": [0, 0]}"#.parse().unwrap();
        let store = TileStore::from_source(&geojson, TileStoreOptions::default()).unwrap();
        assert_eq!(store.projection(), Projection::WM);

        // An explicit projection wins: S2 features land on the WM plane.
        let options = TileStoreOptions::new(0, 8).with_projection(Projection::WM);
        let store = TileStore::from_source(&s2_source(3, 0.5, 0.5), options).unwrap();
        assert_eq!(store.projection(), Projection::WM);
        assert_eq!(store.faces().iter().copied().collect::<Vec<_>>(), vec![0]);
    }
}

//! Tiles and layers.
//!
//! A [`Tile`] is the set of features clipped to one cell. Until it is
//! transformed its coordinates are in face space; [`Tile::transform`] moves
//! them into the tile's own unit square exactly once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cell_id::CellId;
use crate::coords::Face;
use crate::geometry::{BBox, VectorFeature, VectorGeometry, VectorPoint};
use crate::simplify::simplify;

/// Layer used when neither the feature nor the caller names one.
pub const DEFAULT_LAYER: &str = "default";

/// A named list of features.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub features: Vec<VectorFeature>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            features: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Features for one cell, grouped by layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub face: Face,
    pub zoom: u8,
    pub i: u32,
    pub j: u32,
    pub layers: BTreeMap<String, Layer>,
    /// Set once coordinates are tile-local. Never cleared.
    pub transformed: bool,
}

impl Tile {
    /// Empty tile for the cell `id`.
    pub fn new(id: CellId) -> Self {
        let (face, zoom, i, j) = id.to_face_ij();
        Self {
            face,
            zoom,
            i,
            j,
            layers: BTreeMap::new(),
            transformed: false,
        }
    }

    /// The cell this tile covers.
    pub fn id(&self) -> CellId {
        CellId::from_ij(self.face, self.i, self.j, Some(self.zoom))
    }

    /// True when no layer holds a feature.
    pub fn is_empty(&self) -> bool {
        self.layers.values().all(Layer::is_empty)
    }

    pub fn feature_count(&self) -> usize {
        self.layers.values().map(Layer::len).sum()
    }

    /// Append a feature to its layer, creating the layer on first use.
    ///
    /// The layer is `metadata.layer`, else `layer`, else [`DEFAULT_LAYER`].
    pub fn add_feature(&mut self, feature: VectorFeature, layer: Option<&str>) {
        let name = feature
            .layer_name()
            .or(layer)
            .unwrap_or(DEFAULT_LAYER)
            .to_string();
        self.layers
            .entry(name)
            .or_insert_with_key(|name| Layer::new(name.clone()))
            .features
            .push(feature);
    }

    /// Simplify for this zoom and move every coordinate into tile space.
    ///
    /// Must run after the tile's children have been clipped from it. Does
    /// nothing once the tile has been transformed.
    pub fn transform(&mut self, tolerance: f64, maxzoom: Option<u8>) {
        if self.transformed {
            return;
        }

        let scale = (1u64 << self.zoom) as f64;
        let (ti, tj) = (self.i as f64, self.j as f64);
        for feature in self.layers.values_mut().flat_map(|l| l.features.iter_mut()) {
            if tolerance > 0.0 {
                simplify(&mut feature.geometry, tolerance, self.zoom, maxzoom);
            }
            transform_geometry(&mut feature.geometry, scale, ti, tj);
        }

        self.transformed = true;
    }
}

fn transform_geometry(geometry: &mut VectorGeometry, scale: f64, ti: f64, tj: f64) {
    geometry
        .coordinates
        .for_each_point_mut(|p| transform_point(p, scale, ti, tj));
    if let Some(bbox) = geometry.vec_bbox.as_mut() {
        *bbox = BBox::new(
            bbox.min_x * scale - ti,
            bbox.min_y * scale - tj,
            bbox.max_x * scale - ti,
            bbox.max_y * scale - tj,
        );
    }
}

/// Map a face-space point into the unit square of tile `(ti, tj)`.
#[inline]
pub fn transform_point(p: &mut VectorPoint, scale: f64, ti: f64, tj: f64) {
    p.x = p.x * scale - ti;
    p.y = p.y * scale - tj;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Coordinates, Properties, VectorLine};
    use serde_json::json;

    fn point_feature(x: f64, y: f64) -> VectorFeature {
        VectorFeature::new(0, VectorGeometry::new(Coordinates::Point(VectorPoint::new(x, y))))
    }

    // ========== Construction Tests ==========

    #[test]
    fn test_new_from_id() {
        let id = CellId::from_ij(2, 5, 9, Some(4));
        let tile = Tile::new(id);
        assert_eq!((tile.face, tile.zoom, tile.i, tile.j), (2, 4, 5, 9));
        assert_eq!(tile.id(), id);
        assert!(tile.is_empty());
        assert!(!tile.transformed);
    }

    // ========== Layer Tests ==========

    #[test]
    fn test_add_feature_layer_resolution() {
        let mut tile = Tile::new(CellId::from_face(0));
        tile.add_feature(point_feature(0.1, 0.1), None);
        tile.add_feature(point_feature(0.2, 0.2), Some("roads"));

        let mut metadata = Properties::new();
        metadata.insert("layer".into(), json!("water"));
        tile.add_feature(point_feature(0.3, 0.3).with_metadata(Some(metadata)), Some("roads"));

        assert_eq!(tile.layers.len(), 3);
        assert_eq!(tile.layers["default"].len(), 1);
        assert_eq!(tile.layers["roads"].len(), 1);
        assert_eq!(tile.layers["water"].len(), 1);
        assert_eq!(tile.layers["water"].name, "water");
        assert_eq!(tile.feature_count(), 3);
        assert!(!tile.is_empty());
    }

    // ========== Transform Tests ==========

    #[test]
    fn test_transform_to_tile_space() {
        // zoom 2, tile (1, 2) spans x in [0.25, 0.5], y in [0.5, 0.75]
        let mut tile = Tile::new(CellId::from_ij(0, 1, 2, Some(2)));
        tile.add_feature(point_feature(0.375, 0.625), None);
        tile.transform(0.0, None);

        assert!(tile.transformed);
        let geometry = &tile.layers["default"].features[0].geometry;
        assert_eq!(
            geometry.coordinates,
            Coordinates::Point(VectorPoint::new(0.5, 0.5))
        );
        assert_eq!(geometry.vec_bbox, Some(BBox::new(0.5, 0.5, 0.5, 0.5)));
    }

    #[test]
    fn test_transform_is_latched() {
        let mut tile = Tile::new(CellId::from_ij(0, 1, 1, Some(1)));
        tile.add_feature(point_feature(0.75, 0.75), None);
        tile.transform(3.0, Some(20));
        tile.transform(3.0, Some(20));
        assert_eq!(
            tile.layers["default"].features[0].geometry.coordinates,
            Coordinates::Point(VectorPoint::new(0.5, 0.5))
        );
    }

    #[test]
    fn test_transform_lines_recursively() {
        let mut tile = Tile::new(CellId::from_ij(0, 1, 0, Some(1)));
        let ring = VectorLine::new(vec![
            VectorPoint::new(0.5, 0.0),
            VectorPoint::new(1.0, 0.0),
            VectorPoint::new(1.0, 0.5),
            VectorPoint::new(0.5, 0.0),
        ]);
        tile.add_feature(
            VectorFeature::new(
                0,
                VectorGeometry::new(Coordinates::MultiPolygon(vec![vec![ring]])),
            ),
            None,
        );
        tile.transform(0.0, None);
        let bbox = tile.layers["default"].features[0]
            .geometry
            .coordinates
            .bbox()
            .unwrap();
        assert_eq!(bbox, BBox::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_transform_keeps_m_values() {
        let mut m = Properties::new();
        m.insert("time".into(), json!(42));
        let point = VectorPoint::new(0.375, 0.625).with_m(Some(m.clone()));
        let mut tile = Tile::new(CellId::from_ij(0, 1, 2, Some(2)));
        tile.add_feature(
            VectorFeature::new(0, VectorGeometry::new(Coordinates::Point(point))),
            None,
        );
        tile.transform(0.0, None);
        assert_eq!(
            tile.layers["default"].features[0].geometry.coordinates,
            Coordinates::Point(VectorPoint::new(0.5, 0.5).with_m(Some(m)))
        );
    }
}

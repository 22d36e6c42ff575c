//! Axis-aligned clipping of vector features.
//!
//! Tiles are split one axis at a time: first on `x` into a left and right half,
//! then each half on `y`. Every pass keeps the part of a geometry that falls
//! inside an interval `[k1, k2]` on the clip axis.
//!
//! # Intervals
//!
//! - **Points** use the half-open interval `[k1, k2)` so a point on a shared
//!   edge lands in exactly one child.
//! - **Lines and polygons** use the buffered closed interval
//!   `[k1 - buffer, k2 + buffer]` so strokes render without seams.
//!
//! # Offsets
//!
//! Every output line records the arc length of the source line consumed
//! before its first point. Clipping a line that leaves and re-enters the
//! interval produces several pieces whose offsets increase along the original.
//!
//! Clipping never fails. Geometry that clips to nothing is dropped.

use crate::cell_id::CellId;
use crate::geometry::{
    BBox, Coordinates, Properties, VectorFeature, VectorGeometry, VectorLine, VectorPoint,
};
use crate::tile::Tile;

/// Default buffer around a tile: 64 units of a 1024 extent.
pub const DEFAULT_BUFFER: f64 = 0.0625;

/// Which coordinate a clip pass tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    #[inline]
    fn value(self, p: &VectorPoint) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }

    /// Point on segment `a -> b` where this axis equals `k`.
    fn intersect(
        self,
        a: &VectorPoint,
        b: &VectorPoint,
        k: f64,
        z: Option<f64>,
        m: Option<&Properties>,
    ) -> VectorPoint {
        let m = m.cloned();
        match self {
            Axis::X => {
                let t = (k - a.x) / (b.x - a.x);
                VectorPoint {
                    x: k,
                    y: a.y + (b.y - a.y) * t,
                    z,
                    m,
                }
            }
            Axis::Y => {
                let t = (k - a.y) / (b.y - a.y);
                VectorPoint {
                    x: a.x + (b.x - a.x) * t,
                    y: k,
                    z,
                    m,
                }
            }
        }
    }
}

/// A line produced by [`clip_line`] with its bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipLineResult {
    pub line: VectorLine,
    pub vec_bbox: BBox,
}

// ============================================================================
// Tile Splitting
// ============================================================================

/// Split a tile's features into its four children.
///
/// Children are returned as `[bottom_left, bottom_right, top_left, top_right]`.
/// Every child tile exists even if nothing was clipped into it. Features keep
/// the name of the layer they came from.
///
/// # Arguments
///
/// * `tile` - The tile to split; its coordinates must still be in face space
/// * `buffer` - Buffer for lines and polygons, as a fraction of the tile
pub fn split_tile(tile: &Tile, buffer: f64) -> [(CellId, Tile); 4] {
    let ids = CellId::children_ij(tile.face, tile.zoom, tile.i, tile.j);
    let mut children = ids.map(|id| (id, Tile::new(id)));

    let scale = (1u64 << tile.zoom) as f64;
    let (i, j) = (tile.i as f64, tile.j as f64);

    for (name, layer) in &tile.layers {
        let left = clip_features(&layer.features, scale, i, i + 0.5, Axis::X, buffer);
        let right = clip_features(&layer.features, scale, i + 0.5, i + 1.0, Axis::X, buffer);

        for (half, bottom, top) in [(left, 0, 2), (right, 1, 3)] {
            if half.is_empty() {
                continue;
            }
            for feature in clip_features(&half, scale, j, j + 0.5, Axis::Y, buffer) {
                children[bottom].1.add_feature(feature, Some(name));
            }
            for feature in clip_features(&half, scale, j + 0.5, j + 1.0, Axis::Y, buffer) {
                children[top].1.add_feature(feature, Some(name));
            }
        }
    }

    children
}

/// Clip features to `[k1, k2]` expressed in tile units at `scale = 2^zoom`.
///
/// Bounds and buffer are divided by `scale` to get face-space values. Features
/// that clip to nothing are left out of the result.
pub fn clip_features(
    features: &[VectorFeature],
    scale: f64,
    k1: f64,
    k2: f64,
    axis: Axis,
    base_buffer: f64,
) -> Vec<VectorFeature> {
    let k1 = k1 / scale;
    let k2 = k2 / scale;
    let buffer = base_buffer / scale;

    features
        .iter()
        .filter_map(|feature| {
            let geometry = clip_geometry(&feature.geometry, axis, k1, k2, buffer);
            if geometry.is_none() {
                log::trace!(
                    "dropped {} feature {:?} outside [{}, {}] on {:?}",
                    feature.geometry.type_name(),
                    feature.id,
                    k1,
                    k2,
                    axis
                );
            }
            geometry.map(|geometry| VectorFeature {
                geometry,
                ..feature.clone()
            })
        })
        .collect()
}

/// Clip one geometry on one axis.
///
/// Points are tested against `[k1, k2)`, everything else against
/// `[k1 - buffer, k2 + buffer]`. Line strings come back as multi line strings.
/// The returned geometry's `vec_bbox` covers only the surviving coordinates.
pub fn clip_geometry(
    geometry: &VectorGeometry,
    axis: Axis,
    k1: f64,
    k2: f64,
    buffer: f64,
) -> Option<VectorGeometry> {
    let k1b = k1 - buffer;
    let k2b = k2 + buffer;

    let coordinates = match &geometry.coordinates {
        Coordinates::Point(p) => Coordinates::Point(clip_point(p, axis, k1, k2)?),
        Coordinates::MultiPoint(points) => {
            Coordinates::MultiPoint(clip_multi_point(points, axis, k1, k2)?)
        }
        Coordinates::LineString(line) => {
            Coordinates::MultiLineString(clip_line_string(line, axis, k1b, k2b)?)
        }
        Coordinates::MultiLineString(lines) => {
            Coordinates::MultiLineString(clip_multi_line_string(lines, axis, k1b, k2b)?)
        }
        Coordinates::Polygon(rings) => Coordinates::Polygon(clip_polygon(rings, axis, k1b, k2b)?),
        Coordinates::MultiPolygon(polygons) => {
            Coordinates::MultiPolygon(clip_multi_polygon(polygons, axis, k1b, k2b)?)
        }
    };

    let mut clipped = VectorGeometry::new(coordinates);
    clipped.bbox = geometry.bbox;
    Some(clipped)
}

/// Keep a point when `k1 <= value < k2`.
pub fn clip_point(point: &VectorPoint, axis: Axis, k1: f64, k2: f64) -> Option<VectorPoint> {
    let value = axis.value(point);
    (value >= k1 && value < k2).then(|| point.clone())
}

/// Keep the points with `k1 <= value < k2`; `None` when none survive.
pub fn clip_multi_point(
    points: &[VectorPoint],
    axis: Axis,
    k1: f64,
    k2: f64,
) -> Option<Vec<VectorPoint>> {
    let kept: Vec<VectorPoint> = points
        .iter()
        .filter_map(|p| clip_point(p, axis, k1, k2))
        .collect();
    (!kept.is_empty()).then_some(kept)
}

/// Clip a line into the pieces lying inside `[k1, k2]`.
pub fn clip_line_string(
    line: &VectorLine,
    axis: Axis,
    k1: f64,
    k2: f64,
) -> Option<Vec<VectorLine>> {
    clip_multi_line_string(std::slice::from_ref(line), axis, k1, k2)
}

/// Clip every line; pieces shorter than two points are discarded.
pub fn clip_multi_line_string(
    lines: &[VectorLine],
    axis: Axis,
    k1: f64,
    k2: f64,
) -> Option<Vec<VectorLine>> {
    let pieces: Vec<VectorLine> = lines
        .iter()
        .flat_map(|line| sweep(&line.points, line.offset, axis, k1, k2, false))
        .filter(|piece| piece.len() >= 2)
        .collect();
    (!pieces.is_empty()).then_some(pieces)
}

/// Clip each ring of a polygon without splitting it.
///
/// Rings that degenerate below four points are dropped. When the exterior
/// ring goes, the whole polygon goes with it.
pub fn clip_polygon(
    rings: &[VectorLine],
    axis: Axis,
    k1: f64,
    k2: f64,
) -> Option<Vec<VectorLine>> {
    let mut clipped = Vec::with_capacity(rings.len());
    for (index, ring) in rings.iter().enumerate() {
        let ring = sweep(&ring.points, ring.offset, axis, k1, k2, true)
            .into_iter()
            .next()
            .filter(|r| r.len() >= 4);
        match ring {
            Some(ring) => clipped.push(ring),
            None if index == 0 => return None,
            None => {}
        }
    }
    Some(clipped)
}

/// Clip each polygon independently, dropping those that vanish.
pub fn clip_multi_polygon(
    polygons: &[Vec<VectorLine>],
    axis: Axis,
    k1: f64,
    k2: f64,
) -> Option<Vec<Vec<VectorLine>>> {
    let kept: Vec<Vec<VectorLine>> = polygons
        .iter()
        .filter_map(|rings| clip_polygon(rings, axis, k1, k2))
        .collect();
    (!kept.is_empty()).then_some(kept)
}

/// Clip a line to a box on both axes.
///
/// Expects coordinates in a `[0, 1]` space. The box is grown by `buffer` on
/// every side; the line is clipped on `x` first and each piece then on `y`.
///
/// # Arguments
///
/// * `points` - The line to clip
/// * `bbox` - The box to keep
/// * `is_polygon` - Keep the line whole and closed instead of cutting it
/// * `offset` - Arc length already consumed before the first point
/// * `buffer` - Margin added around `bbox`
pub fn clip_line(
    points: &[VectorPoint],
    bbox: BBox,
    is_polygon: bool,
    offset: f64,
    buffer: f64,
) -> Vec<ClipLineResult> {
    let horizontal = sweep(
        points,
        offset,
        Axis::X,
        bbox.min_x - buffer,
        bbox.max_x + buffer,
        is_polygon,
    );

    horizontal
        .iter()
        .flat_map(|piece| {
            sweep(
                &piece.points,
                piece.offset,
                Axis::Y,
                bbox.min_y - buffer,
                bbox.max_y + buffer,
                is_polygon,
            )
        })
        .filter_map(|line| {
            let vec_bbox = line.bbox()?;
            Some(ClipLineResult { line, vec_bbox })
        })
        .collect()
}

/// Single pass over the edges of `points` keeping what lies in `[k1, k2]`.
///
/// Non-polygon lines are cut wherever they leave the interval. Polygon rings
/// are kept as one piece and closed if the cut left them open.
fn sweep(
    points: &[VectorPoint],
    start_offset: f64,
    axis: Axis,
    k1: f64,
    k2: f64,
    is_polygon: bool,
) -> Vec<VectorLine> {
    let Some(last_point) = points.last() else {
        return Vec::new();
    };

    let mut pieces = Vec::new();
    let mut slice: Vec<VectorPoint> = Vec::new();
    let mut slice_offset = start_offset;
    let mut acc_offset = start_offset;

    for edge in points.windows(2) {
        let (a_point, b_point) = (&edge[0], &edge[1]);
        let a = axis.value(a_point);
        let b = axis.value(b_point);
        let z = match (a_point.z, b_point.z) {
            (Some(az), Some(bz)) => Some((az + bz) / 2.0),
            (az, bz) => az.or(bz),
        };

        // Entering takes the measures of the point ahead, leaving falls
        // back to the point behind.
        let exit_m = b_point.m.as_ref().or(a_point.m.as_ref());

        // Enter or continue
        let entry = if a < k1 {
            (b > k1).then(|| axis.intersect(a_point, b_point, k1, z, b_point.m.as_ref()))
        } else if a > k2 {
            (b < k2).then(|| axis.intersect(a_point, b_point, k2, z, b_point.m.as_ref()))
        } else {
            Some(a_point.clone())
        };
        if let Some(p) = entry {
            if slice.is_empty() {
                slice_offset = acc_offset + a_point.distance(&p);
            }
            slice.push(p);
        }

        // Exit
        let mut exited = false;
        if b < k1 && a >= k1 {
            slice.push(axis.intersect(a_point, b_point, k1, z, exit_m));
            exited = true;
        }
        if b > k2 && a <= k2 {
            slice.push(axis.intersect(a_point, b_point, k2, z, exit_m));
            exited = true;
        }

        acc_offset += a_point.distance(b_point);

        if exited && !is_polygon {
            pieces.push(VectorLine::with_offset(
                std::mem::take(&mut slice),
                slice_offset,
            ));
        }
    }

    let a = axis.value(last_point);
    if a >= k1 && a <= k2 {
        if slice.is_empty() {
            slice_offset = acc_offset;
        }
        slice.push(last_point.clone());
    }

    if is_polygon && slice.len() >= 2 {
        let first = &slice[0];
        if !slice[slice.len() - 1].same_xy(first) {
            slice.push(first.clone());
        }
    }

    if !slice.is_empty() {
        pieces.push(VectorLine::with_offset(slice, slice_offset));
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pts(coords: &[(f64, f64)]) -> Vec<VectorPoint> {
        coords.iter().map(|&(x, y)| VectorPoint::new(x, y)).collect()
    }

    fn xy(line: &VectorLine) -> Vec<(f64, f64)> {
        line.points.iter().map(|p| (p.x, p.y)).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    // ========== Point Clipping Tests ==========

    #[test]
    fn test_clip_point_half_open() {
        let p = VectorPoint::new(0.5, 0.25);
        assert!(clip_point(&p, Axis::X, 0.0, 0.5).is_none());
        assert!(clip_point(&p, Axis::X, 0.5, 1.0).is_some());
        assert!(clip_point(&p, Axis::Y, 0.0, 0.5).is_some());
    }

    #[test]
    fn test_clip_multi_point_filters() {
        let points = pts(&[(0.1, 0.1), (0.6, 0.1), (0.4, 0.9)]);
        let kept = clip_multi_point(&points, Axis::X, 0.0, 0.5).unwrap();
        assert_eq!(kept.len(), 2);
        assert!(clip_multi_point(&points, Axis::X, 0.7, 1.0).is_none());
    }

    #[test]
    fn test_multi_point_bbox_from_survivors() {
        let geometry = VectorGeometry::new(Coordinates::MultiPoint(pts(&[
            (0.1, 0.1),
            (0.9, 0.9),
            (0.3, 0.2),
        ])));
        let clipped = clip_geometry(&geometry, Axis::X, 0.0, 0.5, 0.0).unwrap();
        assert_eq!(clipped.vec_bbox, Some(BBox::new(0.1, 0.1, 0.3, 0.2)));
    }

    // ========== LineString Clipping Tests ==========

    #[test]
    fn test_clip_line_crossing() {
        let line = VectorLine::new(pts(&[(-0.5, 0.5), (1.5, 0.5)]));
        let pieces = clip_line_string(&line, Axis::X, 0.0, 1.0).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(xy(&pieces[0]), vec![(0.0, 0.5), (1.0, 0.5)]);
        assert!(approx(pieces[0].offset, 0.5));
    }

    #[test]
    fn test_clip_line_outside() {
        let line = VectorLine::new(pts(&[(2.0, 2.0), (3.0, 3.0)]));
        assert!(clip_line_string(&line, Axis::X, 0.0, 1.0).is_none());
    }

    #[test]
    fn test_clip_line_inside_unchanged() {
        let line = VectorLine::with_offset(pts(&[(0.2, 0.2), (0.8, 0.8), (0.5, 0.1)]), 3.0);
        let pieces = clip_line_string(&line, Axis::Y, 0.0, 1.0).unwrap();
        assert_eq!(pieces, vec![line]);
    }

    #[test]
    fn test_clip_line_out_and_back_in() {
        // inside -> outside right -> back inside
        let line = VectorLine::new(pts(&[(0.5, 0.0), (1.5, 0.0), (1.5, 1.0), (0.5, 1.0)]));
        let pieces = clip_line_string(&line, Axis::X, 0.0, 1.0).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(xy(&pieces[0]), vec![(0.5, 0.0), (1.0, 0.0)]);
        assert_eq!(xy(&pieces[1]), vec![(1.0, 1.0), (0.5, 1.0)]);
        assert!(approx(pieces[0].offset, 0.0));
        // 1.0 along the bottom, 1.0 up, 0.5 back to x = 1
        assert!(approx(pieces[1].offset, 2.5));
    }

    #[test]
    fn test_clip_line_interpolates_z() {
        let line = VectorLine::new(vec![
            VectorPoint::new_3d(-1.0, 0.0, 10.0),
            VectorPoint::new_3d(1.0, 0.0, 20.0),
        ]);
        let pieces = clip_line_string(&line, Axis::X, 0.0, 2.0).unwrap();
        assert_eq!(pieces[0].points[0].z, Some(15.0));
        assert_eq!(pieces[0].points[1].z, Some(20.0));
    }

    fn measured(x: f64, y: f64, value: Option<i64>) -> VectorPoint {
        let m = value.map(|v| {
            let mut m = Properties::new();
            m.insert("v".to_string(), json!(v));
            m
        });
        VectorPoint::new(x, y).with_m(m)
    }

    fn measure(p: &VectorPoint) -> Option<i64> {
        p.m.as_ref()?.get("v")?.as_i64()
    }

    #[test]
    fn test_clip_line_carries_m_values() {
        // Entering takes the measures of the point ahead.
        let line = VectorLine::new(vec![measured(-1.0, 0.0, Some(0)), measured(0.5, 0.0, Some(1))]);
        let pieces = clip_line_string(&line, Axis::X, 0.0, 1.0).unwrap();
        let m: Vec<_> = pieces[0].points.iter().map(measure).collect();
        assert_eq!(m, vec![Some(1), Some(1)]);

        // Leaving takes the point ahead too.
        let line = VectorLine::new(vec![measured(0.5, 0.0, Some(1)), measured(1.5, 0.0, Some(2))]);
        let pieces = clip_line_string(&line, Axis::X, 0.0, 1.0).unwrap();
        let m: Vec<_> = pieces[0].points.iter().map(measure).collect();
        assert_eq!(m, vec![Some(1), Some(2)]);

        // ...unless it has none, then the point behind.
        let line = VectorLine::new(vec![measured(0.5, 0.0, Some(1)), measured(1.5, 0.0, None)]);
        let pieces = clip_line_string(&line, Axis::X, 0.0, 1.0).unwrap();
        assert_eq!(xy(&pieces[0]), vec![(0.5, 0.0), (1.0, 0.0)]);
        let m: Vec<_> = pieces[0].points.iter().map(measure).collect();
        assert_eq!(m, vec![Some(1), Some(1)]);
    }

    #[test]
    fn test_clip_polygon_keeps_m_values() {
        let ring = VectorLine::new(vec![
            measured(0.2, 0.2, Some(1)),
            measured(0.8, 0.2, Some(2)),
            measured(0.8, 0.8, Some(3)),
            measured(0.2, 0.8, Some(4)),
            measured(0.2, 0.2, Some(1)),
        ]);
        let clipped = clip_polygon(std::slice::from_ref(&ring), Axis::X, 0.0, 1.0).unwrap();
        assert_eq!(clipped[0], ring);
    }

    #[test]
    fn test_clip_line_touching_edge_dropped() {
        // Only the final vertex touches the interval.
        let line = VectorLine::new(pts(&[(-1.0, 0.0), (0.0, 0.0)]));
        assert!(clip_line_string(&line, Axis::X, 0.0, 1.0).is_none());
    }

    // ========== Polygon Clipping Tests ==========

    #[test]
    fn test_clip_polygon_identity() {
        let ring = VectorLine::with_offset(
            pts(&[(0.2, 0.2), (0.8, 0.2), (0.8, 0.8), (0.2, 0.8), (0.2, 0.2)]),
            1.25,
        );
        let clipped = clip_polygon(std::slice::from_ref(&ring), Axis::X, 0.0, 1.0).unwrap();
        assert_eq!(clipped, vec![ring]);
    }

    #[test]
    fn test_clip_polygon_outside() {
        let ring = VectorLine::new(pts(&[
            (2.0, 2.0),
            (3.0, 2.0),
            (3.0, 3.0),
            (2.0, 3.0),
            (2.0, 2.0),
        ]));
        assert!(clip_polygon(&[ring], Axis::X, 0.0, 1.0).is_none());
    }

    #[test]
    fn test_clip_polygon_partial_is_closed() {
        let ring = VectorLine::new(pts(&[
            (-0.5, 0.0),
            (0.5, 0.0),
            (0.5, 1.0),
            (-0.5, 1.0),
            (-0.5, 0.0),
        ]));
        let clipped = clip_polygon(&[ring], Axis::X, 0.0, 1.0).unwrap();
        assert_eq!(clipped.len(), 1);
        let ring = &clipped[0];
        assert!(ring.points.first().unwrap().same_xy(ring.points.last().unwrap()));
        for p in &ring.points {
            assert!(p.x >= 0.0 && p.x <= 1.0, "x={} escaped", p.x);
        }
    }

    #[test]
    fn test_clip_polygon_hole_dropped_exterior_kept() {
        let exterior = VectorLine::new(pts(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (0.0, 0.0),
        ]));
        let hole = VectorLine::new(pts(&[
            (0.8, 0.4),
            (0.9, 0.4),
            (0.9, 0.6),
            (0.8, 0.6),
            (0.8, 0.4),
        ]));
        let clipped = clip_polygon(&[exterior, hole], Axis::X, 0.0, 0.5).unwrap();
        assert_eq!(clipped.len(), 1);
    }

    #[test]
    fn test_clip_multi_polygon_drops_vanished() {
        let near = vec![VectorLine::new(pts(&[
            (0.1, 0.1),
            (0.2, 0.1),
            (0.2, 0.2),
            (0.1, 0.1),
        ]))];
        let far = vec![VectorLine::new(pts(&[
            (5.0, 5.0),
            (6.0, 5.0),
            (6.0, 6.0),
            (5.0, 5.0),
        ]))];
        let kept = clip_multi_polygon(&[near.clone(), far], Axis::X, 0.0, 1.0).unwrap();
        assert_eq!(kept, vec![near]);
    }

    // ========== clip_line Tests ==========

    #[test]
    fn test_clip_line_two_axes() {
        let points = pts(&[(-0.5, -0.5), (1.5, 1.5)]);
        let results = clip_line(&points, BBox::new(0.0, 0.0, 1.0, 1.0), false, 0.0, 0.0);
        assert_eq!(results.len(), 1);
        assert_eq!(xy(&results[0].line), vec![(0.0, 0.0), (1.0, 1.0)]);
        assert_eq!(results[0].vec_bbox, BBox::new(0.0, 0.0, 1.0, 1.0));
        assert!(approx(results[0].line.offset, 0.5f64.hypot(0.5)));
    }

    #[test]
    fn test_clip_line_buffer_widens_box() {
        let points = pts(&[(-0.05, 0.5), (-0.02, 0.5)]);
        let bbox = BBox::new(0.0, 0.0, 1.0, 1.0);
        assert!(clip_line(&points, bbox, false, 0.0, 0.0).is_empty());
        assert_eq!(clip_line(&points, bbox, false, 0.0, DEFAULT_BUFFER).len(), 1);
    }

    // ========== Feature Clipping Tests ==========

    #[test]
    fn test_clip_features_scales_bounds() {
        let feature = VectorFeature::new(
            0,
            VectorGeometry::new(Coordinates::Point(VectorPoint::new(0.3, 0.3))),
        )
        .with_properties(Properties::new());
        // zoom 1, tile i = 0: keep x in [0, 0.25)
        let kept = clip_features(std::slice::from_ref(&feature), 2.0, 0.0, 0.5, Axis::X, 0.0);
        assert!(kept.is_empty());
        let kept = clip_features(&[feature], 2.0, 0.5, 1.0, Axis::X, 0.0);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_split_tile_routes_points() {
        let mut tile = Tile::new(CellId::from_face(0));
        for (x, y) in [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75), (0.5, 0.5)] {
            tile.add_feature(
                VectorFeature::new(
                    0,
                    VectorGeometry::new(Coordinates::Point(VectorPoint::new(x, y))),
                ),
                Some("points"),
            );
        }

        let children = split_tile(&tile, DEFAULT_BUFFER);
        let counts: Vec<usize> = children.iter().map(|(_, t)| t.feature_count()).collect();
        // (0.5, 0.5) belongs to the top-right child only.
        assert_eq!(counts, vec![1, 1, 1, 2]);
        for (id, child) in &children {
            assert_eq!(child.id(), *id);
            assert_eq!(child.zoom, 1);
            assert!(child.layers.contains_key("points"));
        }
        assert_eq!((children[1].1.i, children[1].1.j), (1, 0));
        assert_eq!((children[2].1.i, children[2].1.j), (0, 1));
    }

    #[test]
    fn test_split_tile_buffers_lines() {
        let mut tile = Tile::new(CellId::from_face(0));
        let line = VectorLine::new(pts(&[(0.1, 0.1), (0.52, 0.1)]));
        tile.add_feature(
            VectorFeature::new(
                0,
                VectorGeometry::new(Coordinates::LineString(line)),
            ),
            None,
        );
        let children = split_tile(&tile, DEFAULT_BUFFER);
        // Inside the right child's buffer as well.
        assert_eq!(children[0].1.feature_count(), 1);
        assert_eq!(children[1].1.feature_count(), 1);
        assert!(children[2].1.is_empty());
        assert!(children[3].1.is_empty());
    }
}

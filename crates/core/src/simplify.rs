//! Zoom-relative line simplification.
//!
//! Uses Ramer-Douglas-Peucker via `geo::SimplifyIdx` so the surviving vertices
//! are copied over untouched, elevation included. The tolerance is given in
//! units of a 4096-wide tile and converted to face space for the tile's zoom:
//!
//! ```text
//! epsilon = tolerance / (2^zoom * 4096)
//! ```
//!
//! Simplification happens in place, once per materialized tile, before the
//! tile's coordinates are transformed.

use geo::{Coord, LineString, SimplifyIdx};

use crate::geometry::{Coordinates, VectorGeometry, VectorLine};

/// Tile extent the tolerance is expressed in.
pub const SIMPLIFY_EXTENT: f64 = 4096.0;

/// Simplify lines and polygon rings of `geometry` for `zoom`.
///
/// No-op for point geometries, for `tolerance <= 0`, and when `zoom` has
/// reached `maxzoom` (full detail is kept at the deepest zoom).
pub fn simplify(geometry: &mut VectorGeometry, tolerance: f64, zoom: u8, maxzoom: Option<u8>) {
    if tolerance <= 0.0 || maxzoom.is_some_and(|maxzoom| zoom >= maxzoom) {
        return;
    }
    let epsilon = tolerance / ((1u64 << zoom) as f64 * SIMPLIFY_EXTENT);

    match &mut geometry.coordinates {
        Coordinates::Point(_) | Coordinates::MultiPoint(_) => return,
        Coordinates::LineString(line) => simplify_line(line, epsilon, false),
        Coordinates::MultiLineString(lines) => {
            for line in lines {
                simplify_line(line, epsilon, false);
            }
        }
        Coordinates::Polygon(rings) => {
            for ring in rings {
                simplify_line(ring, epsilon, true);
            }
        }
        Coordinates::MultiPolygon(polygons) => {
            for ring in polygons.iter_mut().flatten() {
                simplify_line(ring, epsilon, true);
            }
        }
    }

    geometry.update_vec_bbox();
}

/// Simplify one line in place.
///
/// Lines with fewer than three points have nothing to drop. A ring that would
/// fall below four points is left as it was.
fn simplify_line(line: &mut VectorLine, epsilon: f64, is_ring: bool) {
    if line.len() < 3 {
        return;
    }

    let planar: LineString<f64> = line
        .points
        .iter()
        .map(|p| Coord { x: p.x, y: p.y })
        .collect();
    let keep = planar.simplify_idx(&epsilon);

    if is_ring && keep.len() < 4 {
        return;
    }
    if keep.len() == line.len() {
        return;
    }

    let points = keep.into_iter().map(|i| line.points[i].clone()).collect();
    line.points = points;
}

//! Spherical caps and their cell coverings.

use serde::{Deserialize, Serialize};

use crate::angle::ChordAngle;
use crate::cell_id::CellId;
use crate::coords::{MAX_LEVEL, NUM_FACES};
use crate::point::S2Point;

/// Derivative of the minimum cell width for the quadratic projection.
///
/// Every cell at level `L` is at least `MIN_WIDTH_DERIV * 2^-L` radians wide.
const MIN_WIDTH_DERIV: f64 = 2.0 * std::f64::consts::SQRT_2 / 3.0;

/// The region within `radius` of `center`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cap {
    pub center: S2Point,
    pub radius: ChordAngle,
}

impl Cap {
    /// `center` is normalized; `radius` may be empty.
    pub fn new(center: S2Point, radius: ChordAngle) -> Self {
        Self {
            center: center.normalize(),
            radius,
        }
    }

    pub fn from_lon_lat(lon: f64, lat: f64, radius: ChordAngle) -> Self {
        Self::new(S2Point::from_lon_lat(lon, lat), radius)
    }

    pub fn is_empty(&self) -> bool {
        self.radius.is_empty()
    }

    /// True when `point` (unit length) is inside or on the boundary.
    pub fn contains_point(&self, point: &S2Point) -> bool {
        ChordAngle::from_points(&self.center, point) <= self.radius
    }

    /// A small set of cells whose union covers the cap.
    ///
    /// Uses the deepest level whose cells are at least as wide as the cap's
    /// diameter, then takes the (up to four) cells meeting at the vertex
    /// nearest the center. Caps too large for that return all six faces and
    /// empty caps return nothing. The result is sorted and free of duplicates.
    pub fn intersecting_cells(&self) -> Vec<CellId> {
        if self.is_empty() {
            return Vec::new();
        }

        let level = min_width_level(self.radius.radians()) - 1;
        if level < 0 {
            return (0..NUM_FACES).map(CellId::from_face).collect();
        }

        let mut cells = CellId::from_s2_point(&self.center).vertex_neighbors(Some(level as u8));
        cells.sort_unstable();
        cells.dedup();
        cells
    }
}

/// Deepest level whose minimum cell width is still at least `value` radians.
fn min_width_level(value: f64) -> i32 {
    if value <= 0.0 {
        return MAX_LEVEL as i32;
    }
    let level = (MIN_WIDTH_DERIV / value).log2().floor();
    // `as` saturates on infinities.
    (level as i32).clamp(0, MAX_LEVEL as i32)
}

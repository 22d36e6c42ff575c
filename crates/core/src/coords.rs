//! Coordinate transforms between the spaces used by the S2 cube projection.
//!
//! The chain is:
//!
//! ```text
//! lon/lat <-> unit-sphere XYZ <-> face + (u, v) <-> face + (s, t) <-> face + (i, j)
//! ```
//!
//! - `u, v` live in `[-1, 1]` on one of the six cube faces.
//! - `s, t` live in `[0, 1]` and are a warped version of `u, v` that makes cells
//!   closer to equal-area. Three warpings are available; the quadratic one is
//!   the default used everywhere else in the crate.
//! - `i, j` are `s, t` quantized onto a 30-bit integer grid (leaf cells).
//!
//! All functions here are pure and allocation free.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// One of the six cube faces (0..=5).
pub type Face = u8;

/// Number of cube faces.
pub const NUM_FACES: u8 = 6;

/// Deepest cell level.
pub const MAX_LEVEL: u8 = 30;

/// Number of leaf cells along one edge of a face (`2^30`).
pub const MAX_SIZE: u32 = 1 << MAX_LEVEL;

/// Unit-sphere XYZ triple as used by the raw face formulas.
pub type Xyz = [f64; 3];

/// Bounding box as `[min_x, min_y, max_x, max_y]`.
pub type BBoxArray = [f64; 4];

// ============================================================================
// S/T <-> U/V warpings
// ============================================================================

/// Linear `[0, 1] -> [-1, 1]`.
#[inline]
pub fn linear_st_to_uv(s: f64) -> f64 {
    2.0 * s - 1.0
}

/// Linear `[-1, 1] -> [0, 1]`.
#[inline]
pub fn linear_uv_to_st(u: f64) -> f64 {
    0.5 * (u + 1.0)
}

/// Tangential `[0, 1] -> [-1, 1]`.
#[inline]
pub fn tan_st_to_uv(s: f64) -> f64 {
    (FRAC_PI_2 * s - FRAC_PI_4).tan()
}

/// Tangential `[-1, 1] -> [0, 1]`.
#[inline]
pub fn tan_uv_to_st(u: f64) -> f64 {
    (2.0 / PI) * (u.atan() + FRAC_PI_4)
}

/// Quadratic `[0, 1] -> [-1, 1]`.
#[inline]
pub fn quadratic_st_to_uv(s: f64) -> f64 {
    if s >= 0.5 {
        (1.0 / 3.0) * (4.0 * s * s - 1.0)
    } else {
        (1.0 / 3.0) * (1.0 - 4.0 * (1.0 - s) * (1.0 - s))
    }
}

/// Quadratic `[-1, 1] -> [0, 1]`.
#[inline]
pub fn quadratic_uv_to_st(u: f64) -> f64 {
    if u >= 0.0 {
        0.5 * (1.0 + 3.0 * u).sqrt()
    } else {
        1.0 - 0.5 * (1.0 - 3.0 * u).sqrt()
    }
}

/// Default `s -> u` warping (quadratic).
#[inline]
pub fn st_to_uv(s: f64) -> f64 {
    quadratic_st_to_uv(s)
}

/// Default `u -> s` warping (quadratic).
#[inline]
pub fn uv_to_st(u: f64) -> f64 {
    quadratic_uv_to_st(u)
}

// ============================================================================
// S/T <-> I/J quantization
// ============================================================================

/// Quantize `s` onto the leaf grid.
///
/// The result is clamped to `[0, 2^30 - 1]`, so `s = 1.0` lands on the last
/// leaf rather than one past it.
#[inline]
pub fn st_to_ij(s: f64) -> u32 {
    let scaled = (MAX_SIZE as f64 * s).floor();
    scaled.clamp(0.0, (MAX_SIZE - 1) as f64) as u32
}

/// Inverse of [`st_to_ij`] (returns the low corner of the leaf).
#[inline]
pub fn ij_to_st(i: u32) -> f64 {
    i as f64 / MAX_SIZE as f64
}

/// Convert an `si`/`ti` value (leaf grid doubled, so cell centers are integral)
/// to `s`/`t`.
#[inline]
pub fn si_ti_to_st(si: u64) -> f64 {
    si as f64 / 2_147_483_648.0
}

// ============================================================================
// Face U/V <-> XYZ
// ============================================================================

/// Face + `(u, v)` to a (non-normalized) XYZ point.
pub fn face_uv_to_xyz(face: Face, u: f64, v: f64) -> Xyz {
    match face {
        0 => [1.0, u, v],
        1 => [-u, 1.0, v],
        2 => [-u, -v, 1.0],
        3 => [-1.0, -v, -u],
        4 => [v, -1.0, -u],
        _ => [v, u, -1.0],
    }
}

/// Project an XYZ point onto the given face's `(u, v)` plane.
///
/// The point does not have to lie on that face; the result is then outside
/// `[-1, 1]`.
pub fn face_xyz_to_uv(face: Face, xyz: Xyz) -> (f64, f64) {
    let [x, y, z] = xyz;
    match face {
        0 => (y / x, z / x),
        1 => (-x / y, z / y),
        2 => (-x / z, -y / z),
        3 => (z / x, y / x),
        4 => (z / y, -x / y),
        _ => (-y / z, -x / z),
    }
}

/// Face containing an XYZ point: dominant axis, offset by 3 when negative.
pub fn xyz_to_face(xyz: Xyz) -> Face {
    let [ax, ay, az] = [xyz[0].abs(), xyz[1].abs(), xyz[2].abs()];
    let mut face: usize = if ax > ay {
        if ax > az {
            0
        } else {
            2
        }
    } else if ay > az {
        1
    } else {
        2
    };
    if xyz[face] < 0.0 {
        face += 3;
    }
    face as Face
}

/// XYZ to face + `(u, v)`.
pub fn xyz_to_face_uv(xyz: Xyz) -> (Face, f64, f64) {
    let face = xyz_to_face(xyz);
    let (u, v) = face_xyz_to_uv(face, xyz);
    (face, u, v)
}

/// Right-handed normal of the edge running along `+v` at the given `u`.
pub fn u_norm(face: Face, u: f64) -> Xyz {
    match face {
        0 => [u, -1.0, 0.0],
        1 => [1.0, u, 0.0],
        2 => [1.0, 0.0, u],
        3 => [-u, 0.0, 1.0],
        4 => [0.0, -u, 1.0],
        _ => [0.0, -1.0, -u],
    }
}

/// Right-handed normal of the edge running along `+u` at the given `v`.
pub fn v_norm(face: Face, v: f64) -> Xyz {
    match face {
        0 => [-v, 0.0, 1.0],
        1 => [0.0, -v, 1.0],
        2 => [0.0, -1.0, -v],
        3 => [v, -1.0, 0.0],
        4 => [1.0, v, 0.0],
        _ => [1.0, 0.0, v],
    }
}

// ============================================================================
// Lon/Lat <-> XYZ
// ============================================================================

/// Longitude/latitude in degrees to a unit XYZ vector.
pub fn lon_lat_to_xyz(lon: f64, lat: f64) -> Xyz {
    let (lon, lat) = (lon.to_radians(), lat.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// XYZ (any length) to longitude/latitude in degrees.
pub fn xyz_to_lon_lat(xyz: Xyz) -> (f64, f64) {
    let [x, y, z] = xyz;
    let lon = y.atan2(x).to_degrees();
    let lat = z.atan2((x * x + y * y).sqrt()).to_degrees();
    (lon, lat)
}

// ============================================================================
// Tile helpers
// ============================================================================

/// Tile `(x, y)` at `zoom` that contains an `(s, t)` coordinate.
pub fn tile_xy_from_st_zoom(s: f64, t: f64, zoom: u8) -> (i64, i64) {
    let scale = (1u64 << zoom) as f64;
    ((s * scale).floor() as i64, (t * scale).floor() as i64)
}

/// Tile `(x, y)` at `zoom` that contains a `(u, v)` coordinate.
pub fn tile_xy_from_uv_zoom(u: f64, v: f64, zoom: u8) -> (i64, i64) {
    tile_xy_from_st_zoom(uv_to_st(u), uv_to_st(v), zoom)
}

/// `[u_min, v_min, u_max, v_max]` of tile `(u, v)` at `zoom`, using the linear
/// layout of tiles across `[-1, 1]`.
pub fn bbox_uv(u: u32, v: u32, zoom: u8) -> BBoxArray {
    let division = 2.0 / (1u64 << zoom) as f64;
    let (u, v) = (u as f64, v as f64);
    [
        division * u - 1.0,
        division * v - 1.0,
        division * (u + 1.0) - 1.0,
        division * (v + 1.0) - 1.0,
    ]
}

/// `[s_min, t_min, s_max, t_max]` of tile `(s, t)` at `zoom`.
pub fn bbox_st(s: u32, t: u32, zoom: u8) -> BBoxArray {
    let division = 1.0 / (1u64 << zoom) as f64;
    let (s, t) = (s as f64, t as f64);
    [
        division * s,
        division * t,
        division * (s + 1.0),
        division * (t + 1.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    // ========== Warping Tests ==========

    #[test]
    fn test_quadratic_round_trip() {
        for k in 0..=100 {
            let s = k as f64 / 100.0;
            let back = quadratic_uv_to_st(quadratic_st_to_uv(s));
            assert!((back - s).abs() < EPS, "s={} back={}", s, back);
        }
    }

    #[test]
    fn test_quadratic_fixed_points() {
        assert_eq!(quadratic_st_to_uv(0.5), 0.0);
        assert!((quadratic_st_to_uv(0.0) + 1.0).abs() < EPS);
        assert!((quadratic_st_to_uv(1.0) - 1.0).abs() < EPS);
        assert_eq!(quadratic_uv_to_st(0.0), 0.5);
    }

    #[test]
    fn test_linear_and_tan_round_trip() {
        for k in 0..=20 {
            let s = k as f64 / 20.0;
            assert!((linear_uv_to_st(linear_st_to_uv(s)) - s).abs() < EPS);
            assert!((tan_uv_to_st(tan_st_to_uv(s)) - s).abs() < 1e-9);
        }
    }

    // ========== Quantization Tests ==========

    #[test]
    fn test_st_to_ij_boundaries() {
        assert_eq!(st_to_ij(0.0), 0);
        assert_eq!(st_to_ij(1.0), MAX_SIZE - 1);
        assert_eq!(st_to_ij(-0.5), 0);
        assert_eq!(st_to_ij(2.0), MAX_SIZE - 1);
        assert_eq!(st_to_ij(0.5), MAX_SIZE / 2);
    }

    #[test]
    fn test_ij_to_st() {
        assert_eq!(ij_to_st(0), 0.0);
        assert_eq!(ij_to_st(MAX_SIZE / 2), 0.5);
        assert_eq!(st_to_ij(ij_to_st(123_456_789)), 123_456_789);
    }

    // ========== Face Tests ==========

    #[test]
    fn test_face_centers() {
        for face in 0..NUM_FACES {
            let xyz = face_uv_to_xyz(face, 0.0, 0.0);
            assert_eq!(xyz_to_face(xyz), face);
            let (f, u, v) = xyz_to_face_uv(xyz);
            assert_eq!(f, face);
            assert!(u.abs() < EPS && v.abs() < EPS);
        }
    }

    #[test]
    fn test_face_uv_round_trip() {
        for face in 0..NUM_FACES {
            let xyz = face_uv_to_xyz(face, 0.3, -0.7);
            let (u, v) = face_xyz_to_uv(face, xyz);
            assert!((u - 0.3).abs() < EPS);
            assert!((v + 0.7).abs() < EPS);
        }
    }

    #[test]
    fn test_lon_lat_round_trip() {
        let xyz = lon_lat_to_xyz(-122.4, 37.8);
        let (lon, lat) = xyz_to_lon_lat(xyz);
        assert!((lon + 122.4).abs() < 1e-10);
        assert!((lat - 37.8).abs() < 1e-10);
    }

    #[test]
    fn test_lon_lat_faces() {
        assert_eq!(xyz_to_face(lon_lat_to_xyz(0.0, 0.0)), 0);
        assert_eq!(xyz_to_face(lon_lat_to_xyz(90.0, 0.0)), 1);
        assert_eq!(xyz_to_face(lon_lat_to_xyz(0.0, 90.0)), 2);
        assert_eq!(xyz_to_face(lon_lat_to_xyz(180.0, 0.0)), 3);
        assert_eq!(xyz_to_face(lon_lat_to_xyz(-90.0, 0.0)), 4);
        assert_eq!(xyz_to_face(lon_lat_to_xyz(0.0, -90.0)), 5);
    }

    // ========== Tile Helper Tests ==========

    #[test]
    fn test_bbox_st() {
        assert_eq!(bbox_st(0, 0, 0), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(bbox_st(1, 0, 1), [0.5, 0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_bbox_uv() {
        assert_eq!(bbox_uv(0, 0, 0), [-1.0, -1.0, 1.0, 1.0]);
        assert_eq!(bbox_uv(1, 1, 1), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_tile_xy_from_st_zoom() {
        assert_eq!(tile_xy_from_st_zoom(0.5, 0.5, 4), (8, 8));
        assert_eq!(tile_xy_from_st_zoom(0.99, 0.01, 1), (1, 0));
        assert_eq!(tile_xy_from_uv_zoom(0.0, 0.0, 2), (2, 2));
    }
}

//! 64-bit S2 cell identifiers.
//!
//! A [`CellId`] names one node of the six-face, 30-level quadtree laid over the
//! sphere. The layout is:
//!
//! ```text
//! id = [face: 3 bits][hilbert position: 2 * level bits][1][0 ... 0]
//! ```
//!
//! The single `1` after the position is the sentinel: for a cell at level `L`
//! the lowest set bit sits at `2 * (30 - L)`. Ordering ids as plain `u64`
//! values walks the Hilbert curve across faces 0 through 5, and every cell's
//! descendants occupy the contiguous interval returned by [`CellId::range`].
//!
//! # Hilbert Lookup
//!
//! Encoding and decoding go four bits of `i`/`j` (eight bits of curve position)
//! at a time through a 1024-entry table per direction. The table is a pure
//! function of the curve definition and is built once per process on first use.
//!
//! # Example
//!
//! ```
//! use s2_tiles_core::cell_id::CellId;
//!
//! let leaf = CellId::from_lon_lat(-122.4, 37.8);
//! let tile = leaf.parent(Some(10));
//!
//! assert!(leaf.is_leaf());
//! assert_eq!(tile.level(), 10);
//! assert!(tile.contains(leaf));
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::coords::{
    face_uv_to_xyz, ij_to_st, si_ti_to_st, st_to_ij, st_to_uv, u_norm, uv_to_st, v_norm,
    xyz_to_face_uv, Face, MAX_LEVEL, MAX_SIZE, NUM_FACES,
};
use crate::point::S2Point;
use crate::{Error, Result};

/// Bits used for the Hilbert position plus the sentinel.
pub const POS_BITS: u32 = 2 * MAX_LEVEL as u32 + 1;

/// Subtracted (or added) by `next`/`prev` to wrap between face 5 and face 0.
pub const WRAP_OFFSET: u64 = (NUM_FACES as u64) << POS_BITS;

/// Orientation bit flipping `i` and `j`.
const SWAP_MASK: u8 = 0x01;
/// Orientation bit reversing traversal direction.
const INVERT_MASK: u8 = 0x02;

const LOOKUP_BITS: u32 = 4;
const LOOKUP_SIZE: usize = 1 << (2 * LOOKUP_BITS + 2);

/// For each child position, the orientation change applied to that child.
const POS_TO_ORIENTATION: [u8; 4] = [SWAP_MASK, 0, 0, INVERT_MASK | SWAP_MASK];

/// For each orientation and child position, the `ij` quadrant (`i << 1 | j`).
const POS_TO_IJ: [[u8; 4]; 4] = [[0, 1, 3, 2], [0, 2, 3, 1], [3, 2, 0, 1], [3, 1, 0, 2]];

/// Every set bit is a level where a `00` suffix pair flips the swap orientation.
const ORIENTATION_FLIP_MASK: u64 = 0x1111_1111_1111_1110;

/// Both directions of the 4-level Hilbert lookup.
///
/// - `pos[iiiijjjjoo] = ppppppppoo`
/// - `ij[ppppppppoo] = iiiijjjjoo`
struct HilbertLookup {
    pos: [u16; LOOKUP_SIZE],
    ij: [u16; LOOKUP_SIZE],
}

impl HilbertLookup {
    fn build() -> Self {
        let mut table = Self {
            pos: [0; LOOKUP_SIZE],
            ij: [0; LOOKUP_SIZE],
        };
        for orientation in 0..4 {
            table.init_cell(0, 0, 0, orientation, 0, orientation);
        }
        table
    }

    fn init_cell(
        &mut self,
        level: u32,
        i: u16,
        j: u16,
        orig_orientation: u8,
        pos: u16,
        orientation: u8,
    ) {
        if level == LOOKUP_BITS {
            let ij = (i << LOOKUP_BITS) + j;
            self.pos[((ij << 2) + orig_orientation as u16) as usize] =
                (pos << 2) + orientation as u16;
            self.ij[((pos << 2) + orig_orientation as u16) as usize] =
                (ij << 2) + orientation as u16;
            return;
        }

        let quadrants = POS_TO_IJ[orientation as usize];
        for (child, &r) in quadrants.iter().enumerate() {
            self.init_cell(
                level + 1,
                (i << 1) + (r >> 1) as u16,
                (j << 1) + (r & 1) as u16,
                orig_orientation,
                (pos << 2) + child as u16,
                orientation ^ POS_TO_ORIENTATION[child],
            );
        }
    }
}

static LOOKUP: LazyLock<HilbertLookup> = LazyLock::new(HilbertLookup::build);

/// Lowest-set-bit value for a cell at `level`.
#[inline]
fn lsb_for_level(level: u8) -> u64 {
    1u64 << (2 * (MAX_LEVEL - level.min(MAX_LEVEL)) as u32)
}

/// Edge length of a cell at `level`, in leaf units.
#[inline]
pub fn size_ij(level: u8) -> u32 {
    1u32 << (MAX_LEVEL - level.min(MAX_LEVEL))
}

/// Edge length of a cell at `level`, in `s`/`t` units.
#[inline]
pub fn size_st(level: u8) -> f64 {
    ij_to_st(size_ij(level))
}

/// A cell in the S2 hierarchy, encoded as a Hilbert-ordered `u64`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(u64);

impl CellId {
    /// Wrap a raw id. No validation is performed.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw 64-bit value.
    pub const fn id(&self) -> u64 {
        self.0
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// The level-0 cell covering an entire face.
    pub fn from_face(face: Face) -> Self {
        Self(((face as u64) << POS_BITS) + lsb_for_level(0))
    }

    /// Cell at `level` containing the Hilbert position `pos` on `face`.
    pub fn from_face_pos_level(face: Face, pos: u64, level: u8) -> Self {
        Self(((face as u64) << POS_BITS).wrapping_add(pos | 1)).parent(Some(level))
    }

    /// Cell at `level` whose distance along the whole curve is `distance`.
    pub fn from_distance(distance: u64, level: u8) -> Self {
        let shift = 2 * (MAX_LEVEL - level.min(MAX_LEVEL)) as u32;
        Self((distance << (shift + 1)).wrapping_add(1u64 << shift))
    }

    /// Leaf cell containing a longitude/latitude in degrees.
    pub fn from_lon_lat(lon: f64, lat: f64) -> Self {
        Self::from_s2_point(&S2Point::from_lon_lat(lon, lat))
    }

    /// Leaf cell containing a point on the sphere.
    pub fn from_s2_point(point: &S2Point) -> Self {
        let (face, i, j) = point.to_face_ij();
        Self::from_ij(face, i, j, None)
    }

    /// Cell containing face `(u, v)`, optionally coarsened to `level`.
    pub fn from_uv(face: Face, u: f64, v: f64, level: Option<u8>) -> Self {
        Self::from_st(face, uv_to_st(u), uv_to_st(v), level)
    }

    /// Cell containing face `(s, t)`, optionally coarsened to `level`.
    pub fn from_st(face: Face, s: f64, t: f64, level: Option<u8>) -> Self {
        let leaf = Self::from_ij(face, st_to_ij(s), st_to_ij(t), None);
        match level {
            Some(level) => leaf.parent(Some(level)),
            None => leaf,
        }
    }

    /// Cell from face + `(i, j)`.
    ///
    /// Without a level, `i`/`j` are leaf coordinates and the leaf cell is
    /// returned. With a level, `i`/`j` are coordinates on that level's grid
    /// (`0 .. 2^level`) and the cell at that level is returned.
    pub fn from_ij(face: Face, i: u32, j: u32, level: Option<u8>) -> Self {
        let shift = level.map_or(0, |l| (MAX_LEVEL - l.min(MAX_LEVEL)) as u32);
        let i = (i as u64) << shift;
        let j = (j as u64) << shift;
        let lookup = &*LOOKUP;

        let mut n: u64 = (face as u64) << (POS_BITS - 1);
        // Odd faces start with the swapped orientation so every face is right-handed.
        let mut bits: u64 = (face & SWAP_MASK) as u64;
        let mask = (1u64 << LOOKUP_BITS) - 1;
        for k in (0..8u32).rev() {
            let offset = k * LOOKUP_BITS;
            bits += ((i >> offset) & mask) << (LOOKUP_BITS + 2);
            bits += ((j >> offset) & mask) << 2;
            bits = lookup.pos[(bits as usize) & (LOOKUP_SIZE - 1)] as u64;
            n |= (bits >> 2) << (k * 2 * LOOKUP_BITS);
            bits &= (SWAP_MASK | INVERT_MASK) as u64;
        }

        let id = Self((n << 1) | 1);
        match level {
            Some(level) => id.parent(Some(level)),
            None => id,
        }
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Face, leaf `(i, j)` and Hilbert orientation of this cell.
    ///
    /// For a non-leaf cell `(i, j)` is a leaf near the cell center. Passing a
    /// level shifts `(i, j)` down to that level's grid.
    pub fn to_ij(&self, level: Option<u8>) -> (Face, u32, u32, u8) {
        let lookup = &*LOOKUP;
        let face = self.face();
        let mut bits: u32 = (face & SWAP_MASK) as u32;
        let mut i: u32 = 0;
        let mut j: u32 = 0;

        for k in (0..8u32).rev() {
            // The first chunk only holds 4 position bits; the rest is face.
            let nbits = if k == 7 { MAX_LEVEL as u32 - 7 * LOOKUP_BITS } else { LOOKUP_BITS };
            let chunk = (self.0 >> (k * 2 * LOOKUP_BITS + 1)) & ((1u64 << (2 * nbits)) - 1);
            bits += (chunk as u32) << 2;
            bits = lookup.ij[bits as usize] as u32;
            i += (bits >> (LOOKUP_BITS + 2)) << (k * LOOKUP_BITS);
            j += ((bits >> 2) & ((1 << LOOKUP_BITS) - 1)) << (k * LOOKUP_BITS);
            bits &= (SWAP_MASK | INVERT_MASK) as u32;
        }

        // Each `00` pair below the sentinel flips the swap bit once more.
        if self.lsb() & ORIENTATION_FLIP_MASK != 0 {
            bits ^= SWAP_MASK as u32;
        }

        if let Some(level) = level {
            let shift = MAX_LEVEL - level.min(MAX_LEVEL);
            i >>= shift;
            j >>= shift;
        }

        (face, i, j, bits as u8)
    }

    /// `(face, zoom, i, j)` with `i`/`j` on this cell's own level grid.
    pub fn to_face_ij(&self) -> (Face, u8, u32, u32) {
        let zoom = self.level();
        let (face, i, j, _) = self.to_ij(Some(zoom));
        (face, zoom, i, j)
    }

    /// Face + `(s, t)` of the leaf returned by [`CellId::to_ij`].
    pub fn to_st(&self) -> (Face, f64, f64) {
        let (face, i, j, _) = self.to_ij(None);
        (face, ij_to_st(i), ij_to_st(j))
    }

    /// Face + `(u, v)` of the leaf returned by [`CellId::to_ij`].
    pub fn to_uv(&self) -> (Face, f64, f64) {
        let (face, s, t) = self.to_st();
        (face, st_to_uv(s), st_to_uv(t))
    }

    /// Longitude/latitude in degrees.
    pub fn to_lon_lat(&self) -> (f64, f64) {
        self.to_s2_point().to_lon_lat()
    }

    /// Unit-length point for this cell.
    pub fn to_s2_point(&self) -> S2Point {
        let (face, u, v) = self.to_uv();
        S2Point::from_face_uv(face, u, v)
    }

    // ========================================================================
    // Bit algebra
    // ========================================================================

    pub fn face(&self) -> Face {
        (self.0 >> POS_BITS) as Face
    }

    /// Hilbert position within the face (sentinel included).
    pub fn pos(&self) -> u64 {
        self.0 & (u64::MAX >> 3)
    }

    /// Level 0 (face) through 30 (leaf).
    pub fn level(&self) -> u8 {
        let zero_pairs = self.0.trailing_zeros().min(2 * MAX_LEVEL as u32) / 2;
        MAX_LEVEL - zero_pairs as u8
    }

    /// The sentinel bit.
    #[inline]
    pub fn lsb(&self) -> u64 {
        self.0 & self.0.wrapping_neg()
    }

    /// Position along the whole curve, in units of cells at `level`.
    pub fn distance(&self, level: Option<u8>) -> u64 {
        let level = level.unwrap_or_else(|| self.level()).min(MAX_LEVEL);
        self.0 >> (2 * (MAX_LEVEL - level) as u32 + 1)
    }

    pub fn is_face(&self) -> bool {
        self.0 & (lsb_for_level(0) - 1) == 0
    }

    pub fn is_leaf(&self) -> bool {
        self.0 & 1 == 1
    }

    /// Face in range and sentinel on an even bit.
    pub fn is_valid(&self) -> bool {
        self.face() < NUM_FACES && self.lsb() & 0x1555_5555_5555_5555 != 0
    }

    /// Ancestor at `level`, or the immediate parent when `level` is `None`.
    ///
    /// The immediate parent of a face cell is not a valid cell.
    pub fn parent(&self, level: Option<u8>) -> Self {
        let new_lsb = match level {
            Some(level) => lsb_for_level(level),
            None => self.lsb() << 2,
        };
        Self((self.0 & new_lsb.wrapping_neg()) | new_lsb)
    }

    /// Child at Hilbert position `pos` (0..=3). A leaf is its own child.
    pub fn child(&self, pos: u8) -> Self {
        let new_lsb = self.lsb() >> 2;
        let step = (2 * (pos & 3) as i64 - 3) as u64;
        Self(self.0.wrapping_add(step.wrapping_mul(new_lsb)))
    }

    /// All four children.
    ///
    /// Orientation 0 yields Hilbert order; any other orientation swaps the
    /// second and fourth entries.
    pub fn children(&self, orientation: u8) -> [Self; 4] {
        let mut children = [self.child(0), self.child(3), self.child(2), self.child(1)];
        if orientation == 0 {
            children.swap(1, 3);
        }
        children
    }

    /// Children of the cell at `(face, level, i, j)` as
    /// `[bottom_left, bottom_right, top_left, top_right]`.
    pub fn children_ij(face: Face, level: u8, i: u32, j: u32) -> [Self; 4] {
        let (i, j) = (i << 1, j << 1);
        let level = Some(level.saturating_add(1).min(MAX_LEVEL));
        [
            Self::from_ij(face, i, j, level),
            Self::from_ij(face, i + 1, j, level),
            Self::from_ij(face, i, j + 1, level),
            Self::from_ij(face, i + 1, j + 1, level),
        ]
    }

    /// Position (0..=3) of this cell's ancestor at `level` within its parent.
    pub fn child_position(&self, level: u8) -> u8 {
        ((self.0 >> (2 * (MAX_LEVEL - level.min(MAX_LEVEL)) as u32 + 1)) & 3) as u8
    }

    /// Inclusive id interval covering this cell and all of its descendants.
    pub fn range(&self) -> (Self, Self) {
        let half = self.lsb().wrapping_sub(1);
        (
            Self(self.0.wrapping_sub(half)),
            Self(self.0.wrapping_add(half)),
        )
    }

    pub fn range_min(&self) -> Self {
        self.range().0
    }

    pub fn range_max(&self) -> Self {
        self.range().1
    }

    /// True when `other` is this cell or one of its descendants.
    pub fn contains(&self, other: Self) -> bool {
        let (min, max) = self.range();
        other >= min && other <= max
    }

    /// True when the two id ranges overlap.
    pub fn intersects(&self, other: Self) -> bool {
        let (a_min, a_max) = self.range();
        let (b_min, b_max) = other.range();
        b_min <= a_max && b_max >= a_min
    }

    /// Next cell at the same level, wrapping from face 5 to face 0.
    pub fn next(&self) -> Self {
        let n = self.0.wrapping_add(self.lsb() << 1);
        if n < WRAP_OFFSET {
            Self(n)
        } else {
            Self(n.wrapping_sub(WRAP_OFFSET))
        }
    }

    /// Previous cell at the same level, wrapping from face 0 to face 5.
    pub fn prev(&self) -> Self {
        let p = self.0.wrapping_sub(self.lsb() << 1);
        if p < WRAP_OFFSET {
            Self(p)
        } else {
            Self(p.wrapping_add(WRAP_OFFSET))
        }
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    /// Face + `(s, t)` of the cell center.
    pub fn center_st(&self) -> (Face, f64, f64) {
        let (face, i, j, _) = self.to_ij(None);
        let delta = if self.is_leaf() {
            1
        } else if ((i as u64) ^ (self.0 >> 2)) & 1 != 0 {
            2
        } else {
            0
        };
        let si = 2 * i as u64 + delta;
        let ti = 2 * j as u64 + delta;
        (face, si_ti_to_st(si), si_ti_to_st(ti))
    }

    /// `[s_min, t_min, s_max, t_max]` of the cell, or of its ancestor at `level`.
    pub fn bounds_st(&self, level: Option<u8>) -> [f64; 4] {
        let level = level.unwrap_or_else(|| self.level());
        let (_, s, t) = self.center_st();
        let half = size_st(level) * 0.5;
        [s - half, t - half, s + half, t + half]
    }

    /// Edge length of this cell in leaf units.
    pub fn get_size_ij(&self) -> u32 {
        size_ij(self.level())
    }

    /// `[u_low, u_high, v_low, v_high]` of the cell.
    pub fn bound_uv(&self) -> [f64; 4] {
        let (_, i, j, _) = self.to_ij(None);
        let size = self.get_size_ij();
        let i_low = i & size.wrapping_neg();
        let j_low = j & size.wrapping_neg();
        [i_low, i_low + size, j_low, j_low + size].map(|n| st_to_uv(ij_to_st(n)))
    }

    /// The four corners in CCW order (lower left first), not normalized.
    pub fn vertices_raw(&self) -> [S2Point; 4] {
        let face = self.face();
        let [u_low, u_high, v_low, v_high] = self.bound_uv();
        [
            S2Point::from(face_uv_to_xyz(face, u_low, v_low)),
            S2Point::from(face_uv_to_xyz(face, u_high, v_low)),
            S2Point::from(face_uv_to_xyz(face, u_high, v_high)),
            S2Point::from(face_uv_to_xyz(face, u_low, v_high)),
        ]
    }

    /// The four corners in CCW order, normalized.
    pub fn vertices(&self) -> [S2Point; 4] {
        self.vertices_raw().map(|p| p.normalize())
    }

    /// Inward-facing normals of the four edges, not normalized.
    pub fn edges_raw(&self) -> [S2Point; 4] {
        let face = self.face();
        let [u_low, u_high, v_low, v_high] = self.bound_uv();
        [
            S2Point::from(v_norm(face, v_low)),
            S2Point::from(u_norm(face, u_high)),
            -S2Point::from(v_norm(face, v_high)),
            -S2Point::from(u_norm(face, u_low)),
        ]
    }

    /// Inward-facing normals of the four edges, normalized.
    pub fn edges(&self) -> [S2Point; 4] {
        self.edges_raw().map(|p| p.normalize())
    }

    // ========================================================================
    // Neighbors
    // ========================================================================

    /// Edge neighbors at the same level: `[bottom, right, top, left]`.
    pub fn neighbors(&self) -> [Self; 4] {
        let level = self.level();
        let (face, i, j, _) = self.to_ij(None);
        Self::edge_neighbors(face, i as i64, j as i64, level)
    }

    /// Edge neighbors of the cell at `(face, i, j)` on `level`'s grid.
    pub fn neighbors_ij(face: Face, i: u32, j: u32, level: u8) -> [Self; 4] {
        let shift = MAX_LEVEL - level.min(MAX_LEVEL);
        Self::edge_neighbors(
            face,
            ((i as u64) << shift) as i64,
            ((j as u64) << shift) as i64,
            level,
        )
    }

    fn edge_neighbors(face: Face, i: i64, j: i64, level: u8) -> [Self; 4] {
        let size = size_ij(level) as i64;
        let max = MAX_SIZE as i64;
        let level = Some(level);
        [
            Self::from_ij_same(face, i, j - size, j - size >= 0).parent(level),
            Self::from_ij_same(face, i + size, j, i + size < max).parent(level),
            Self::from_ij_same(face, i, j + size, j + size < max).parent(level),
            Self::from_ij_same(face, i - size, j, i - size >= 0).parent(level),
        ]
    }

    /// Leaf at `(i, j)`; wraps onto the adjacent face unless `same_face`.
    pub fn from_ij_same(face: Face, i: i64, j: i64, same_face: bool) -> Self {
        if same_face {
            Self::from_ij(face, i as u32, j as u32, None)
        } else {
            Self::from_ij_wrap(face, i, j)
        }
    }

    /// Leaf at `(i, j)` where the coordinates may fall just off `face`.
    ///
    /// Coordinates are clamped to one leaf beyond the face and reprojected
    /// through XYZ onto whichever face they land on. Never panics.
    pub fn from_ij_wrap(face: Face, i: i64, j: i64) -> Self {
        const SCALE: f64 = 1.0 / MAX_SIZE as f64;
        const LIMIT: f64 = 1.0 + f64::EPSILON;
        let max = MAX_SIZE as i64;

        let i = i.clamp(-1, max);
        let j = j.clamp(-1, max);

        // Linear projection keeps the point barely outside [-1, 1] so the
        // divide in the reprojection cannot push it into the wrong leaf.
        let u = (SCALE * (2 * (i - max / 2) + 1) as f64).clamp(-LIMIT, LIMIT);
        let v = (SCALE * (2 * (j - max / 2) + 1) as f64).clamp(-LIMIT, LIMIT);

        let (n_face, n_u, n_v) = xyz_to_face_uv(face_uv_to_xyz(face, u, v));
        Self::from_ij(
            n_face,
            st_to_ij(0.5 * (n_u + 1.0)),
            st_to_ij(0.5 * (n_v + 1.0)),
            None,
        )
    }

    /// Cells at `level` sharing the vertex closest to this cell's center.
    ///
    /// Returns 4 cells, or 3 when the vertex is a cube corner. `level` must be
    /// coarser than 30 and defaults to this cell's level; the leaf level is
    /// clamped to 29.
    pub fn vertex_neighbors(&self, level: Option<u8>) -> Vec<Self> {
        let level = level.unwrap_or_else(|| self.level()).min(MAX_LEVEL - 1);
        let (face, i, j, _) = self.to_ij(None);
        let (i, j) = (i as i64, j as i64);
        let max = MAX_SIZE as i64;

        let halfsize = size_ij(level + 1) as i64;
        let size = halfsize << 1;

        let (ioffset, isame) = if i & halfsize != 0 {
            (size, i + size < max)
        } else {
            (-size, i - size >= 0)
        };
        let (joffset, jsame) = if j & halfsize != 0 {
            (size, j + size < max)
        } else {
            (-size, j - size >= 0)
        };

        let parent_level = Some(level);
        let mut neighbors = vec![
            self.parent(parent_level),
            Self::from_ij_same(face, i + ioffset, j, isame).parent(parent_level),
            Self::from_ij_same(face, i, j + joffset, jsame).parent(parent_level),
        ];
        if isame || jsame {
            neighbors.push(
                Self::from_ij_same(face, i + ioffset, j + joffset, isame && jsame)
                    .parent(parent_level),
            );
        }
        neighbors
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    /// Hex token with trailing zeros stripped (`"X"` for the zero id).
    pub fn to_token(&self) -> String {
        if self.0 == 0 {
            return "X".to_string();
        }
        let hex = format!("{:016x}", self.0);
        hex.trim_end_matches('0').to_string()
    }

    /// Parse a token produced by [`CellId::to_token`].
    pub fn from_token(token: &str) -> Result<Self> {
        if token.eq_ignore_ascii_case("x") {
            return Ok(Self(0));
        }
        if token.is_empty() || token.len() > 16 {
            return Err(Error::InvalidToken(token.to_string()));
        }
        let padded = format!("{:0<16}", token);
        u64::from_str_radix(&padded, 16)
            .map(Self)
            .map_err(|_| Error::InvalidToken(token.to_string()))
    }
}

impl From<u64> for CellId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<CellId> for u64 {
    fn from(id: CellId) -> Self {
        id.0
    }
}

impl FromStr for CellId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_token(s)
    }
}

/// `face/child-positions`, e.g. `3/0212` for a level-4 cell on face 3.
impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "Invalid: {:016x}", self.0);
        }
        write!(f, "{}/", self.face())?;
        for level in 1..=self.level() {
            write!(f, "{}", self.child_position(level))?;
        }
        Ok(())
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellId({})", self)
    }
}

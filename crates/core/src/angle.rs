//! Chord-length angles.
//!
//! [`ChordAngle`] stores the squared straight-line distance between two unit
//! vectors instead of the arc between them. Comparisons need no trigonometry,
//! which is what the radius search does in its inner loop.

use serde::{Deserialize, Serialize};

use crate::point::S2Point;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS: f64 = 6_371_008.8;

/// Largest representable squared chord (antipodal points).
const MAX_LENGTH2: f64 = 4.0;

/// An angle stored as a squared chord length in `[0, 4]`.
///
/// A negative length represents the empty angle, which is smaller than every
/// other angle including zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ChordAngle {
    length2: f64,
}

impl ChordAngle {
    pub const ZERO: Self = Self { length2: 0.0 };
    pub const STRAIGHT: Self = Self {
        length2: MAX_LENGTH2,
    };
    pub const NEGATIVE: Self = Self { length2: -1.0 };

    /// Build from a squared chord length, clamped to `[0, 4]` unless negative.
    pub fn from_length2(length2: f64) -> Self {
        if length2 < 0.0 {
            Self::NEGATIVE
        } else {
            Self {
                length2: length2.min(MAX_LENGTH2),
            }
        }
    }

    /// Chord for an arc in radians. Negative input gives the empty angle and
    /// anything past `π` saturates to a straight angle.
    pub fn from_radians(radians: f64) -> Self {
        if radians < 0.0 {
            return Self::NEGATIVE;
        }
        let length = 2.0 * (0.5 * radians.min(std::f64::consts::PI)).sin();
        Self {
            length2: length * length,
        }
    }

    pub fn from_degrees(degrees: f64) -> Self {
        Self::from_radians(degrees.to_radians())
    }

    /// Chord for a great-circle distance on the Earth.
    pub fn from_meters(meters: f64) -> Self {
        Self::from_radians(meters / EARTH_RADIUS)
    }

    /// Chord between two unit-length points.
    pub fn from_points(a: &S2Point, b: &S2Point) -> Self {
        Self {
            length2: (*a - *b).norm2().min(MAX_LENGTH2),
        }
    }

    pub fn length2(&self) -> f64 {
        self.length2
    }

    pub fn is_empty(&self) -> bool {
        self.length2 < 0.0
    }

    /// Arc length in radians (`-1` for the empty angle).
    pub fn radians(&self) -> f64 {
        if self.is_empty() {
            return -1.0;
        }
        2.0 * (0.5 * self.length2.sqrt()).asin()
    }

    pub fn degrees(&self) -> f64 {
        self.radians().to_degrees()
    }

    pub fn meters(&self) -> f64 {
        self.radians() * EARTH_RADIUS
    }
}

impl Default for ChordAngle {
    fn default() -> Self {
        Self::ZERO
    }
}

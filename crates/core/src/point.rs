//! Points on the unit sphere.

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::coords::{
    face_uv_to_xyz, face_xyz_to_uv, lon_lat_to_xyz, st_to_ij, st_to_uv, uv_to_st, xyz_to_face,
    xyz_to_lon_lat, Face, Xyz,
};

/// A point in 3D space, normally of unit length.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct S2Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl S2Point {
    /// Create a point from raw components (not normalized).
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Unit vector for a longitude/latitude in degrees.
    pub fn from_lon_lat(lon: f64, lat: f64) -> Self {
        Self::from(lon_lat_to_xyz(lon, lat))
    }

    /// Normalized point for a face `(u, v)` coordinate.
    pub fn from_face_uv(face: Face, u: f64, v: f64) -> Self {
        Self::from(face_uv_to_xyz(face, u, v)).normalize()
    }

    /// Normalized point for a face `(s, t)` coordinate.
    pub fn from_face_st(face: Face, s: f64, t: f64) -> Self {
        Self::from_face_uv(face, st_to_uv(s), st_to_uv(t))
    }

    /// Longitude/latitude in degrees.
    pub fn to_lon_lat(&self) -> (f64, f64) {
        xyz_to_lon_lat(self.to_array())
    }

    /// The cube face this point projects onto.
    pub fn face(&self) -> Face {
        xyz_to_face(self.to_array())
    }

    /// Face and `(u, v)` coordinates.
    pub fn to_face_uv(&self) -> (Face, f64, f64) {
        let face = self.face();
        let (u, v) = face_xyz_to_uv(face, self.to_array());
        (face, u, v)
    }

    /// Face and `(s, t)` coordinates.
    pub fn to_face_st(&self) -> (Face, f64, f64) {
        let (face, u, v) = self.to_face_uv();
        (face, uv_to_st(u), uv_to_st(v))
    }

    /// Face and leaf `(i, j)` coordinates.
    pub fn to_face_ij(&self) -> (Face, u32, u32) {
        let (face, s, t) = self.to_face_st();
        (face, st_to_ij(s), st_to_ij(t))
    }

    pub fn to_array(&self) -> Xyz {
        [self.x, self.y, self.z]
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Squared Euclidean length.
    pub fn norm2(&self) -> f64 {
        self.dot(self)
    }

    pub fn norm(&self) -> f64 {
        self.norm2().sqrt()
    }

    /// Scale to unit length. The zero vector is returned unchanged.
    pub fn normalize(&self) -> Self {
        let norm = self.norm();
        if norm > 0.0 {
            *self * (1.0 / norm)
        } else {
            *self
        }
    }

    /// Angle between two points in radians, robust for nearly parallel vectors.
    pub fn angle(&self, other: &Self) -> f64 {
        self.cross(other).norm().atan2(self.dot(other))
    }
}

impl From<Xyz> for S2Point {
    fn from(xyz: Xyz) -> Self {
        Self::new(xyz[0], xyz[1], xyz[2])
    }
}

impl From<S2Point> for Xyz {
    fn from(p: S2Point) -> Self {
        p.to_array()
    }
}

impl Add for S2Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for S2Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for S2Point {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for S2Point {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

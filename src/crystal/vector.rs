/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Vector3D type for fractional and Cartesian positions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Index, Mul, Neg, Sub, SubAssign};

/// A 3D vector used both for Cartesian positions (Å) and fractional coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3D {
    /// Create a new 3D vector
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector
    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn from_array(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Distance to another vector
    pub fn distance(&self, other: &Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Squared distance to another vector
    pub fn distance_squared(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Length (magnitude) of the vector
    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Apply `f` to every component
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.x), f(self.y), f(self.z))
    }

    /// Component-wise floor
    pub fn floor(self) -> Self {
        self.map(f64::floor)
    }

    /// Component-wise rounding to the nearest integer
    pub fn round(self) -> Self {
        self.map(f64::round)
    }

    /// Largest absolute component
    pub fn max_abs(&self) -> f64 {
        self.x.abs().max(self.y.abs()).max(self.z.abs())
    }

    /// Whether every component is within `tol` of `other`
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        (*self - *other).max_abs() < tol
    }
}

impl fmt::Display for Vector3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.6})", self.x, self.y, self.z)
    }
}

impl Index<usize> for Vector3D {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vector3D index {} out of range", i),
        }
    }
}

impl Add for Vector3D {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl AddAssign for Vector3D {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Vector3D {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl SubAssign for Vector3D {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Mul<f64> for Vector3D {
    type Output = Self;

    fn mul(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Neg for Vector3D {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vector_operations() {
        let v1 = Vector3D::new(1.0, 2.0, 3.0);
        let v2 = Vector3D::new(4.0, 5.0, 6.0);

        assert_relative_eq!(v1.distance(&v2), 5.196152, epsilon = 1e-6);
        assert_relative_eq!(v1.distance_squared(&v2), 27.0, epsilon = 1e-12);
        assert_relative_eq!(v1.length(), 3.741657, epsilon = 1e-6);
        assert_relative_eq!(v1.dot(&v2), 32.0, epsilon = 1e-6);

        let cross = v1.cross(&v2);
        assert_relative_eq!(cross.x, -3.0, epsilon = 1e-6);
        assert_relative_eq!(cross.y, 6.0, epsilon = 1e-6);
        assert_relative_eq!(cross.z, -3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_floor_and_round() {
        let v = Vector3D::new(-0.2, 1.7, 2.5);
        assert_eq!(v.floor(), Vector3D::new(-1.0, 1.0, 2.0));
        assert_eq!(v.round(), Vector3D::new(0.0, 2.0, 3.0));
        assert!(v.approx_eq(&Vector3D::new(-0.2, 1.7, 2.50001), 1e-4));
    }
}

/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Lattice shifts and periodic-image atom identities

use super::matrix::Matrix3;
use super::vector::Vector3D;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Integer lattice translation (h, k, l) relative to the reference cell.
///
/// Ordered lexicographically; equality is exact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Shift {
    pub h: i32,
    pub k: i32,
    pub l: i32,
}

impl Shift {
    pub const ZERO: Shift = Shift { h: 0, k: 0, l: 0 };

    pub fn new(h: i32, k: i32, l: i32) -> Self {
        Self { h, k, l }
    }

    pub fn from_array(v: [i32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn to_array(self) -> [i32; 3] {
        [self.h, self.k, self.l]
    }

    /// Shift as a fractional translation vector
    pub fn to_vector(self) -> Vector3D {
        Vector3D::new(self.h as f64, self.k as f64, self.l as f64)
    }

    /// Nearest integer shift to a fractional vector
    pub fn rounded(v: &Vector3D) -> Self {
        let r = v.round();
        Self::new(r.x as i32, r.y as i32, r.z as i32)
    }

    /// Integer shift obtained by flooring each component
    pub fn floored(v: &Vector3D) -> Self {
        let f = v.floor();
        Self::new(f.x as i32, f.y as i32, f.z as i32)
    }

    /// Apply an (integral) rotation matrix to the shift
    pub fn rotated(self, rotation: &Matrix3) -> Self {
        Self::from_array(rotation.mul_int(self.to_array()))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Add for Shift {
    type Output = Self;

    fn add(self, o: Self) -> Self {
        Self::new(self.h + o.h, self.k + o.k, self.l + o.l)
    }
}

impl Sub for Shift {
    type Output = Self;

    fn sub(self, o: Self) -> Self {
        Self::new(self.h - o.h, self.k - o.k, self.l - o.l)
    }
}

impl Neg for Shift {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.h, -self.k, -self.l)
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {}]", self.h, self.k, self.l)
    }
}

/// Identity of one periodic image of a unit-cell atom
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct AtomId {
    pub unit_cell_index: usize,
    pub shift: Shift,
}

impl AtomId {
    pub fn new(unit_cell_index: usize, shift: Shift) -> Self {
        Self {
            unit_cell_index,
            shift,
        }
    }

    /// The same atom translated by `shift`
    pub fn translated(self, shift: Shift) -> Self {
        Self::new(self.unit_cell_index, self.shift + shift)
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.unit_cell_index, self.shift)
    }
}

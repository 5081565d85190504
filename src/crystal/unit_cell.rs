/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Unit cell parameters and fractional/Cartesian transforms

use super::errors::{CrystalError, Result};
use super::matrix::Matrix3;
use super::vector::Vector3D;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Lattice parameters and the derived direct (fractional → Cartesian) and
/// inverse (Cartesian → fractional) matrices.
///
/// The convention is `a` along x and `b` in the xy plane. The matrices are
/// computed once at construction and the value is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CellParameters", into = "CellParameters")]
pub struct UnitCell {
    a: f64,
    b: f64,
    c: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
    direct: Matrix3,
    inverse: Matrix3,
}

/// Serialized form of a unit cell (angles in degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl UnitCell {
    /// Create a unit cell; angles in radians
    pub fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<Self> {
        for (name, len) in [("a", a), ("b", b), ("c", c)] {
            if len <= 0.0 || !len.is_finite() {
                return Err(CrystalError::InvalidCell(format!(
                    "cell length {} must be positive, got {}",
                    name, len
                )));
            }
        }
        for (name, angle) in [("alpha", alpha), ("beta", beta), ("gamma", gamma)] {
            if !(angle > 0.0 && angle < PI) {
                return Err(CrystalError::InvalidCell(format!(
                    "cell angle {} must lie in (0, pi), got {}",
                    name, angle
                )));
            }
        }

        let (ca, cb, cg) = (alpha.cos(), beta.cos(), gamma.cos());
        let sg = gamma.sin();
        let v2 = 1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg;
        if v2 <= 0.0 {
            return Err(CrystalError::InvalidCell(
                "cell angles do not describe a cell with positive volume".to_string(),
            ));
        }
        let volume = a * b * c * v2.sqrt();

        let direct = Matrix3::new([
            [a, b * cg, c * cb],
            [0.0, b * sg, c * (ca - cb * cg) / sg],
            [0.0, 0.0, volume / (a * b * sg)],
        ]);
        let inverse = direct.inverse().ok_or_else(|| {
            CrystalError::InvalidCell("direct cell matrix is singular".to_string())
        })?;

        Ok(Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
            direct,
            inverse,
        })
    }

    /// Create a unit cell with angles given in degrees
    pub fn from_degrees(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<Self> {
        Self::new(
            a,
            b,
            c,
            alpha.to_radians(),
            beta.to_radians(),
            gamma.to_radians(),
        )
    }

    /// Orthorhombic (all angles 90°) cell
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Result<Self> {
        Self::new(a, b, c, PI / 2.0, PI / 2.0, PI / 2.0)
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Fractional → Cartesian matrix
    pub fn direct_matrix(&self) -> &Matrix3 {
        &self.direct
    }

    /// Cartesian → fractional matrix
    pub fn inverse_matrix(&self) -> &Matrix3 {
        &self.inverse
    }

    pub fn volume(&self) -> f64 {
        self.direct.determinant()
    }

    pub fn to_cartesian(&self, frac: &Vector3D) -> Vector3D {
        self.direct.mul_vec(frac)
    }

    pub fn to_fractional(&self, cart: &Vector3D) -> Vector3D {
        self.inverse.mul_vec(cart)
    }

    /// Perpendicular distances between opposite cell faces
    ///
    /// These bound how many cells a sphere of given radius can span along each
    /// axis, which for oblique cells is more than `radius / length`.
    pub fn interplanar_spacings(&self) -> [f64; 3] {
        let mut spacings = [0.0; 3];
        for (i, spacing) in spacings.iter_mut().enumerate() {
            *spacing = 1.0 / self.inverse.row(i).length();
        }
        spacings
    }

    /// Rotation matrix of a symop expressed in the Cartesian frame
    pub fn cartesian_rotation(&self, fractional_rotation: &Matrix3) -> Matrix3 {
        self.direct * *fractional_rotation * self.inverse
    }

    pub fn parameters(&self) -> CellParameters {
        CellParameters {
            a: self.a,
            b: self.b,
            c: self.c,
            alpha: self.alpha.to_degrees(),
            beta: self.beta.to_degrees(),
            gamma: self.gamma.to_degrees(),
        }
    }
}

impl TryFrom<CellParameters> for UnitCell {
    type Error = CrystalError;

    fn try_from(p: CellParameters) -> Result<Self> {
        Self::from_degrees(p.a, p.b, p.c, p.alpha, p.beta, p.gamma)
    }
}

impl From<UnitCell> for CellParameters {
    fn from(cell: UnitCell) -> Self {
        cell.parameters()
    }
}

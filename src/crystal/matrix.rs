/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Small dense 3x3 matrix used for cell transforms and symop rotations

#![allow(clippy::needless_range_loop)]

use super::vector::Vector3D;
use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// Row-major 3x3 matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix3 {
    pub m: [[f64; 3]; 3],
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix3 {
    pub fn new(m: [[f64; 3]; 3]) -> Self {
        Self { m }
    }

    pub fn identity() -> Self {
        Self::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    }

    pub fn zeros() -> Self {
        Self::new([[0.0; 3]; 3])
    }

    pub fn row(&self, i: usize) -> Vector3D {
        Vector3D::from_array(self.m[i])
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros();
        for i in 0..3 {
            for j in 0..3 {
                t.m[i][j] = self.m[j][i];
            }
        }
        t
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Inverse via the adjugate; `None` for singular matrices
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < 1e-12 {
            return None;
        }
        let m = &self.m;
        let mut inv = Self::zeros();
        inv.m[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det;
        inv.m[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det;
        inv.m[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det;
        inv.m[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det;
        inv.m[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det;
        inv.m[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det;
        inv.m[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det;
        inv.m[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det;
        inv.m[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det;
        Some(inv)
    }

    pub fn mul_vec(&self, v: &Vector3D) -> Vector3D {
        Vector3D::new(
            self.row(0).dot(v),
            self.row(1).dot(v),
            self.row(2).dot(v),
        )
    }

    /// Integer matrix times integer vector, for rotations acting on cell shifts
    pub fn mul_int(&self, v: [i32; 3]) -> [i32; 3] {
        let mut out = [0; 3];
        for i in 0..3 {
            let s: f64 = (0..3).map(|j| self.m[i][j] * v[j] as f64).sum();
            out[i] = s.round() as i32;
        }
        out
    }

    /// Whether every element is within `tol` of `other`
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        (0..3).all(|i| (0..3).all(|j| (self.m[i][j] - other.m[i][j]).abs() < tol))
    }
}

impl Mul for Matrix3 {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        let mut out = Self::zeros();
        for i in 0..3 {
            for j in 0..3 {
                out.m[i][j] = (0..3).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        out
    }
}

impl Mul<Vector3D> for Matrix3 {
    type Output = Vector3D;

    fn mul(self, v: Vector3D) -> Vector3D {
        self.mul_vec(&v)
    }
}

/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Space group symmetry operations
//!
//! A [`SpaceGroup`] stores its operations as Seitz matrices together with two
//! precomputed tables: the inverse of every operation and the product of every
//! pair of operations. Both tables are validated against the matrices when the
//! space group is built and are read-only afterwards.
//!
//! Products follow matrix multiplication: `symop_product(a, b)` is the id of
//! `S_a · S_b`, i.e. apply `b` first and then `a`. Translations are compared
//! modulo whole lattice vectors.

use super::errors::{CrystalError, Result};
use super::matrix::Matrix3;
use super::vector::Vector3D;
use crate::utils::constants::{IDENTITY_SYMOP, SEITZ_TOL, SYMOP_FRACTION_TOL};
use serde::{Deserialize, Serialize};

/// Rotation + translation part of a symmetry operation in fractional coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeitzMatrix {
    pub rotation: Matrix3,
    pub translation: Vector3D,
}

impl SeitzMatrix {
    pub fn new(rotation: Matrix3, translation: Vector3D) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3D::origin())
    }

    /// Build from the upper three rows of a 4x4 homogeneous matrix
    pub fn from_rows(rows: &[[f64; 4]; 3]) -> Self {
        let mut rotation = Matrix3::zeros();
        for (i, row) in rows.iter().enumerate() {
            rotation.m[i] = [row[0], row[1], row[2]];
        }
        Self::new(
            rotation,
            Vector3D::new(rows[0][3], rows[1][3], rows[2][3]),
        )
    }

    /// Full 4x4 homogeneous matrix
    pub fn to_homogeneous(&self) -> [[f64; 4]; 4] {
        let mut out = [[0.0; 4]; 4];
        for i in 0..3 {
            out[i][..3].copy_from_slice(&self.rotation.m[i]);
            out[i][3] = self.translation[i];
        }
        out[3][3] = 1.0;
        out
    }

    /// Matrix product `self · other` (apply `other` first)
    pub fn compose(&self, other: &Self) -> Self {
        Self::new(
            self.rotation * other.rotation,
            self.rotation.mul_vec(&other.translation) + self.translation,
        )
    }

    /// Apply to a fractional position
    pub fn apply(&self, frac: &Vector3D) -> Vector3D {
        self.rotation.mul_vec(frac) + self.translation
    }

    /// Equal rotations and translations equal modulo lattice vectors
    pub fn is_equivalent(&self, other: &Self) -> bool {
        if !self.rotation.approx_eq(&other.rotation, SEITZ_TOL) {
            return false;
        }
        let d = self.translation - other.translation;
        (d - d.round()).max_abs() < SEITZ_TOL
    }

    pub fn is_identity(&self) -> bool {
        self.is_equivalent(&Self::identity())
    }

    /// Parse a Jones-Faithful string such as `-x+1/2,y,-z`
    pub fn parse(op: &str) -> Result<Self> {
        let parts: Vec<&str> = op.split(',').collect();
        if parts.len() != 3 {
            return Err(CrystalError::InvalidSymmetry(format!(
                "symop '{}' must have three comma-separated components",
                op
            )));
        }

        let mut rotation = Matrix3::zeros();
        let mut translation = [0.0; 3];
        for (row, expr) in parts.iter().enumerate() {
            let (coeffs, t) = parse_component(expr.trim()).ok_or_else(|| {
                CrystalError::InvalidSymmetry(format!("cannot parse symop component '{}'", expr))
            })?;
            rotation.m[row] = coeffs;
            translation[row] = t;
        }
        Ok(Self::new(rotation, Vector3D::from_array(translation)))
    }

    /// Render as a Jones-Faithful string
    ///
    /// Rotation coefficients other than 0 and ±1 render as `?`, translations
    /// that are not a simple fraction render as `+?`.
    pub fn to_jones_faithful(&self) -> String {
        const AXES: [char; 3] = ['x', 'y', 'z'];
        let mut rows = Vec::with_capacity(3);
        for i in 0..3 {
            let mut s = String::new();
            for (j, axis) in AXES.iter().enumerate() {
                let c = self.rotation.m[i][j];
                if c.abs() < SYMOP_FRACTION_TOL {
                    continue;
                }
                if (c - 1.0).abs() < SYMOP_FRACTION_TOL {
                    if !s.is_empty() {
                        s.push('+');
                    }
                    s.push(*axis);
                } else if (c + 1.0).abs() < SYMOP_FRACTION_TOL {
                    s.push('-');
                    s.push(*axis);
                } else {
                    s.push('?');
                }
            }
            s.push_str(&translation_string(self.translation[i]));
            rows.push(s);
        }
        rows.join(",")
    }
}

fn translation_string(t: f64) -> String {
    const FRACTIONS: [(f64, &str); 7] = [
        (1.0 / 2.0, "1/2"),
        (1.0 / 3.0, "1/3"),
        (2.0 / 3.0, "2/3"),
        (1.0 / 4.0, "1/4"),
        (3.0 / 4.0, "3/4"),
        (1.0 / 6.0, "1/6"),
        (5.0 / 6.0, "5/6"),
    ];
    if t.abs() < SYMOP_FRACTION_TOL {
        return String::new();
    }
    for (value, text) in FRACTIONS {
        if (t - value).abs() < SYMOP_FRACTION_TOL {
            return format!("+{}", text);
        }
        if (t + value).abs() < SYMOP_FRACTION_TOL {
            return format!("-{}", text);
        }
    }
    "+?".to_string()
}

/// Parse one component like `-x+1/2`, `x-y` or `0.25+z`
fn parse_component(expr: &str) -> Option<([f64; 3], f64)> {
    if expr.is_empty() {
        return None;
    }
    let chars: Vec<char> = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let mut coeffs = [0.0; 3];
    let mut trans = 0.0;
    let mut i = 0;

    while i < chars.len() {
        let sign = match chars[i] {
            '-' => {
                i += 1;
                -1.0
            }
            '+' => {
                i += 1;
                1.0
            }
            _ => 1.0,
        };
        let c = *chars.get(i)?;
        match c.to_ascii_lowercase() {
            'x' => {
                coeffs[0] += sign;
                i += 1;
            }
            'y' => {
                coeffs[1] += sign;
                i += 1;
            }
            'z' => {
                coeffs[2] += sign;
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let numerator: f64 = chars[start..i].iter().collect::<String>().parse().ok()?;
                let mut value = numerator;
                if i < chars.len() && chars[i] == '/' {
                    i += 1;
                    let start = i;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    let denominator: f64 =
                        chars[start..i].iter().collect::<String>().parse().ok()?;
                    if denominator == 0.0 {
                        return None;
                    }
                    value /= denominator;
                }
                trans += sign * value;
            }
            _ => return None,
        }
    }
    Some((coeffs, trans))
}

/// A space group as an ordered list of symmetry operations with precomputed
/// inverse and product tables. Operation 0 is always the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceGroup {
    symbol: String,
    symops: Vec<SeitzMatrix>,
    inverse_symops: Vec<usize>,
    symop_products: Vec<Vec<usize>>,
}

impl SpaceGroup {
    /// Build a space group and derive its tables from the matrices.
    ///
    /// Fails if operation 0 is not the identity or if the operations are not
    /// closed under composition.
    pub fn from_seitz_matrices(symbol: &str, symops: Vec<SeitzMatrix>) -> Result<Self> {
        check_identity_first(&symops)?;
        let n = symops.len();

        let mut symop_products = vec![vec![0; n]; n];
        for i in 0..n {
            for j in 0..n {
                let product = symops[i].compose(&symops[j]);
                symop_products[i][j] = find_symop(&symops, &product).ok_or_else(|| {
                    CrystalError::InvalidSymmetry(format!(
                        "product of symops {} and {} ({}) is not in the group",
                        i,
                        j,
                        product.to_jones_faithful()
                    ))
                })?;
            }
        }

        let mut inverse_symops = Vec::with_capacity(n);
        for (i, row) in symop_products.iter().enumerate() {
            let inverse = row
                .iter()
                .position(|&k| k == IDENTITY_SYMOP)
                .ok_or_else(|| {
                    CrystalError::InvalidSymmetry(format!("symop {} has no inverse", i))
                })?;
            inverse_symops.push(inverse);
        }

        log::debug!("built space group '{}' with {} symops", symbol, n);
        Ok(Self {
            symbol: symbol.to_string(),
            symops,
            inverse_symops,
            symop_products,
        })
    }

    /// Build a space group from Jones-Faithful strings, identity first
    pub fn from_symop_strings<S: AsRef<str>>(symbol: &str, ops: &[S]) -> Result<Self> {
        let symops = ops
            .iter()
            .map(|s| SeitzMatrix::parse(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_seitz_matrices(symbol, symops)
    }

    /// Build a space group from externally supplied tables, checking them
    /// against the matrices.
    pub fn with_tables(
        symbol: &str,
        symops: Vec<SeitzMatrix>,
        inverse_symops: Vec<usize>,
        symop_products: Vec<Vec<usize>>,
    ) -> Result<Self> {
        check_identity_first(&symops)?;
        let n = symops.len();
        if inverse_symops.len() != n || symop_products.len() != n {
            return Err(CrystalError::InvalidSymmetry(format!(
                "expected tables for {} symops, got {} inverses and {} product rows",
                n,
                inverse_symops.len(),
                symop_products.len()
            )));
        }

        for (i, row) in symop_products.iter().enumerate() {
            if row.len() != n {
                return Err(CrystalError::InvalidSymmetry(format!(
                    "product row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            for (j, &k) in row.iter().enumerate() {
                let valid = k < n && symops[k].is_equivalent(&symops[i].compose(&symops[j]));
                if !valid {
                    return Err(CrystalError::InvalidSymmetry(format!(
                        "symop product table entry ({}, {}) = {} is inconsistent",
                        i, j, k
                    )));
                }
            }
        }

        for (i, &inv) in inverse_symops.iter().enumerate() {
            if inv >= n || symop_products[i][inv] != IDENTITY_SYMOP {
                return Err(CrystalError::InvalidSymmetry(format!(
                    "inverse of symop {} given as {} does not compose to the identity",
                    i, inv
                )));
            }
        }

        Ok(Self {
            symbol: symbol.to_string(),
            symops,
            inverse_symops,
            symop_products,
        })
    }

    /// The trivial group P1
    pub fn p1() -> Self {
        Self {
            symbol: "P 1".to_string(),
            symops: vec![SeitzMatrix::identity()],
            inverse_symops: vec![0],
            symop_products: vec![vec![0]],
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Number of symmetry operations
    pub fn len(&self) -> usize {
        self.symops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symops.is_empty()
    }

    /// Id of the identity operation (always the first)
    pub fn identity_symop(&self) -> usize {
        IDENTITY_SYMOP
    }

    pub fn symops(&self) -> &[SeitzMatrix] {
        &self.symops
    }

    pub fn seitz_matrix(&self, id: usize) -> &SeitzMatrix {
        &self.symops[id]
    }

    /// Rotation part of a symop. Panics if `id` is out of range.
    pub fn rotation_matrix_for_symop(&self, id: usize) -> &Matrix3 {
        &self.symops[id].rotation
    }

    /// Translation part of a symop. Panics if `id` is out of range.
    pub fn translation_for_symop(&self, id: usize) -> Vector3D {
        self.symops[id].translation
    }

    /// Id of `S_a · S_b`
    pub fn symop_product(&self, a: usize, b: usize) -> usize {
        self.symop_products[a][b]
    }

    pub fn inverse_symop(&self, a: usize) -> usize {
        self.inverse_symops[a]
    }

    pub fn inverse_symops(&self) -> &[usize] {
        &self.inverse_symops
    }

    pub fn symop_products(&self) -> &[Vec<usize>] {
        &self.symop_products
    }

    pub fn symop_as_string(&self, id: usize) -> String {
        self.symops[id].to_jones_faithful()
    }
}

fn check_identity_first(symops: &[SeitzMatrix]) -> Result<()> {
    match symops.first() {
        Some(op) if op.is_identity() => Ok(()),
        Some(_) => Err(CrystalError::InvalidSymmetry(
            "symop 0 must be the identity".to_string(),
        )),
        None => Err(CrystalError::InvalidSymmetry(
            "space group has no symmetry operations".to_string(),
        )),
    }
}

fn find_symop(symops: &[SeitzMatrix], target: &SeitzMatrix) -> Option<usize> {
    symops.iter().position(|op| op.is_equivalent(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn p21_c() -> SpaceGroup {
        SpaceGroup::from_symop_strings(
            "P 21/c",
            &["x,y,z", "-x,y+1/2,-z+1/2", "-x,-y,-z", "x,-y+1/2,z+1/2"],
        )
        .unwrap()
    }

    #[test]
    fn test_products_match_matrix_multiplication() {
        let sg = p21_c();
        for i in 0..sg.len() {
            for j in 0..sg.len() {
                let product = sg.seitz_matrix(i).compose(sg.seitz_matrix(j));
                assert!(product.is_equivalent(sg.seitz_matrix(sg.symop_product(i, j))));
            }
        }
    }

    #[test]
    fn test_inverse_composes_to_identity() {
        let sg = p21_c();
        for i in 0..sg.len() {
            let k = sg.symop_product(i, sg.inverse_symop(i));
            assert_eq!(k, sg.identity_symop());
            assert!(sg.seitz_matrix(k).is_identity());
        }
    }

    #[test]
    fn test_not_closed_is_rejected() {
        let result = SpaceGroup::from_symop_strings("broken", &["x,y,z", "-x,y+1/2,-z"]);
        assert!(result.is_ok());
        let result = SpaceGroup::from_symop_strings("broken", &["x,y,z", "-y,x,z"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_identity_must_be_first() {
        assert!(SpaceGroup::from_symop_strings("bad", &["-x,-y,-z", "x,y,z"]).is_err());
    }

    #[test]
    fn test_with_tables_validates_products() {
        let sg = p21_c();
        let ok = SpaceGroup::with_tables(
            "P 21/c",
            sg.symops().to_vec(),
            sg.inverse_symops().to_vec(),
            sg.symop_products().to_vec(),
        );
        assert!(ok.is_ok());

        let mut products = sg.symop_products().to_vec();
        products[1][2] = 1;
        let bad = SpaceGroup::with_tables(
            "P 21/c",
            sg.symops().to_vec(),
            sg.inverse_symops().to_vec(),
            products,
        );
        assert!(bad.is_err());

        let bad_inverse = SpaceGroup::with_tables(
            "P 21/c",
            sg.symops().to_vec(),
            vec![0, 0, 0, 0],
            sg.symop_products().to_vec(),
        );
        assert!(bad_inverse.is_err());
    }

    #[rstest]
    #[case("x,y,z", "x,y,z")]
    #[case("-x+1/2,y,-z", "-x+1/2,y,-z")]
    #[case("x-y,x,z+1/6", "x-y,x,z+1/6")]
    #[case("1/2+x, -y ,z+0.75", "x+1/2,-y,z+3/4")]
    #[case("-x,-y,z-1/3", "-x,-y,z-1/3")]
    fn test_jones_faithful_round_trip(#[case] input: &str, #[case] expected: &str) {
        let op = SeitzMatrix::parse(input).unwrap();
        assert_eq!(op.to_jones_faithful(), expected);
    }

    #[test]
    fn test_unknown_translation_renders_question_mark() {
        let op = SeitzMatrix::new(Matrix3::identity(), Vector3D::new(0.1, 0.0, 0.0));
        assert_eq!(op.to_jones_faithful(), "x+?,y,z");
        let mut rotation = Matrix3::identity();
        rotation.m[2][2] = 2.0;
        let op = SeitzMatrix::new(rotation, Vector3D::origin());
        assert_eq!(op.to_jones_faithful(), "x,y,?");
    }

    #[rstest]
    #[case("x,y")]
    #[case("x,y,q")]
    #[case("x,,z")]
    #[case("x,y,z+1/0")]
    fn test_parse_errors(#[case] input: &str) {
        assert!(SeitzMatrix::parse(input).is_err());
    }

    #[test]
    fn test_homogeneous_round_trip() {
        let op = SeitzMatrix::parse("-x+1/2,y,-z+1/4").unwrap();
        let h = op.to_homogeneous();
        assert_eq!(h[3], [0.0, 0.0, 0.0, 1.0]);
        let rows = [h[0], h[1], h[2]];
        assert_eq!(SeitzMatrix::from_rows(&rows), op);
    }
}

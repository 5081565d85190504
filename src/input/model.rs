/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Crystal input model: the plain numeric data a structure reader produces

use crate::crystal::{AsymmetricUnitShifts, CellParameters};
use serde::{Deserialize, Serialize};

/// A symmetry operation as given in the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymopInput {
    /// Jones-Faithful string such as `-x,y+1/2,-z+1/2`
    JonesFaithful(String),
    /// Rows of the Seitz matrix: the upper three rows, or all four with
    /// `[0, 0, 0, 1]` last
    Seitz(Vec<[f64; 4]>),
}

/// One atom of the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomInput {
    pub label: String,
    /// Element symbol (case-insensitive)
    pub element: String,
    /// Fractional coordinates
    pub frac: [f64; 3],
    #[serde(default)]
    pub disorder_group: i32,
    #[serde(default = "default_occupancy")]
    pub occupancy: f64,
    /// Asymmetric-unit atom this site was generated from (unit-cell atoms only)
    #[serde(default)]
    pub asymmetric_unit_index: Option<usize>,
    /// Symop that generated this site (unit-cell atoms only)
    #[serde(default)]
    pub symop_id: Option<usize>,
    /// Cartesian displacement tensor: xx, yy, zz, xy, xz, yz
    #[serde(default)]
    pub adp: Option<[f64; 6]>,
}

fn default_occupancy() -> f64 {
    1.0
}

/// Complete crystal input.
///
/// Exactly one of `unit_cell_atoms` and `asymmetric_unit` must be given. When
/// the inverse and product tables are supplied they are checked against the
/// matrices, otherwise they are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrystalInput {
    pub name: String,
    /// Lattice parameters, angles in degrees
    pub cell: CellParameters,
    /// Hermann-Mauguin symbol or other display name
    #[serde(default)]
    pub space_group: String,
    pub symops: Vec<SymopInput>,
    #[serde(default)]
    pub inverse_symops: Option<Vec<usize>>,
    #[serde(default)]
    pub symop_products: Option<Vec<Vec<usize>>>,
    #[serde(default)]
    pub unit_cell_atoms: Vec<AtomInput>,
    #[serde(default)]
    pub asymmetric_unit: Vec<AtomInput>,
    #[serde(default)]
    pub asymmetric_unit_shifts: AsymmetricUnitShifts,
}

/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Atomic sites of a crystal and their periodic images

use super::errors::{CrystalError, Result};
use super::matrix::Matrix3;
use super::shift::{AtomId, Shift};
use super::space_group::SeitzMatrix;
use super::unit_cell::UnitCell;
use super::vector::Vector3D;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Anisotropic displacement parameters as a symmetric tensor in the Cartesian
/// frame, stored in the order xx, yy, zz, xy, xz, yz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adp(pub [f64; 6]);

impl Adp {
    pub fn to_matrix(&self) -> Matrix3 {
        let [xx, yy, zz, xy, xz, yz] = self.0;
        Matrix3::new([[xx, xy, xz], [xy, yy, yz], [xz, yz, zz]])
    }

    pub fn from_matrix(m: &Matrix3) -> Self {
        Self([m.m[0][0], m.m[1][1], m.m[2][2], m.m[0][1], m.m[0][2], m.m[1][2]])
    }

    /// Tensor after a Cartesian rotation: R U Rᵀ
    pub fn rotated(&self, rotation: &Matrix3) -> Self {
        Self::from_matrix(&(*rotation * self.to_matrix() * rotation.transpose()))
    }

    /// Equivalent isotropic displacement (trace / 3)
    pub fn u_equiv(&self) -> f64 {
        (self.0[0] + self.0[1] + self.0[2]) / 3.0
    }
}

/// An atom instance: one periodic image of a unit-cell site.
///
/// The Cartesian position is cached and always equals
/// `cell.direct_matrix() * fractional`; every mutating method takes the unit
/// cell so the cache can be refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    label: String,
    atomic_number: i32,
    fractional: Vector3D,
    position: Vector3D,
    occupancy: f64,
    disorder_group: i32,
    unit_cell_index: usize,
    shift: Shift,
    asymmetric_unit_index: usize,
    symop_id: usize,
    adp: Option<Adp>,
    #[serde(default)]
    suppressed: bool,
    #[serde(default)]
    contact: bool,
}

impl Atom {
    /// Create an atom at a fractional position. Atomic number 0 denotes an
    /// unknown element (never bonds).
    pub fn new(
        label: &str,
        atomic_number: i32,
        fractional: Vector3D,
        cell: &UnitCell,
    ) -> Result<Self> {
        if !(0..=118).contains(&atomic_number) {
            return Err(CrystalError::InvalidAtom(format!(
                "invalid atomic number {} for atom '{}'",
                atomic_number, label
            )));
        }
        Ok(Self {
            label: label.to_string(),
            atomic_number,
            fractional,
            position: cell.to_cartesian(&fractional),
            occupancy: 1.0,
            disorder_group: 0,
            unit_cell_index: 0,
            shift: Shift::ZERO,
            asymmetric_unit_index: 0,
            symop_id: 0,
            adp: None,
            suppressed: false,
            contact: false,
        })
    }

    pub fn with_occupancy(mut self, occupancy: f64) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn with_disorder_group(mut self, group: i32) -> Self {
        self.disorder_group = group;
        self
    }

    pub fn with_adp(mut self, adp: Adp) -> Self {
        self.adp = Some(adp);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn atomic_number(&self) -> i32 {
        self.atomic_number
    }

    pub fn fractional(&self) -> &Vector3D {
        &self.fractional
    }

    /// Cartesian position in Å
    pub fn position(&self) -> &Vector3D {
        &self.position
    }

    pub fn occupancy(&self) -> f64 {
        self.occupancy
    }

    pub fn disorder_group(&self) -> i32 {
        self.disorder_group
    }

    pub fn is_disordered(&self) -> bool {
        self.disorder_group != 0
    }

    pub fn unit_cell_index(&self) -> usize {
        self.unit_cell_index
    }

    pub fn shift(&self) -> Shift {
        self.shift
    }

    pub fn atom_id(&self) -> AtomId {
        AtomId::new(self.unit_cell_index, self.shift)
    }

    pub fn asymmetric_unit_index(&self) -> usize {
        self.asymmetric_unit_index
    }

    /// Symop that generated this site from its asymmetric-unit atom
    pub fn symop_id(&self) -> usize {
        self.symop_id
    }

    pub fn adp(&self) -> Option<&Adp> {
        self.adp.as_ref()
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn set_suppressed(&mut self, suppressed: bool) {
        self.suppressed = suppressed;
    }

    /// Contact atoms sit on the periphery of a cluster and take no part in
    /// covalent bonding.
    pub fn is_contact(&self) -> bool {
        self.contact
    }

    pub fn set_contact(&mut self, contact: bool) {
        self.contact = contact;
    }

    pub(crate) fn set_origin(&mut self, asymmetric_unit_index: usize, symop_id: usize) {
        self.asymmetric_unit_index = asymmetric_unit_index;
        self.symop_id = symop_id;
    }

    pub(crate) fn set_unit_cell_index(&mut self, index: usize) {
        self.unit_cell_index = index;
    }

    /// Mark the current position as the reference image
    pub(crate) fn clear_shift(&mut self) {
        self.shift = Shift::ZERO;
    }

    /// Whether two atoms are mutually exclusive alternatives of a disordered site
    pub fn is_disorder_incompatible(&self, other: &Atom) -> bool {
        self.is_disordered() && other.is_disordered() && self.disorder_group != other.disorder_group
    }

    /// Translate by a whole lattice vector
    pub fn displace(&mut self, shift: Shift, cell: &UnitCell) {
        self.fractional += shift.to_vector();
        self.shift = self.shift + shift;
        self.update_position(cell);
    }

    /// A translated copy of this atom
    pub fn displaced(&self, shift: Shift, cell: &UnitCell) -> Self {
        let mut atom = self.clone();
        atom.displace(shift, cell);
        atom
    }

    /// Apply a symmetry operation to the position (and ADP tensor)
    pub fn apply_symop(&mut self, symop: &SeitzMatrix, cell: &UnitCell) {
        self.fractional = symop.apply(&self.fractional);
        if let Some(adp) = self.adp {
            self.adp = Some(adp.rotated(&cell.cartesian_rotation(&symop.rotation)));
        }
        self.update_position(cell);
    }

    /// Move the atom back into the reference cell, wrapping fractional
    /// coordinates into [0, 1). Returns the shift that was removed.
    pub fn shift_to_unit_cell(&mut self, cell: &UnitCell, tol: f64) -> Shift {
        let mut removed = [0; 3];
        let mut wrapped = [0.0; 3];
        for i in 0..3 {
            let f = self.fractional[i];
            let mut fl = f.floor();
            let mut w = f - fl;
            if 1.0 - w < tol {
                w = 0.0;
                fl += 1.0;
            }
            wrapped[i] = w;
            removed[i] = fl as i32;
        }
        let removed = Shift::from_array(removed);
        self.fractional = Vector3D::from_array(wrapped);
        self.shift = self.shift - removed;
        self.update_position(cell);
        removed
    }

    pub(crate) fn update_position(&mut self, cell: &UnitCell) {
        self.position = cell.to_cartesian(&self.fractional);
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        self.position.distance(&other.position)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Z={}) at {} [{}]",
            self.label,
            self.atomic_number,
            self.fractional,
            self.atom_id()
        )
    }
}

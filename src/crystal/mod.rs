/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Crystal structure, symmetry and fragment engine
//!
//! Data flows from the unit cell, space group and unit-cell atoms through the
//! bonding engine (connection tables) into cluster generation, fragment
//! extraction and finally the symmetry-equivalence engine.

pub mod atom;
pub mod bonding;
pub mod elements;
pub mod errors;
pub mod fragment;
pub mod matrix;
pub mod packing;
pub mod shift;
pub mod space_group;
pub mod structure;
pub mod symops;
pub mod unit_cell;
pub mod vector;

pub use atom::{Adp, Atom};
pub use bonding::{
    build_connection_tables, find_covalent_bonds, find_vdw_contacts, BondOverrides,
    BondingConfig, Bonds, Connection, ConnectionTables, OverrideResolver,
};
pub use elements::{ElementData, ElementTable};
pub use errors::{CrystalError, Result};
pub use fragment::{center_of_mass, centroid, formula_sum, Fragments};
pub use matrix::Matrix3;
pub use packing::{AsymmetricUnitShifts, Completion, PackingLimits, UnitCellExpansion};
pub use shift::{AtomId, Shift};
pub use space_group::{SeitzMatrix, SpaceGroup};
pub use structure::{
    Crystal, CrystalConfig, FragmentClass, FragmentPair, FragmentState, InteractionEnergy,
    PairClass,
};
pub use symops::{contains_identity, describe_symop, CrystalSymops, SymmetryTables};
pub use unit_cell::{CellParameters, UnitCell};
pub use vector::Vector3D;

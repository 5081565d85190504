/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! # crystal-symmetry
//!
//! Crystallographic symmetry and fragment generation for molecular crystals.
//!
//! The crate turns a unit cell, its space group and the unit-cell atoms into
//! covalent and van der Waals connection tables, packs finite clusters from
//! the periodic lattice, splits clusters into fragments and relates fragments
//! to one another through crystal symmetry operations.
//!
//! ```no_run
//! use crystal_symmetry::crystal::CrystalConfig;
//! use crystal_symmetry::crystal::ElementTable;
//! use crystal_symmetry::utils::CancellationToken;
//!
//! let mut crystal = crystal_symmetry::input::load_crystal(
//!     "urea.json",
//!     CrystalConfig::default(),
//!     ElementTable::standard(),
//! )?;
//! crystal.complete_fragments(&CancellationToken::new())?;
//! for class in crystal.symmetry_unique_fragments() {
//!     println!("{} x{}", crystal.fragment_formula(class.representative), class.members.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod crystal;
pub mod input;
pub mod project;
pub mod utils;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Crystal input
//!
//! The input contract is a JSON document holding the unit cell, the symmetry
//! operations (with optional precomputed tables) and either the unit-cell
//! atoms with their symmetry assignments or an asymmetric unit to expand.

mod config;
mod errors;
mod model;
mod parser;

pub use config::{load_config, parse_config};
pub use errors::{InputError, Result};
pub use model::{AtomInput, CrystalInput, SymopInput};
pub use parser::{
    build_atom, build_crystal, build_space_group, load_crystal, parse_crystal_input,
    parse_crystal_input_str,
};

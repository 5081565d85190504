/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Numerical tolerances and fixed constants used throughout the crystal engine

/// Covalent bonding tolerance in Angstroms (CCDC convention)
pub const COVALENT_BOND_TOLERANCE: f64 = 0.4;

/// Fixed pad added to van der Waals radius sums when classifying contacts (Å)
pub const VDW_CONTACT_PAD: f64 = 0.2;

/// Tolerance for comparing fractional positions
pub const POSITION_TOL: f64 = 1e-4;

/// Tolerance used when atoms sit exactly on a packing boundary
pub const BOUNDARY_TOL: f64 = 1e-6;

/// Small offset used when rounding packing limits to whole cells
pub const CELL_DELTA: f64 = 1e-6;

/// Tolerance for matching translations against rational fractions
pub const SYMOP_FRACTION_TOL: f64 = 1e-4;

/// Tolerance for comparing Seitz matrix elements
pub const SEITZ_TOL: f64 = 1e-5;

/// Sentinel symop id meaning "no symmetry operation relates these atoms"
pub const NOSYMOP: i32 = -1;

/// Id of the identity operation in every space group
pub const IDENTITY_SYMOP: usize = 0;

/// Default cap on cluster size when completing fragments
pub const DEFAULT_MAX_COMPLETION_ATOMS: usize = 20_000;

/// Distances (Å) closer than this are treated as equal when comparing
/// fragment pairs
pub const PAIR_DISTANCE_TOL: f64 = 1e-3;

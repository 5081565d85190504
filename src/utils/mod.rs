/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Utility functions and constants shared by the crystal engine

pub mod cancel;
pub mod constants;

pub use cancel::CancellationToken;

/// Reduce a fractional coordinate into [0, 1)
///
/// Values within `tol` of 1.0 are wrapped to 0.0 so that atoms sitting on a
/// cell face always belong to the same cell.
pub fn wrap_fraction(x: f64, tol: f64) -> f64 {
    let mut f = x - x.floor();
    if (1.0 - f).abs() < tol {
        f = 0.0;
    }
    f
}

/// Round a packing limit outward: positive values round up, negative values
/// round down.
pub fn round_limit(x: f64) -> i32 {
    if x > 0.0 {
        x.ceil() as i32
    } else {
        x.floor() as i32
    }
}

/// Difference of two fractional coordinates reduced to [-0.5, 0.5]
pub fn periodic_difference(a: f64, b: f64) -> f64 {
    let d = a - b;
    d - d.round()
}

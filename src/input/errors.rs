/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Error types for crystal input loading

use crate::crystal::CrystalError;
use std::io;
use thiserror::Error;

/// Errors that can occur while reading and validating crystal input
#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown element symbol '{symbol}' for atom '{label}'")]
    UnknownElement { label: String, symbol: String },

    #[error("Invalid symmetry operation {index}: {reason}")]
    InvalidSymop { index: usize, reason: String },

    #[error("Inconsistent input: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Crystal(#[from] CrystalError),
}

/// Result type for input operations
pub type Result<T> = std::result::Result<T, InputError>;

/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Error types for the crystal module

/// Error types for the crystal module
#[derive(Debug, thiserror::Error)]
pub enum CrystalError {
    #[error("Invalid unit cell: {0}")]
    InvalidCell(String),

    #[error("Invalid symmetry data: {0}")]
    InvalidSymmetry(String),

    #[error("Invalid atom: {0}")]
    InvalidAtom(String),

    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Spatial index error: {0}")]
    SpatialIndex(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Empty selection: {0}")]
    EmptySelection(String),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type for crystal operations
pub type Result<T> = std::result::Result<T, CrystalError>;

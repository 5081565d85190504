/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Error types for project persistence

use crate::crystal::CrystalError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported project format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u64, supported: u32 },

    #[error("Missing project format version")]
    MissingVersion,

    #[error("Inconsistent project: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Crystal(#[from] CrystalError),
}

/// Result type for project operations
pub type Result<T> = std::result::Result<T, ProjectError>;

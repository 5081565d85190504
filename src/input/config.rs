/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Loading engine settings from JSON

use super::errors::Result;
use crate::crystal::CrystalConfig;
use std::fs;
use std::path::Path;

/// Read a [`CrystalConfig`] from a JSON file. Missing fields take their
/// default values.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CrystalConfig> {
    let content = fs::read_to_string(path.as_ref())?;
    let config = parse_config(&content)?;
    log::debug!("loaded engine configuration from {}", path.as_ref().display());
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<CrystalConfig> {
    let config: CrystalConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

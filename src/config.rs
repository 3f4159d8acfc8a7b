//! Configuration for import hash computation.
//!
//! All sections carry defaults, so a JSON file only needs the fields it
//! overrides.

use crate::error::{ImphashError, Result};
use crate::io::IOLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Master configuration for the imphash pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImphashConfig {
    /// Fuzzy hash (ImpFuzzy) configuration.
    pub fuzzy: FuzzyConfig,
    /// I/O configuration for the path-based API.
    pub io: IOConfig,
}

impl ImphashConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ImphashError::Config(e.to_string()))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Fuzzy hash (CTPH) configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    /// Compute ImpFuzzy at all (default: true).
    pub enabled: bool,
    /// Shortest ImpString that gets a fuzzy digest (default: 4096).
    pub min_input_size: usize,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_input_size: 4096,
        }
    }
}

/// I/O configuration for file reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IOConfig {
    /// Maximum bytes to read from a file (default: 104857600 = 100MB).
    pub max_read_bytes: u64,
    /// Maximum file size to process (default: 1073741824 = 1GB).
    pub max_file_size: u64,
}

impl Default for IOConfig {
    fn default() -> Self {
        Self {
            max_read_bytes: 100 * 1024 * 1024,
            max_file_size: 1024 * 1024 * 1024,
        }
    }
}

impl From<&IOConfig> for IOLimits {
    fn from(config: &IOConfig) -> Self {
        IOLimits {
            max_read_bytes: config.max_read_bytes,
            max_file_size: config.max_file_size,
        }
    }
}

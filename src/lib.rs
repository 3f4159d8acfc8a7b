//! Import hashing for PE, ELF, Mach-O and fat Mach-O binaries.
//!
//! A binary's import table is reduced to a canonical ImpString, which is then
//! fingerprinted as ImpHash (MD5, lowercase hex) and ImpFuzzy (CTPH).
//!
//! ```no_run
//! let data = std::fs::read("sample.exe")?;
//! let result = imphash::imphash_from_bytes(&data)?;
//! println!("{}", result.imp_hash);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Container format detection
pub mod formats;
/// Exact digests
pub mod hashing;
/// Normalization, canonicalization and the fingerprint pipeline
pub mod imphash;
/// Bounded file reading
pub mod io;
/// Tracing setup
pub mod logging;
/// Fuzzy hashing (CTPH)
pub mod similarity;
/// Container import readers
pub mod symbols;

pub use config::{FuzzyConfig, IOConfig, ImphashConfig};
pub use error::{ImphashError, Result};
pub use formats::{detect_format, Format};
pub use imphash::{
    canonicalize, imp_string_from_bytes, imphash_from_bytes, imphash_from_bytes_with_config,
    imphash_from_imp_string, imphash_from_path, ImpHashResult, ImpString,
};
pub use similarity::FuzzyError;
pub use symbols::{read_raw_imports, RawImports};

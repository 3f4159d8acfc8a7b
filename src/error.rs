//! Error types for import hash computation.
//!
//! Every failure is reported as a typed [`ImphashError`]; the pipeline never
//! returns a partial result alongside an error.

use crate::formats::Format;
use thiserror::Error;

/// Main error type for imphash operations.
#[derive(Debug, Error)]
pub enum ImphashError {
    /// None of the four recognized signatures matched at offset 0
    #[error("File type not supported")]
    UnsupportedFormat,

    /// Signature matched but the container structure was rejected
    #[error("Malformed {format} container: {message}")]
    MalformedContainer { format: Format, message: String },

    /// Container parsed but its import or symbol table could not be read
    #[error("{format} import table unavailable: {message}")]
    ImportTableUnavailable { format: Format, message: String },

    /// One architecture slice of a fat Mach-O failed
    #[error("Fat Mach-O slice {index} failed: {source}")]
    SliceExtractionFailed {
        index: usize,
        #[source]
        source: Box<ImphashError>,
    },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ImphashError {
    pub(crate) fn malformed(format: Format, message: impl Into<String>) -> Self {
        ImphashError::MalformedContainer {
            format,
            message: message.into(),
        }
    }

    pub(crate) fn unavailable(format: Format, message: impl Into<String>) -> Self {
        ImphashError::ImportTableUnavailable {
            format,
            message: message.into(),
        }
    }
}

/// Result type alias for imphash operations
pub type Result<T> = std::result::Result<T, ImphashError>;

//! Ingestion error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading collector outputs
#[derive(Error, Debug)]
pub enum IngestError {
    /// The input directory or a file could not be read
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file was not valid JSON or not the expected shape
    #[error("Invalid document {path:?}: {message}")]
    InvalidDocument { path: PathBuf, message: String },
}

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

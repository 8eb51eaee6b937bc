//! Storage error types

use thiserror::Error;

/// Errors that can occur while reading or appending history
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Backend not available in this build or misconfigured
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

//! Index engine error types

use storage::StoreError;
use thiserror::Error;

/// Errors that can occur while computing or committing an index
///
/// A gate rejection is not an error; see [`crate::gate::GateOutcome`].
#[derive(Error, Debug)]
pub enum IndexError {
    /// Every report was dropped before aggregation
    #[error("No usable price reports ({dropped} dropped)")]
    NoUsableReports { dropped: usize },

    /// Configuration the engine cannot run with
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An exchange-rate source failed
    #[error("Rate source {source_name} failed: {message}")]
    RateSource {
        source_name: String,
        message: String,
    },

    /// History store failure
    #[error("History store error: {0}")]
    Store(#[from] StoreError),

    /// Result could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        IndexError::Serialization(err.to_string())
    }
}

/// Result type for index engine operations
pub type Result<T> = std::result::Result<T, IndexError>;

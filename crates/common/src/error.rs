//! Common error types for the GPU index

use thiserror::Error;

/// Common error type used across index crates
#[derive(Error, Debug)]
pub enum Error {
    /// A report or value failed a structural check
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias using the common Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

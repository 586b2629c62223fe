//! Error types for the cleaning job.

use polars::prelude::PolarsError;

use crate::store::StoreError;

/// Result type for cleaning operations
pub type CleaningResult<T> = Result<T, CleaningError>;

/// Error type for cleaning operations
#[derive(Debug, thiserror::Error)]
pub enum CleaningError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Invalid price range: {0}")]
    InvalidRange(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Tracking store error: {0}")]
    Store(#[from] StoreError),

    #[error("Data error: {0}")]
    Data(#[from] PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CleaningError {
    /// Process exit code for this error: 2 for usage errors, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CleaningError::InvalidArguments(_) => 2,
            _ => 1,
        }
    }
}

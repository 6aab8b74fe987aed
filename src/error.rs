//! Error types for engagement-lab
//!
//! Every rejection carries enough context to fix the offending record.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// engagement-lab error types
#[derive(Error, Debug)]
pub enum Error {
    /// A metric, feature, or metadata record failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Estimation requested before a model artifact was loaded
    #[error("Model not loaded: {0}\nLoad an artifact or run `engagement-lab train` first")]
    ModelNotLoaded(String),

    /// Model artifact is structurally unusable (feature mismatch, empty tree, ...)
    #[error("Invalid model artifact: {0}")]
    ModelFormat(String),

    /// No experiment stored under the requested ID
    #[error("Experiment not found: {0}")]
    ExperimentNotFound(String),

    /// Cache backend failure or an undecodable cached entry
    #[error("Cache error: {0}")]
    Cache(String),

    /// Caller passed an argument outside the accepted domain
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal failure such as a poisoned lock or a panicked worker
    #[error("Internal error: {0}")]
    Internal(String),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a validation error from anything displayable.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

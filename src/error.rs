//! Error types for iterloop
//!
//! Centralized error handling using thiserror. None of these are fatal to the
//! host: the loop nodes log them and degrade to a new loop or an empty result.

use thiserror::Error;

/// All error types that can occur in iterloop
#[derive(Debug, Error)]
pub enum IterloopError {
    /// Control or context payload could not be parsed
    #[error("Control parse error: {0}")]
    ControlParse(String),

    /// Context is missing its loop identity or index
    #[error("Invalid context: {0}")]
    InvalidContext(String),

    /// Target index is past the known combinations
    #[error("Index {index} out of range for {total} iterations")]
    IndexOutOfRange { index: usize, total: usize },

    /// Session not found in storage
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Resubmission port failed
    #[error("Resubmit error: {0}")]
    Resubmit(String),

    /// In-process driver gave up on a loop
    #[error("Pass limit of {0} exceeded")]
    PassLimitExceeded(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for iterloop operations
pub type Result<T> = std::result::Result<T, IterloopError>;

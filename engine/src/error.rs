//! Error types for the Weave engine.

use thiserror::Error;

/// All possible errors from the Weave engine.
///
/// Every variant is a contract violation by the caller or the environment.
/// None of them is transient, so the edit that triggered one should be
/// aborted rather than retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Position errors
    #[error("bounds out of order: {before} is not less than {after}")]
    OrderViolation { before: String, after: String },

    #[error("invalid position: {0}")]
    InvalidPosition(String),

    // Replica errors
    #[error("secure random source unavailable: {0}")]
    AllocatorUnavailable(String),

    #[error("invalid replica id: {0}")]
    InvalidReplicaId(String),

    // Sequence errors
    #[error("index {index} out of bounds for sequence of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

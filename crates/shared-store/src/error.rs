//! Store errors.

use std::time::Duration;
use thiserror::Error;

/// Errors from backing store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within its deadline.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    /// The backend does not implement this operation.
    #[error("operation not supported by backend: {0}")]
    Unsupported(&'static str),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

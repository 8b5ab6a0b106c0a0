//! Session store error types.

use thiserror::Error;

/// Errors that can occur when talking to a session store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing cache could not be reached or rejected the operation.
    #[error("session cache error: {0}")]
    Cache(#[from] redis::RedisError),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

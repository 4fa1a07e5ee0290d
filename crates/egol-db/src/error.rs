//! Error types for the Redis store.

use egol_core::StoreError;

/// Errors that can occur talking to Redis.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A Redis operation failed.
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A key was not found.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Convert into the backend-neutral error seen by the tick loop.
    pub fn into_store_error(self, key: &str) -> StoreError {
        match self {
            Self::Redis(e) if is_connection_error(&e) => StoreError::Unavailable(e.to_string()),
            other => StoreError::Write {
                key: key.to_owned(),
                reason: other.to_string(),
            },
        }
    }
}

fn is_connection_error(e: &fred::error::Error) -> bool {
    matches!(
        e.kind(),
        fred::error::ErrorKind::IO | fred::error::ErrorKind::Timeout | fred::error::ErrorKind::Canceled
    )
}

//! Errors raised by the content repositories.
//!
//! Absence is not an error: `get` returns `None`, `exists` returns `false`
//! and `delete` of a missing id succeeds. Everything here is a real failure.

use thiserror::Error;

/// Errors that can occur while storing or loading content
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid content id '{id}': {reason}")]
    InvalidId { id: String, reason: &'static str },

    #[error("Invalid content record: {0}")]
    InvalidRecord(String),

    #[error("Malformed record '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Shorthand for configuration failures
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result alias used throughout the repositories
pub type StoreResult<T> = std::result::Result<T, StoreError>;

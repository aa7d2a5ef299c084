//! Error types for the store and its persistence backends.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by a key-value backend.
#[derive(Debug, Error)]
pub enum KvError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error in a stored entry.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two keys map to the same file.
    #[error("key '{key}' collides with stored key '{existing}'")]
    KeyCollision { key: String, existing: String },

    /// Key cannot be mapped to storage.
    #[error("invalid key: '{0}'")]
    InvalidKey(String),

    /// Backend refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input rejected before any state changed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Target id is not in the collection.
    #[error("not found: {0}")]
    NotFound(String),

    /// Reading persisted state failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] KvError),

    /// Persisted document could not be decoded.
    #[error("corrupt document under '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be read.
    #[error("config error at '{path}': {message}")]
    Config { path: PathBuf, message: String },

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] taskhive_core::CoreError),
}

impl StoreError {
    /// Lift core validation failures into `StoreError::Validation`.
    #[must_use]
    pub fn from_core(err: taskhive_core::CoreError) -> Self {
        match err {
            taskhive_core::CoreError::Validation(msg) => Self::Validation(msg),
            other => Self::Core(other),
        }
    }
}

/// A bulk delete stopped before reaching the end of its list.
///
/// Deletions before `failed_id` stay applied; items after it were not attempted.
#[derive(Debug, Error)]
#[error("bulk delete stopped at '{failed_id}' after {completed} of {total}: {source}")]
pub struct BulkDeleteError {
    pub failed_id: String,
    pub completed: usize,
    pub total: usize,
    #[source]
    pub source: StoreError,
}

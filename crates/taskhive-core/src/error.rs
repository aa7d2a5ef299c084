//! Error types for taskhive-core.

use thiserror::Error;

/// Result type alias for taskhive-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in taskhive-core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid path format for a field assignment.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown visibility name.
    #[error("unknown visibility '{0}' (expected Private, Public or Workspace)")]
    UnknownVisibility(String),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),
}

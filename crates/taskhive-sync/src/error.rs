//! Error types for remote calls.

use taskhive_store::{KvError, StoreError};
use thiserror::Error;

/// Result type alias for remote operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur talking to the remote API.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network failure, timeout or undecodable response body.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status; `message` is the response body as text.
    #[error("remote API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// No token stored under `authToken`.
    #[error("not logged in")]
    NotAuthenticated,

    /// An auth endpoint answered without a token.
    #[error("auth response did not contain a token")]
    MissingToken,

    /// Input rejected before any request was sent.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("workspace '{0}' not found")]
    UnknownWorkspace(String),

    /// The local workspace has no remote counterpart yet.
    #[error("workspace '{0}' has not been created remotely")]
    NotLinked(String),

    /// Local store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Token storage failure.
    #[error("token storage error: {0}")]
    Kv(#[from] KvError),
}

impl SyncError {
    /// Whether logging in again could fix this error.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::Status { status: 401 | 403, .. }
        )
    }
}

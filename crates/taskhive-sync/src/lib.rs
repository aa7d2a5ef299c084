//! Remote API access for the taskhive client.
//!
//! [`RemoteClient`] speaks the HTTP API; [`Synchronizer`] mirrors store
//! mutations through it without ever rolling back local state.

pub mod client;
pub mod error;
pub mod sync;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{validate_email, RemoteClient};
pub use error::{Result, SyncError};
pub use sync::{SyncReport, Synced, Synchronizer};
pub use types::{RemoteBoard, RemoteWorkspace, UserProfile};

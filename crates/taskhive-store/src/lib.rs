//! Local-first store for the taskhive client.
//!
//! State lives in memory and is written through to a durable key-value store
//! under these keys:
//! - `workspaces`: JSON array of workspaces
//! - `boards`: JSON array of boards with their lists and cards
//! - `currentWorkspaceId`: id of the selected workspace
//! - `cardData-<cardId>`: extended detail for one card
//! - `authToken`: bearer token for the remote API

pub mod config;
pub mod error;
pub mod file_kv;
pub mod keys;
pub mod kv;
pub mod store;

pub use config::{ApiSettings, ClientConfig, WorkspaceDefaults};
pub use error::{BulkDeleteError, KvError, Result, StoreError};
pub use file_kv::FileKv;
pub use kv::{KvStore, MemoryKv};
pub use store::{BoardStore, BulkProgress};

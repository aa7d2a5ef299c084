//! Change notifications published by the store after each committed mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreChange {
    /// State was loaded (or seeded with the default workspace).
    Initialized { workspaces: usize, boards: usize },
    WorkspaceCreated { id: String },
    WorkspaceUpdated { id: String },
    /// Workspace removed together with its boards.
    WorkspaceDeleted { id: String, boards_removed: usize },
    CurrentWorkspaceChanged { id: String },
    BoardCreated { id: String, workspace_id: String },
    /// Board fields changed; `fields` names the top-level keys.
    BoardUpdated { id: String, fields: Vec<String> },
    BoardDeleted { id: String },
    CardDetailSaved { card_id: String },
    /// Everything was wiped (logout).
    Cleared,
}

impl StoreChange {
    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Initialized { .. } => "INITIALIZED",
            Self::WorkspaceCreated { .. } => "WORKSPACE_CREATED",
            Self::WorkspaceUpdated { .. } => "WORKSPACE_UPDATED",
            Self::WorkspaceDeleted { .. } => "WORKSPACE_DELETED",
            Self::CurrentWorkspaceChanged { .. } => "CURRENT_WORKSPACE_CHANGED",
            Self::BoardCreated { .. } => "BOARD_CREATED",
            Self::BoardUpdated { .. } => "BOARD_UPDATED",
            Self::BoardDeleted { .. } => "BOARD_DELETED",
            Self::CardDetailSaved { .. } => "CARD_DETAIL_SAVED",
            Self::Cleared => "CLEARED",
        }
    }
}

/// A single notification with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEvent {
    /// Strictly increasing per store instance.
    pub seq: u64,

    pub timestamp: DateTime<Utc>,

    pub change: StoreChange,
}

impl StoreEvent {
    #[must_use]
    pub fn new(seq: u64, change: StoreChange) -> Self {
        Self {
            seq,
            timestamp: Utc::now(),
            change,
        }
    }
}

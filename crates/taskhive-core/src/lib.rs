//! taskhive-core: Domain models and patch logic for the task-board client.
//!
//! This crate provides:
//! - `Workspace`, `Board`, `TaskList`, `Card`: the board hierarchy
//! - `CardDetail`: extended card data kept in its own side table
//! - `StoreEvent`: notifications emitted after committed mutations
//! - `BoardPatch` and merge-patch helpers for shallow board updates
//! - `IdGenerator`: prefixed monotonic ids

pub mod detail;
pub mod error;
pub mod event;
pub mod id;
pub mod model;
pub mod patch;

pub use detail::{Attachment, CardDetail, Checklist, Comment, Member, Todo};
pub use error::{CoreError, Result};
pub use event::{StoreChange, StoreEvent};
pub use id::{IdGenerator, IdKind};
pub use model::{
    now_millis, require_name, Board, Card, NewBoard, NewWorkspace, TaskList, Visibility,
    Workspace, WorkspaceChanges,
};
pub use patch::{
    apply_board_patch, apply_merge_patch, apply_set_operation, diff_values, BoardPatch,
    SetOperation,
};

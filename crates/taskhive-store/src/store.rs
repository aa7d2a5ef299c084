//! The workspace/board store.
//!
//! Single source of truth for workspaces, boards and the selected workspace.
//! Every operation takes the state lock, mutates, awaits the write-through to
//! the key-value store and only then releases the lock, so two operations
//! never race on the persisted copy.
//!
//! Persistence failures are soft: they are logged and the in-memory state
//! stays authoritative for the session.
//!
//! Mutations on a store that has not been loaded load it first, so they
//! never write an empty view over stored data.

use crate::config::WorkspaceDefaults;
use crate::error::{BulkDeleteError, Result, StoreError};
use crate::keys;
use crate::kv::KvStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use taskhive_core::{
    apply_board_patch, require_name, Board, BoardPatch, Card, CardDetail, IdGenerator, IdKind,
    NewBoard, NewWorkspace, StoreChange, StoreEvent, TaskList, Workspace, WorkspaceChanges,
};
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Buffered notifications per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

/// Progress report emitted after each item of a bulk delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkProgress {
    /// Items completed so far, 1-based.
    pub current: usize,
    pub total: usize,
    /// Id of the item that just completed.
    pub id: String,
}

#[derive(Debug, Clone, Copy)]
enum Bucket {
    Workspaces,
    Boards,
    CurrentWorkspace,
    NextId,
}

#[derive(Debug, Default)]
struct StoreState {
    initialized: bool,
    workspaces: Vec<Workspace>,
    boards: Vec<Board>,
    current_workspace_id: Option<String>,
    ids: IdGenerator,
    seq: u64,
}

impl StoreState {
    fn has_workspace(&self, id: &str) -> bool {
        self.workspaces.iter().any(|w| w.id == id)
    }

    fn board_mut(&mut self, id: &str) -> Option<&mut Board> {
        self.boards.iter_mut().find(|b| b.id == id)
    }

    fn card_mut(&mut self, card_id: &str) -> Option<&mut Card> {
        self.boards.iter_mut().find_map(|b| b.card_mut(card_id))
    }
}

/// Process-wide state container for workspaces and boards.
///
/// Share it behind an `Arc`; every read returns an owned snapshot.
pub struct BoardStore {
    kv: Arc<dyn KvStore>,
    defaults: WorkspaceDefaults,
    state: Mutex<StoreState>,
    events: broadcast::Sender<StoreEvent>,
}

impl std::fmt::Debug for BoardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardStore")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl BoardStore {
    /// Create a store over the given backend with default seed values.
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self::with_defaults(kv, WorkspaceDefaults::default())
    }

    /// Create a store that seeds empty state with `defaults`.
    #[must_use]
    pub fn with_defaults(kv: Arc<dyn KvStore>, defaults: WorkspaceDefaults) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            kv,
            defaults,
            state: Mutex::new(StoreState::default()),
            events,
        }
    }

    /// The backend this store writes through to.
    #[must_use]
    pub fn kv(&self) -> Arc<dyn KvStore> {
        Arc::clone(&self.kv)
    }

    /// Receive a `StoreEvent` after every committed mutation.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // --- Lifecycle ---

    /// Load persisted state, seeding a default workspace when there is none.
    ///
    /// Calling it again after success is a no-op. Boards whose workspace is
    /// gone are discarded and duplicate ids keep their first occurrence.
    ///
    /// # Errors
    /// Returns `StoreError::Persistence` or `StoreError::Corrupt` when stored
    /// state cannot be read; nothing is overwritten in that case.
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.load(&mut state).await
    }

    async fn load(&self, state: &mut StoreState) -> Result<()> {
        if state.initialized {
            return Ok(());
        }

        let mut workspaces: Vec<Workspace> =
            self.read_json(keys::WORKSPACES).await?.unwrap_or_default();
        let mut boards: Vec<Board> = self.read_json(keys::BOARDS).await?.unwrap_or_default();
        let stored_current = self.kv.get(keys::CURRENT_WORKSPACE_ID).await?;
        let stored_next: Option<u64> = self.read_json(keys::NEXT_ID).await?;

        let mut dirty = Vec::new();

        if dedupe_by_id(&mut workspaces, |w| &w.id) > 0 {
            dirty.push(Bucket::Workspaces);
        }
        let mut dropped = dedupe_by_id(&mut boards, |b| &b.id);
        let before = boards.len();
        boards.retain(|b| workspaces.iter().any(|w| w.id == b.workspace_id));
        if before != boards.len() {
            warn!(count = before - boards.len(), "Discarding orphaned boards");
        }
        dropped += before - boards.len();
        if dropped > 0 {
            dirty.push(Bucket::Boards);
        }

        if let Some(next) = stored_next {
            state.ids.resume_at(next);
        }
        for ws in &workspaces {
            state.ids.observe(&ws.id);
        }
        for board in &boards {
            state.ids.observe(&board.id);
            for list in &board.lists {
                state.ids.observe(&list.id);
                for card in &list.cards {
                    state.ids.observe(&card.id);
                }
            }
        }

        if workspaces.is_empty() {
            let ws = Workspace::new(
                state.ids.next(IdKind::Workspace),
                self.defaults.workspace_name.clone(),
                self.defaults.visibility,
            );
            info!(id = %ws.id, "Seeding default workspace");
            workspaces.push(ws);
            dirty.extend([Bucket::Workspaces, Bucket::NextId]);
        }

        let current = match stored_current {
            Some(id) if workspaces.iter().any(|w| w.id == id) => id,
            _ => {
                dirty.push(Bucket::CurrentWorkspace);
                workspaces[0].id.clone()
            }
        };

        state.workspaces = workspaces;
        state.boards = boards;
        state.current_workspace_id = Some(current);
        state.initialized = true;

        self.persist(state, &dirty).await;

        let change = StoreChange::Initialized {
            workspaces: state.workspaces.len(),
            boards: state.boards.len(),
        };
        self.emit(state, change);
        Ok(())
    }

    /// Whether `initialize` has completed since construction or the last clear.
    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.initialized
    }

    /// Drop all workspaces, boards and card detail, in memory and on disk.
    ///
    /// The workspaces bucket is removed first: once it is gone a reload
    /// starts from scratch no matter which later removals were interrupted.
    /// The id counter and its stored copy are kept so ids are never handed
    /// out twice.
    pub async fn clear_all_data(&self) {
        let mut state = self.state.lock().await;
        state.initialized = false;
        state.workspaces.clear();
        state.boards.clear();
        state.current_workspace_id = None;

        if let Err(e) = self.kv.remove(keys::WORKSPACES).await {
            warn!(error = %e, "Failed to remove workspaces bucket");
        }

        let mut rest = vec![
            keys::BOARDS.to_string(),
            keys::CURRENT_WORKSPACE_ID.to_string(),
        ];
        match self.kv.keys().await {
            Ok(all) => rest.extend(all.into_iter().filter(|k| keys::is_card_data(k))),
            Err(e) => warn!(error = %e, "Failed to list card detail keys"),
        }
        if let Err(e) = self.kv.remove_many(&rest).await {
            warn!(error = %e, "Failed to remove stored state");
        }

        info!("Cleared all data");
        self.emit(&mut state, StoreChange::Cleared);
    }

    // --- Workspaces ---

    /// All workspaces in insertion order.
    pub async fn workspaces(&self) -> Vec<Workspace> {
        self.state.lock().await.workspaces.clone()
    }

    /// A workspace by id.
    pub async fn workspace(&self, id: &str) -> Option<Workspace> {
        let state = self.state.lock().await;
        state.workspaces.iter().find(|w| w.id == id).cloned()
    }

    /// Id of the selected workspace.
    pub async fn current_workspace_id(&self) -> Option<String> {
        self.state.lock().await.current_workspace_id.clone()
    }

    /// The selected workspace.
    pub async fn current_workspace(&self) -> Option<Workspace> {
        let state = self.state.lock().await;
        let id = state.current_workspace_id.as_deref()?;
        state.workspaces.iter().find(|w| w.id == id).cloned()
    }

    /// Select a workspace. Returns `false` when the id is unknown.
    pub async fn set_current_workspace(&self, id: &str) -> bool {
        let Some(mut state) = self.try_lock_loaded("select workspace").await else {
            return false;
        };
        if !state.has_workspace(id) {
            debug!(id = %id, "Select skipped, workspace not found");
            return false;
        }
        state.current_workspace_id = Some(id.to_string());
        self.persist(&state, &[Bucket::CurrentWorkspace]).await;
        self.emit(
            &mut state,
            StoreChange::CurrentWorkspaceChanged { id: id.to_string() },
        );
        true
    }

    /// Create a workspace and make it current.
    ///
    /// # Errors
    /// Returns `StoreError::Validation` if the trimmed name is empty, or the
    /// load error when stored state cannot be read.
    pub async fn create_workspace(&self, input: NewWorkspace) -> Result<Workspace> {
        let name = require_name(&input.name, "workspace name").map_err(StoreError::from_core)?;

        let mut state = self.lock_loaded().await?;
        let ws = Workspace::new(state.ids.next(IdKind::Workspace), name, input.visibility);
        state.workspaces.push(ws.clone());
        state.current_workspace_id = Some(ws.id.clone());

        self.persist(
            &state,
            &[Bucket::Workspaces, Bucket::CurrentWorkspace, Bucket::NextId],
        )
        .await;

        info!(id = %ws.id, name = %ws.name, "Created workspace");
        self.emit(&mut state, StoreChange::WorkspaceCreated { id: ws.id.clone() });
        self.emit(
            &mut state,
            StoreChange::CurrentWorkspaceChanged { id: ws.id.clone() },
        );
        Ok(ws)
    }

    /// Replace a workspace's name and visibility.
    ///
    /// Returns `Ok(None)` without touching anything when the id is unknown.
    ///
    /// # Errors
    /// Returns `StoreError::Validation` if the trimmed name is empty.
    pub async fn edit_workspace(
        &self,
        id: &str,
        changes: WorkspaceChanges,
    ) -> Result<Option<Workspace>> {
        let name = require_name(&changes.name, "workspace name").map_err(StoreError::from_core)?;

        let mut state = self.lock_loaded().await?;
        let Some(ws) = state.workspaces.iter_mut().find(|w| w.id == id) else {
            debug!(id = %id, "Edit skipped, workspace not found");
            return Ok(None);
        };
        ws.name = name;
        ws.visibility = changes.visibility;
        let updated = ws.clone();

        self.persist(&state, &[Bucket::Workspaces]).await;

        info!(id = %id, "Edited workspace");
        self.emit(&mut state, StoreChange::WorkspaceUpdated { id: id.to_string() });
        Ok(Some(updated))
    }

    /// Record the id the remote API assigned to a workspace.
    pub async fn link_remote(&self, id: &str, remote_id: i64) -> bool {
        let Some(mut state) = self.try_lock_loaded("link workspace").await else {
            return false;
        };
        let Some(ws) = state.workspaces.iter_mut().find(|w| w.id == id) else {
            return false;
        };
        ws.remote_id = Some(remote_id);

        self.persist(&state, &[Bucket::Workspaces]).await;

        debug!(id = %id, remote_id, "Linked workspace to remote");
        self.emit(&mut state, StoreChange::WorkspaceUpdated { id: id.to_string() });
        true
    }

    /// Delete a workspace together with its boards and their card detail.
    ///
    /// Returns `Ok(false)` when the id is unknown. If the deleted workspace
    /// was current, the first remaining one becomes current.
    ///
    /// # Errors
    /// Returns `StoreError::Validation` when asked to delete the last workspace.
    pub async fn delete_workspace(&self, id: &str) -> Result<bool> {
        let mut state = self.lock_loaded().await?;
        let Some(pos) = state.workspaces.iter().position(|w| w.id == id) else {
            debug!(id = %id, "Delete skipped, workspace not found");
            return Ok(false);
        };
        if state.workspaces.len() == 1 {
            return Err(StoreError::Validation(
                "cannot delete the last remaining workspace".into(),
            ));
        }

        state.workspaces.remove(pos);
        let (removed, kept): (Vec<Board>, Vec<Board>) = std::mem::take(&mut state.boards)
            .into_iter()
            .partition(|b| b.workspace_id == id);
        state.boards = kept;

        let mut buckets = vec![Bucket::Workspaces];
        if !removed.is_empty() {
            buckets.push(Bucket::Boards);
        }
        let mut new_current = None;
        if state.current_workspace_id.as_deref() == Some(id) {
            let first = state.workspaces[0].id.clone();
            state.current_workspace_id = Some(first.clone());
            new_current = Some(first);
            buckets.push(Bucket::CurrentWorkspace);
        }

        self.persist(&state, &buckets).await;
        let card_ids: Vec<String> = removed.iter().flat_map(Board::card_ids).collect();
        self.remove_card_details(&card_ids).await;

        info!(id = %id, boards = removed.len(), "Deleted workspace");
        self.emit(
            &mut state,
            StoreChange::WorkspaceDeleted {
                id: id.to_string(),
                boards_removed: removed.len(),
            },
        );
        if let Some(current) = new_current {
            self.emit(&mut state, StoreChange::CurrentWorkspaceChanged { id: current });
        }
        Ok(true)
    }

    /// Delete several workspaces one after another.
    ///
    /// `on_progress` runs after each completed deletion. The first failure
    /// (unknown id or a rejected delete) stops the run; deletions already
    /// done stay applied and later ids are not attempted.
    ///
    /// # Errors
    /// Returns `BulkDeleteError` naming the id that failed.
    pub async fn delete_workspaces<S, F>(
        &self,
        ids: &[S],
        mut on_progress: F,
    ) -> std::result::Result<usize, BulkDeleteError>
    where
        S: AsRef<str>,
        F: FnMut(BulkProgress),
    {
        let total = ids.len();
        for (index, id) in ids.iter().enumerate() {
            let id = id.as_ref();
            let failure = match self.delete_workspace(id).await {
                Ok(true) => None,
                Ok(false) => Some(StoreError::NotFound(format!("workspace '{id}'"))),
                Err(e) => Some(e),
            };
            if let Some(source) = failure {
                warn!(id = %id, completed = index, total, error = %source, "Bulk delete stopped");
                return Err(BulkDeleteError {
                    failed_id: id.to_string(),
                    completed: index,
                    total,
                    source,
                });
            }
            on_progress(BulkProgress {
                current: index + 1,
                total,
                id: id.to_string(),
            });
        }
        Ok(total)
    }

    // --- Boards ---

    /// All boards in insertion order.
    pub async fn boards(&self) -> Vec<Board> {
        self.state.lock().await.boards.clone()
    }

    /// A board by id.
    pub async fn board(&self, id: &str) -> Option<Board> {
        let state = self.state.lock().await;
        state.boards.iter().find(|b| b.id == id).cloned()
    }

    /// Boards of one workspace in insertion order.
    pub async fn get_boards(&self, workspace_id: &str) -> Vec<Board> {
        let state = self.state.lock().await;
        state
            .boards
            .iter()
            .filter(|b| b.workspace_id == workspace_id)
            .cloned()
            .collect()
    }

    /// Create an empty board.
    ///
    /// # Errors
    /// Returns `StoreError::Validation` for a blank title or unknown workspace.
    pub async fn create_board(&self, input: NewBoard) -> Result<Board> {
        let title = require_name(&input.title, "board title").map_err(StoreError::from_core)?;

        let mut state = self.lock_loaded().await?;
        if !state.has_workspace(&input.workspace_id) {
            return Err(StoreError::Validation(format!(
                "workspace '{}' does not exist",
                input.workspace_id
            )));
        }

        let mut board = Board::new(state.ids.next(IdKind::Board), title, &input.workspace_id);
        if let Some(color) = input.background_color.filter(|c| !c.trim().is_empty()) {
            board.set_background_color(color);
        }
        state.boards.push(board.clone());

        self.persist(&state, &[Bucket::Boards, Bucket::NextId]).await;

        info!(id = %board.id, workspace_id = %board.workspace_id, "Created board");
        self.emit(
            &mut state,
            StoreChange::BoardCreated {
                id: board.id.clone(),
                workspace_id: board.workspace_id.clone(),
            },
        );
        Ok(board)
    }

    /// Overwrite the board fields present in `patch`, in place.
    ///
    /// Returns `Ok(None)` when the board does not exist.
    ///
    /// # Errors
    /// Returns `StoreError::Validation` for a blank title or when both
    /// background kinds are given.
    pub async fn update_board(&self, id: &str, patch: BoardPatch) -> Result<Option<Board>> {
        patch.validate().map_err(StoreError::from_core)?;

        let mut state = self.lock_loaded().await?;
        let Some(pos) = state.boards.iter().position(|b| b.id == id) else {
            debug!(id = %id, "Update skipped, board not found");
            return Ok(None);
        };

        let (updated, fields) =
            apply_board_patch(&state.boards[pos], &patch).map_err(StoreError::from_core)?;
        state.boards[pos] = updated.clone();

        if !fields.is_empty() {
            self.persist(&state, &[Bucket::Boards]).await;
            info!(id = %id, fields = ?fields, "Updated board");
            self.emit(
                &mut state,
                StoreChange::BoardUpdated {
                    id: id.to_string(),
                    fields,
                },
            );
        }
        Ok(Some(updated))
    }

    /// Delete a board and its cards' detail. Returns `false` when unknown.
    pub async fn delete_board(&self, id: &str) -> bool {
        let Some(mut state) = self.try_lock_loaded("delete board").await else {
            return false;
        };
        let Some(pos) = state.boards.iter().position(|b| b.id == id) else {
            return false;
        };
        let board = state.boards.remove(pos);

        self.persist(&state, &[Bucket::Boards]).await;
        self.remove_card_details(&board.card_ids()).await;

        info!(id = %id, "Deleted board");
        self.emit(&mut state, StoreChange::BoardDeleted { id: id.to_string() });
        true
    }

    // --- Lists and cards ---

    /// Append a list to a board. The title may be empty.
    /// Returns `None` when the board does not exist.
    pub async fn add_list(&self, board_id: &str, title: &str) -> Option<TaskList> {
        self.mutate_board(board_id, |board, ids| {
            let list = TaskList::new(ids.next(IdKind::List), title.trim());
            board.lists.push(list.clone());
            Some((list, Vec::new()))
        })
        .await
    }

    /// Rename a list. Returns `false` when the board or list does not exist.
    pub async fn rename_list(&self, board_id: &str, list_id: &str, title: &str) -> bool {
        self.mutate_board(board_id, |board, _| {
            board.list_mut(list_id)?.title = title.trim().to_string();
            Some(((), Vec::new()))
        })
        .await
        .is_some()
    }

    /// Remove a list and its cards' detail. Returns `false` when not found.
    pub async fn delete_list(&self, board_id: &str, list_id: &str) -> bool {
        self.mutate_board(board_id, |board, _| {
            let pos = board.lists.iter().position(|l| l.id == list_id)?;
            let list = board.lists.remove(pos);
            let card_ids = list.cards.into_iter().map(|c| c.id).collect();
            Some(((), card_ids))
        })
        .await
        .is_some()
    }

    /// Append a card to a list. Returns `Ok(None)` when the board or list
    /// does not exist.
    ///
    /// # Errors
    /// Returns `StoreError::Validation` for blank card text.
    pub async fn add_card(&self, board_id: &str, list_id: &str, text: &str) -> Result<Option<Card>> {
        let text = require_name(text, "card text").map_err(StoreError::from_core)?;
        Ok(self
            .mutate_board(board_id, |board, ids| {
                let list = board.list_mut(list_id)?;
                let card = Card::new(ids.next(IdKind::Card), text);
                list.cards.push(card.clone());
                Some((card, Vec::new()))
            })
            .await)
    }

    /// Flip a card's completion flag, returning the new value.
    pub async fn toggle_card(&self, board_id: &str, list_id: &str, card_id: &str) -> Option<bool> {
        self.mutate_board(board_id, |board, _| {
            let card = board.list_mut(list_id)?.card_mut(card_id)?;
            card.completed = !card.completed;
            Some((card.completed, Vec::new()))
        })
        .await
    }

    /// Remove a card and its detail. Returns `false` when not found.
    pub async fn delete_card(&self, board_id: &str, list_id: &str, card_id: &str) -> bool {
        self.mutate_board(board_id, |board, _| {
            let list = board.list_mut(list_id)?;
            let pos = list.cards.iter().position(|c| c.id == card_id)?;
            list.cards.remove(pos);
            Some(((), vec![card_id.to_string()]))
        })
        .await
        .is_some()
    }

    // --- Card detail ---

    /// Extended detail for a card, loaded from its own key on first access.
    ///
    /// Cards never opened before get [`CardDetail::initial`]. Unreadable
    /// documents are logged and treated the same way.
    pub async fn card_detail(&self, card_id: &str) -> CardDetail {
        let mut state = self.state.lock().await;
        if let Some(detail) = state.card_mut(card_id).and_then(|c| c.detail.clone()) {
            return detail;
        }

        let key = keys::card_data(card_id);
        let mut detail = match self.kv.get(&key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(key = %key, error = %e, "Unreadable card detail, starting fresh");
                CardDetail::initial()
            }),
            Ok(None) => CardDetail::initial(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to load card detail");
                CardDetail::initial()
            }
        };

        if let Some(card) = state.card_mut(card_id) {
            if detail.card_name.is_none() {
                detail.card_name = Some(card.text.clone());
            }
            card.detail = Some(detail.clone());
        }
        debug!(card_id = %card_id, "Materialized card detail");
        detail
    }

    /// Store a card's detail under its own key and merge it into the card.
    ///
    /// # Errors
    /// Returns `StoreError::Json` if the detail cannot be serialized.
    pub async fn save_card_detail(&self, card_id: &str, detail: CardDetail) -> Result<()> {
        let raw = serde_json::to_string(&detail)?;
        let key = keys::card_data(card_id);

        let mut state = self.state.lock().await;
        if let Err(e) = self.kv.set(&key, &raw).await {
            warn!(key = %key, error = %e, "Failed to persist card detail");
        }
        if let Some(card) = state.card_mut(card_id) {
            card.detail = Some(detail);
        }

        self.emit(
            &mut state,
            StoreChange::CardDetailSaved {
                card_id: card_id.to_string(),
            },
        );
        Ok(())
    }

    /// Forget a card's detail, on disk and in memory.
    pub async fn clear_card_detail(&self, card_id: &str) {
        let mut state = self.state.lock().await;
        self.remove_card_details(&[card_id.to_string()]).await;
        if let Some(card) = state.card_mut(card_id) {
            card.detail = None;
        }
    }

    // --- Private helpers ---

    /// Run `f` on one board; when it returns `Some`, persist boards, drop the
    /// detail of the card ids it hands back and announce the change.
    async fn mutate_board<R, F>(&self, board_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut Board, &mut IdGenerator) -> Option<(R, Vec<String>)>,
    {
        let mut state = self.try_lock_loaded("update board").await?;
        let mut ids = state.ids.clone();
        let board = state.board_mut(board_id)?;
        let (result, dropped_cards) = f(board, &mut ids)?;
        let allocated = ids.peek() != state.ids.peek();
        state.ids = ids;

        if allocated {
            self.persist(&state, &[Bucket::Boards, Bucket::NextId]).await;
        } else {
            self.persist(&state, &[Bucket::Boards]).await;
        }
        self.remove_card_details(&dropped_cards).await;

        self.emit(
            &mut state,
            StoreChange::BoardUpdated {
                id: board_id.to_string(),
                fields: vec!["lists".to_string()],
            },
        );
        Some(result)
    }

    /// Lock the state, loading it first if that has not happened yet.
    async fn lock_loaded(&self) -> Result<MutexGuard<'_, StoreState>> {
        let mut state = self.state.lock().await;
        self.load(&mut state).await?;
        Ok(state)
    }

    async fn try_lock_loaded(&self, op: &str) -> Option<MutexGuard<'_, StoreState>> {
        match self.lock_loaded().await {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(op, error = %e, "Stored state unavailable, skipping");
                None
            }
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.kv.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize state");
                return;
            }
        };
        if let Err(e) = self.kv.set(key, &raw).await {
            warn!(key = %key, error = %e, "Failed to persist state, keeping in-memory copy");
        }
    }

    async fn persist(&self, state: &StoreState, buckets: &[Bucket]) {
        for bucket in buckets {
            match bucket {
                Bucket::Workspaces => self.write_json(keys::WORKSPACES, &state.workspaces).await,
                Bucket::Boards => self.write_json(keys::BOARDS, &state.boards).await,
                Bucket::NextId => self.write_json(keys::NEXT_ID, &state.ids.peek()).await,
                Bucket::CurrentWorkspace => {
                    let result = match &state.current_workspace_id {
                        Some(id) => self.kv.set(keys::CURRENT_WORKSPACE_ID, id).await,
                        None => self.kv.remove(keys::CURRENT_WORKSPACE_ID).await,
                    };
                    if let Err(e) = result {
                        warn!(error = %e, "Failed to persist current workspace");
                    }
                }
            }
        }
    }

    async fn remove_card_details(&self, card_ids: &[String]) {
        if card_ids.is_empty() {
            return;
        }
        let keys: Vec<String> = card_ids.iter().map(|id| keys::card_data(id)).collect();
        if let Err(e) = self.kv.remove_many(&keys).await {
            warn!(count = keys.len(), error = %e, "Failed to remove card detail");
        }
    }

    fn emit(&self, state: &mut StoreState, change: StoreChange) {
        state.seq += 1;
        debug!(seq = state.seq, kind = change.kind(), "Store event");
        // No subscribers is fine.
        let _ = self.events.send(StoreEvent::new(state.seq, change));
    }
}

/// Keep the first entry for each id. Returns how many were dropped.
fn dedupe_by_id<T>(items: &mut Vec<T>, id: impl Fn(&T) -> &String) -> usize {
    let mut seen = HashSet::new();
    let before = items.len();
    items.retain(|item| seen.insert(id(item).clone()));
    let dropped = before - items.len();
    if dropped > 0 {
        warn!(count = dropped, "Dropping records with duplicate ids");
    }
    dropped
}

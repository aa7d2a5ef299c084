//! Store operations mirrored to the remote API.
//!
//! The local mutation always happens first and is kept no matter what the
//! remote call does. Remote outcomes are handed back next to the local result
//! so callers can report "saved locally, sync failed".

use crate::client::{validate_email, RemoteClient};
use crate::error::{Result, SyncError};
use crate::types::{RemoteBoard, RemoteWorkspace};
use std::collections::HashSet;
use std::sync::Arc;
use taskhive_core::{Board, NewBoard, NewWorkspace, Visibility, Workspace};
use taskhive_store::BoardStore;
use tracing::{info, warn};

/// A committed local change plus the outcome of mirroring it remotely.
#[derive(Debug)]
pub struct Synced<T, R = ()> {
    pub local: T,
    pub remote: Result<R>,
}

impl<T, R> Synced<T, R> {
    /// Whether the remote side accepted the change.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.remote.is_ok()
    }
}

/// What a [`Synchronizer::sync_workspaces`] run did.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Local workspaces created from remote ones.
    pub imported: Vec<String>,
    /// Local workspaces matched by name to an unlinked remote one.
    pub linked: Vec<String>,
    /// Local workspaces created remotely.
    pub pushed: Vec<String>,
    /// Local boards created from remote ones.
    pub boards_imported: usize,
    /// Per-workspace failures; the run continues past them.
    pub failed: Vec<(String, SyncError)>,
}

/// Couples a [`BoardStore`] with a [`RemoteClient`].
#[derive(Debug, Clone)]
pub struct Synchronizer {
    store: Arc<BoardStore>,
    client: RemoteClient,
}

impl Synchronizer {
    #[must_use]
    pub const fn new(store: Arc<BoardStore>, client: RemoteClient) -> Self {
        Self { store, client }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<BoardStore> {
        &self.store
    }

    #[must_use]
    pub const fn client(&self) -> &RemoteClient {
        &self.client
    }

    /// Create a workspace locally, then remotely, linking the two on success.
    ///
    /// # Errors
    /// Returns `SyncError::Store` when the local create is rejected; nothing
    /// is sent in that case.
    pub async fn create_workspace(
        &self,
        input: NewWorkspace,
    ) -> Result<Synced<Workspace, RemoteWorkspace>> {
        let mut local = self.store.create_workspace(input).await?;
        let remote = self.client.create_workspace(&local.name).await;

        match &remote {
            Ok(ws) => {
                self.store.link_remote(&local.id, ws.id).await;
                local.remote_id = Some(ws.id);
            }
            Err(e) => warn!(id = %local.id, error = %e, "Workspace saved locally, remote create failed"),
        }
        Ok(Synced { local, remote })
    }

    /// Create a board locally, then under the workspace's remote counterpart.
    ///
    /// # Errors
    /// Returns `SyncError::Store` when the local create is rejected.
    pub async fn create_board(&self, input: NewBoard) -> Result<Synced<Board, RemoteBoard>> {
        let local = self.store.create_board(input).await?;
        let remote = match self.remote_id(&local.workspace_id).await {
            Ok(remote_ws) => self.client.create_board(&local.title, remote_ws).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &remote {
            warn!(id = %local.id, error = %e, "Board saved locally, remote create failed");
        }
        Ok(Synced { local, remote })
    }

    /// Delete a workspace locally and, when linked, remotely.
    ///
    /// # Errors
    /// Returns `SyncError::Store` when the local delete is rejected.
    pub async fn delete_workspace(&self, id: &str) -> Result<Synced<bool>> {
        let remote_id = self.store.workspace(id).await.and_then(|w| w.remote_id);
        let local = self.store.delete_workspace(id).await?;

        let remote = match remote_id {
            Some(remote_id) if local => self.client.delete_workspace(remote_id).await,
            _ => Ok(()),
        };
        if let Err(e) = &remote {
            warn!(id = %id, error = %e, "Workspace deleted locally, remote delete failed");
        }
        Ok(Synced { local, remote })
    }

    /// Invite `email` to a local workspace that has been created remotely.
    ///
    /// # Errors
    /// Returns `SyncError::Validation` for a malformed email,
    /// `SyncError::UnknownWorkspace` / `SyncError::NotLinked` when there is
    /// no remote workspace to invite to, or the remote failure.
    pub async fn invite(&self, workspace_id: &str, email: &str) -> Result<String> {
        let email = validate_email(email)?;
        let remote_id = self.remote_id(workspace_id).await?;
        self.client.invite(remote_id, &email).await
    }

    /// Reconcile local and remote workspaces.
    ///
    /// Remote workspaces missing locally are adopted by name or imported,
    /// along with their boards; local workspaces never created remotely are
    /// pushed. The selected workspace does not change.
    ///
    /// # Errors
    /// Returns error only if the remote workspace list cannot be fetched.
    pub async fn sync_workspaces(&self) -> Result<SyncReport> {
        let remote = self.client.list_workspaces().await?;
        let current = self.store.current_workspace_id().await;
        let mut report = SyncReport::default();

        let local = self.store.workspaces().await;
        let mut claimed: HashSet<String> = HashSet::new();
        for remote_ws in &remote {
            if local.iter().any(|w| w.remote_id == Some(remote_ws.id)) {
                continue;
            }
            let adopt = local.iter().find(|w| {
                w.remote_id.is_none() && w.name == remote_ws.name && !claimed.contains(&w.id)
            });
            if let Some(ws) = adopt {
                claimed.insert(ws.id.clone());
                self.store.link_remote(&ws.id, remote_ws.id).await;
                report.linked.push(ws.id.clone());
                continue;
            }
            match self
                .store
                .create_workspace(NewWorkspace::new(&remote_ws.name, Visibility::Private))
                .await
            {
                Ok(ws) => {
                    self.store.link_remote(&ws.id, remote_ws.id).await;
                    report.imported.push(ws.id);
                }
                Err(e) => report.failed.push((remote_ws.name.clone(), e.into())),
            }
        }

        for ws in self.store.workspaces().await {
            match ws.remote_id {
                Some(remote_id) => {
                    if let Err(e) = self.import_boards(&ws.id, remote_id, &mut report).await {
                        report.failed.push((ws.id.clone(), e));
                    }
                }
                None => match self.client.create_workspace(&ws.name).await {
                    Ok(created) => {
                        self.store.link_remote(&ws.id, created.id).await;
                        report.pushed.push(ws.id);
                    }
                    Err(e) => report.failed.push((ws.id, e)),
                },
            }
        }

        if let Some(current) = current {
            if self.store.current_workspace_id().await.as_deref() != Some(current.as_str()) {
                self.store.set_current_workspace(&current).await;
            }
        }

        info!(
            imported = report.imported.len(),
            linked = report.linked.len(),
            pushed = report.pushed.len(),
            boards = report.boards_imported,
            failed = report.failed.len(),
            "Synced workspaces"
        );
        Ok(report)
    }

    async fn import_boards(
        &self,
        workspace_id: &str,
        remote_id: i64,
        report: &mut SyncReport,
    ) -> Result<()> {
        let remote_boards = self.client.list_boards(remote_id).await?;
        let mut titles: HashSet<String> = self
            .store
            .get_boards(workspace_id)
            .await
            .into_iter()
            .map(|b| b.title)
            .collect();

        for board in remote_boards {
            if titles.contains(&board.title) {
                continue;
            }
            self.store
                .create_board(NewBoard::new(&board.title, workspace_id))
                .await?;
            titles.insert(board.title);
            report.boards_imported += 1;
        }
        Ok(())
    }

    async fn remote_id(&self, workspace_id: &str) -> Result<i64> {
        let ws = self
            .store
            .workspace(workspace_id)
            .await
            .ok_or_else(|| SyncError::UnknownWorkspace(workspace_id.to_string()))?;
        ws.remote_id
            .ok_or_else(|| SyncError::NotLinked(workspace_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, FakeApi, PASSWORD};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;
    use taskhive_store::{ApiSettings, KvStore, MemoryKv, StoreError};

    async fn setup(login: bool) -> (Arc<FakeApi>, Arc<MemoryKv>, Synchronizer) {
        let (base_url, api) = testing::spawn().await;
        let kv = Arc::new(MemoryKv::new());
        let store = Arc::new(BoardStore::new(kv.clone()));
        store.initialize().await.unwrap();
        let settings = ApiSettings {
            base_url,
            timeout_secs: 5,
        };
        let client = RemoteClient::new(&settings, kv.clone()).unwrap();
        if login {
            client.login("ada@example.com", PASSWORD).await.unwrap();
        }
        (api, kv, Synchronizer::new(store, client))
    }

    async fn default_workspace(sync: &Synchronizer) -> Workspace {
        sync.store().workspaces().await.remove(0)
    }

    #[tokio::test]
    async fn test_create_workspace_links_remote() {
        let (api, kv, sync) = setup(true).await;

        let result = sync
            .create_workspace(NewWorkspace::new("Ops", Visibility::Workspace))
            .await
            .unwrap();

        let remote = result.remote.as_ref().unwrap();
        assert_eq!(result.local.remote_id, Some(remote.id));
        assert_eq!(api.workspaces.lock().unwrap().len(), 1);

        let reloaded = BoardStore::new(kv.clone());
        reloaded.initialize().await.unwrap();
        let stored = reloaded.workspace(&result.local.id).await.unwrap();
        assert_eq!(stored.remote_id, Some(remote.id));
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_local_workspace() {
        let (api, _kv, sync) = setup(true).await;
        api.fail_writes.store(true, Ordering::SeqCst);

        let result = sync
            .create_workspace(NewWorkspace::new("Ops", Visibility::Private))
            .await
            .unwrap();

        assert!(!result.is_synced());
        assert!(matches!(
            result.remote,
            Err(SyncError::Status { status: 500, .. })
        ));
        let stored = sync.store().workspace(&result.local.id).await.unwrap();
        assert_eq!(stored.remote_id, None);
        assert_eq!(sync.store().workspaces().await.len(), 2);
    }

    #[tokio::test]
    async fn test_offline_create_is_local_only() {
        let (api, _kv, sync) = setup(false).await;

        let result = sync
            .create_workspace(NewWorkspace::new("Ops", Visibility::Private))
            .await
            .unwrap();

        assert!(matches!(result.remote, Err(SyncError::NotAuthenticated)));
        assert!(api.workspaces.lock().unwrap().is_empty());
        assert_eq!(sync.store().workspaces().await.len(), 2);
    }

    #[tokio::test]
    async fn test_local_validation_skips_remote() {
        let (api, _kv, sync) = setup(true).await;

        let result = sync
            .create_workspace(NewWorkspace::new("  ", Visibility::Private))
            .await;

        assert!(matches!(
            result,
            Err(SyncError::Store(StoreError::Validation(_)))
        ));
        assert!(api.workspaces.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_board_needs_linked_workspace() {
        let (api, _kv, sync) = setup(true).await;
        let unlinked = default_workspace(&sync).await;

        let result = sync
            .create_board(NewBoard::new("Roadmap", &unlinked.id))
            .await
            .unwrap();
        assert!(matches!(result.remote, Err(SyncError::NotLinked(_))));
        assert_eq!(sync.store().get_boards(&unlinked.id).await.len(), 1);

        let linked = sync
            .create_workspace(NewWorkspace::new("Ops", Visibility::Private))
            .await
            .unwrap()
            .local;
        let result = sync
            .create_board(NewBoard::new("Roadmap", &linked.id))
            .await
            .unwrap();
        let remote = result.remote.unwrap();
        assert_eq!(remote.workspace_id, linked.remote_id);
        assert_eq!(api.boards.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invite() {
        let (api, _kv, sync) = setup(true).await;
        let unlinked = default_workspace(&sync).await;

        assert!(matches!(
            sync.invite(&unlinked.id, "bob@example.com").await,
            Err(SyncError::NotLinked(_))
        ));
        assert!(matches!(
            sync.invite("ws-404", "bob@example.com").await,
            Err(SyncError::UnknownWorkspace(_))
        ));
        assert!(matches!(
            sync.invite(&unlinked.id, "bob").await,
            Err(SyncError::Validation(_))
        ));

        let linked = sync
            .create_workspace(NewWorkspace::new("Ops", Visibility::Private))
            .await
            .unwrap()
            .local;
        let message = sync.invite(&linked.id, " bob@example.com ").await.unwrap();
        assert_eq!(message, "Invitation sent");
        assert_eq!(api.invites.lock().unwrap()[0].email, "bob@example.com");
    }

    #[tokio::test]
    async fn test_delete_workspace_removes_remote() {
        let (api, _kv, sync) = setup(true).await;
        let linked = sync
            .create_workspace(NewWorkspace::new("Ops", Visibility::Private))
            .await
            .unwrap()
            .local;

        let result = sync.delete_workspace(&linked.id).await.unwrap();

        assert!(result.local);
        assert!(result.is_synced());
        assert!(api.workspaces.lock().unwrap().is_empty());

        let missing = sync.delete_workspace(&linked.id).await.unwrap();
        assert!(!missing.local);
    }

    #[tokio::test]
    async fn test_sync_reconciles_both_sides() {
        let (api, _kv, sync) = setup(true).await;
        let default = default_workspace(&sync).await;
        let local_only = sync
            .store()
            .create_workspace(NewWorkspace::new("Local only", Visibility::Private))
            .await
            .unwrap();
        sync.store().set_current_workspace(&default.id).await;

        let remote_default = api.add_workspace(&default.name);
        let remote_ops = api.add_workspace("Ops");
        api.boards.lock().unwrap().push(RemoteBoard {
            id: 900,
            title: "Roadmap".into(),
            workspace_id: Some(remote_ops.id),
        });

        let report = sync.sync_workspaces().await.unwrap();

        assert_eq!(report.linked, vec![default.id.clone()]);
        assert_eq!(report.pushed, vec![local_only.id.clone()]);
        assert_eq!(report.imported.len(), 1);
        assert_eq!(report.boards_imported, 1);
        assert!(report.failed.is_empty());

        let store = sync.store();
        assert_eq!(store.current_workspace_id().await, Some(default.id.clone()));
        assert_eq!(
            store.workspace(&default.id).await.unwrap().remote_id,
            Some(remote_default.id)
        );
        let imported = store.workspace(&report.imported[0]).await.unwrap();
        assert_eq!(imported.name, "Ops");
        assert_eq!(imported.remote_id, Some(remote_ops.id));
        let titles: Vec<String> = store
            .get_boards(&imported.id)
            .await
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["Roadmap"]);
        assert_eq!(api.workspaces.lock().unwrap().len(), 3);

        // A second run has nothing left to do.
        let again = sync.sync_workspaces().await.unwrap();
        assert!(again.imported.is_empty() && again.linked.is_empty() && again.pushed.is_empty());
        assert_eq!(again.boards_imported, 0);
    }

    #[tokio::test]
    async fn test_sync_requires_login() {
        let (_api, kv, sync) = setup(false).await;
        assert!(matches!(
            sync.sync_workspaces().await,
            Err(SyncError::NotAuthenticated)
        ));
        assert_eq!(kv.get("authToken").await.unwrap(), None);
    }
}

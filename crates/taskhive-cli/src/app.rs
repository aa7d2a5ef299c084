//! Opening the data directory the CLI works on.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskhive_store::{BoardStore, ClientConfig, FileKv};
use taskhive_sync::{RemoteClient, Synchronizer};
use tracing::debug;

/// Name of the configuration file inside the data directory.
pub const CONFIG_FILE: &str = "config.yml";

/// An opened, initialized store plus the effective configuration.
pub struct App {
    pub store: Arc<BoardStore>,
    pub config: ClientConfig,
    pub data_dir: PathBuf,
}

impl App {
    /// Load configuration and state from `data_dir`, creating it if needed.
    pub async fn open(data_dir: &Path, api_url: Option<&str>) -> Result<Self> {
        let mut config = ClientConfig::load(data_dir.join(CONFIG_FILE))
            .context("Failed to load configuration")?;
        if let Some(url) = api_url {
            config = config.with_base_url(url);
        }

        let kv = FileKv::open(data_dir)
            .await
            .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
        let store = BoardStore::with_defaults(Arc::new(kv), config.defaults.clone());
        store
            .initialize()
            .await
            .context("Failed to load stored workspaces")?;

        debug!(path = %data_dir.display(), api = %config.api.base_url, "Opened data directory");
        Ok(Self {
            store: Arc::new(store),
            config,
            data_dir: data_dir.to_path_buf(),
        })
    }

    pub fn client(&self) -> Result<RemoteClient> {
        RemoteClient::new(&self.config.api, self.store.kv()).context("Invalid API configuration")
    }

    pub fn synchronizer(&self) -> Result<Synchronizer> {
        Ok(Synchronizer::new(Arc::clone(&self.store), self.client()?))
    }

    /// The given workspace id, or the selected one.
    pub async fn workspace_id(&self, explicit: Option<&str>) -> Result<String> {
        match explicit {
            Some(id) => Ok(id.to_string()),
            None => self
                .store
                .current_workspace_id()
                .await
                .context("No workspace selected"),
        }
    }

    /// Fail unless some board holds `card_id`.
    pub async fn require_card(&self, card_id: &str) -> Result<()> {
        let exists = self
            .store
            .boards()
            .await
            .iter()
            .flat_map(|b| &b.lists)
            .any(|l| l.card(card_id).is_some());
        anyhow::ensure!(exists, "Card {card_id} not found");
        Ok(())
    }
}

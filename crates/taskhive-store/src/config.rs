//! Client configuration.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use taskhive_core::Visibility;

/// Remote API used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// Name given to the workspace seeded on first start.
pub const DEFAULT_WORKSPACE_NAME: &str = "Default Workspace";

/// Client configuration stored in `config.yml` inside the data directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Remote API settings.
    #[serde(default)]
    pub api: ApiSettings,

    /// Values used when seeding a fresh store.
    #[serde(default)]
    pub defaults: WorkspaceDefaults,
}

const fn default_version() -> u32 {
    1
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiSettings {
    /// Base URL every endpoint path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Values for the workspace seeded into an empty store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceDefaults {
    #[serde(default = "default_workspace_name")]
    pub workspace_name: String,

    #[serde(default)]
    pub visibility: Visibility,
}

fn default_workspace_name() -> String {
    DEFAULT_WORKSPACE_NAME.to_string()
}

impl Default for WorkspaceDefaults {
    fn default() -> Self {
        Self {
            workspace_name: default_workspace_name(),
            visibility: Visibility::Private,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: 1,
            api: ApiSettings::default(),
            defaults: WorkspaceDefaults::default(),
        }
    }
}

impl ClientConfig {
    /// Load from a YAML file, falling back to defaults when it does not exist.
    ///
    /// # Errors
    /// Returns `StoreError::Config` if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(StoreError::Config {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        };

        serde_yaml::from_str(&content).map_err(|e| StoreError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write as YAML.
    ///
    /// # Errors
    /// Returns `StoreError::Config` if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let to_config_err = |message: String| StoreError::Config {
            path: path.to_path_buf(),
            message,
        };
        let content = serde_yaml::to_string(self).map_err(|e| to_config_err(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| to_config_err(e.to_string()))
    }

    /// Return a copy pointing at a different API.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }
}

//! Filesystem key-value backend.
//!
//! Each key is one JSON file in the root directory:
//! - file name: slug of the key plus `.json`
//! - contents: `{"key": <original key>, "value": <string>}`
//!
//! Writes go to a temporary file first and are renamed into place, so a
//! crash never leaves a half-written entry behind.

use crate::error::KvError;
use crate::kv::KvStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slug::slugify;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

const ENTRY_EXT: &str = "json";
const TMP_EXT: &str = "json.tmp";

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    key: String,
    value: String,
}

/// Key-value store backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct FileKv {
    root: PathBuf,
}

impl FileKv {
    /// Open (creating if needed) a store rooted at `path`.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        debug!(path = %root.display(), "Opened file store");
        Ok(Self { root })
    }

    /// Get the store root path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, KvError> {
        let name = slugify(key);
        if name.is_empty() {
            return Err(KvError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{name}.{ENTRY_EXT}")))
    }

    async fn read_entry(path: &Path) -> Result<Option<Entry>, KvError> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl KvStore for FileKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let path = self.entry_path(key)?;
        Ok(Self::read_entry(&path)
            .await?
            .filter(|entry| entry.key == key)
            .map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let path = self.entry_path(key)?;

        if let Some(existing) = Self::read_entry(&path).await? {
            if existing.key != key {
                return Err(KvError::KeyCollision {
                    key: key.to_string(),
                    existing: existing.key,
                });
            }
        }

        let content = serde_json::to_string(&Entry {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        let tmp = path.with_extension(TMP_EXT);
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;

        debug!(key = %key, bytes = value.len(), "Wrote entry");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        let path = self.entry_path(key)?;
        match Self::read_entry(&path).await? {
            Some(entry) if entry.key == key => {
                fs::remove_file(&path).await?;
                debug!(key = %key, "Removed entry");
            }
            _ => {}
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, KvError> {
        let root = self.root.clone();
        let scan = tokio::task::spawn_blocking(move || -> Result<Vec<String>, KvError> {
            let mut keys = Vec::new();
            for entry in WalkDir::new(&root).min_depth(1).max_depth(1) {
                let entry = entry.map_err(|e| KvError::Unavailable(e.to_string()))?;
                let path = entry.path();
                if !entry.file_type().is_file()
                    || path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT)
                {
                    continue;
                }
                let content = std::fs::read_to_string(path)?;
                match serde_json::from_str::<Entry>(&content) {
                    Ok(parsed) => keys.push(parsed.key),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    }
                }
            }
            keys.sort();
            Ok(keys)
        });

        scan.await
            .map_err(|e| KvError::Unavailable(e.to_string()))?
    }
}

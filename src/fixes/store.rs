// SPDX-License-Identifier: PMPL-1.0-or-later
//! Key-value stores backing per-site custom CSS

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// String store keyed by name. No concurrency control beyond what the
/// backend provides; concurrent writers to one key race.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.css` file per key under a base directory
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let safe = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.contains("..");
        if !safe {
            return Err(Error::Store(format!("invalid store key '{}'", key)));
        }
        Ok(self.base_path.join(format!("{}.css", key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.base_path).await?;
        tokio::fs::write(&path, value).await?;
        debug!(path = %path.display(), "Saved custom CSS");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);
        store.set("a", "body {}").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("body {}"));
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path().join("sites"));

        assert_eq!(store.get("wp_custom_css_site-1").await.unwrap(), None);
        store.set("wp_custom_css_site-1", "a { color: red; }").await.unwrap();
        assert_eq!(
            store.get("wp_custom_css_site-1").await.unwrap().as_deref(),
            Some("a { color: red; }")
        );
        assert!(temp.path().join("sites/wp_custom_css_site-1.css").exists());
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_keys() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        assert!(matches!(store.set("../escape", "x").await, Err(Error::Store(_))));
        assert!(matches!(store.get("a/b").await, Err(Error::Store(_))));
    }
}

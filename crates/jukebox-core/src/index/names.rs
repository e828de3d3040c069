use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::Mutex as AsyncMutex;

/// Last known display name of every index seen, persisted as one JSON object.
/// Used when a manifest is not loaded or currently unreachable.
pub struct NameCache {
    path: PathBuf,
    names: Mutex<HashMap<String, String>>,
    /// Held from snapshot to end of write so an older snapshot never lands last
    write_lock: AsyncMutex<()>,
}

impl NameCache {
    /// Open the cache, starting empty if the file is missing or unreadable
    pub fn open(path: &Path) -> Self {
        let names = match Self::read(path) {
            Ok(names) => names,
            Err(e) => {
                log::warn!("Failed to load index name cache: {:#}", e);
                HashMap::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            names: Mutex::new(names),
            write_lock: AsyncMutex::new(()),
        }
    }

    fn read(path: &Path) -> Result<HashMap<String, String>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        serde_json::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))
    }

    pub fn get(&self, index_id: &str) -> Option<String> {
        self.names.lock().ok()?.get(index_id).cloned()
    }

    /// Record a name and persist the whole map
    pub async fn set(&self, index_id: &str, name: &str) -> Result<()> {
        let _write = self.write_lock.lock().await;
        let snapshot = {
            let mut names = self
                .names
                .lock()
                .map_err(|_| anyhow::anyhow!("Index name cache lock poisoned"))?;
            if names.get(index_id).map(String::as_str) == Some(name) {
                return Ok(());
            }
            names.insert(index_id.to_string(), name.to_string());
            serde_json::to_string(&*names).context("Failed to serialize index names")?
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        tokio::fs::write(&self.path, snapshot)
            .await
            .with_context(|| format!("Failed to write {:?}", self.path))?;
        Ok(())
    }
}

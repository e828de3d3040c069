//! Engine settings and the list of subscribed indexes.
//! Stored as JSON next to the rest of the save data.

use crate::index::IndexSource;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const INDEXES_CACHE_DIR: &str = "indexes-cache";
pub const INDEX_NAMES_FILENAME: &str = "cached-index-names.json";
pub const RESOLVER_URL: &str = "https://api.cobalt.tools/api/json";

fn default_timeout() -> u64 {
    REQUEST_TIMEOUT_SECS
}

fn default_resolver_url() -> String {
    RESOLVER_URL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JukeboxConfig {
    /// Subscribed manifests, in the order they are fetched
    #[serde(default)]
    pub indexes: Vec<IndexSource>,

    /// Where fetched manifests are cached
    pub cache_dir: PathBuf,

    /// Persisted index id -> display name map
    pub name_cache_path: PathBuf,

    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Audio resolution endpoint used for YouTube alternatives
    #[serde(default = "default_resolver_url")]
    pub resolver_url: String,
}

impl JukeboxConfig {
    /// Default configuration rooted at a save directory
    pub fn for_save_dir(save_dir: &Path) -> Self {
        Self {
            indexes: Vec::new(),
            cache_dir: save_dir.join(INDEXES_CACHE_DIR),
            name_cache_path: save_dir.join(INDEX_NAMES_FILENAME),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            resolver_url: RESOLVER_URL.to_string(),
        }
    }

    pub fn with_indexes(mut self, indexes: Vec<IndexSource>) -> Self {
        self.indexes = indexes;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load a config file. A missing file yields the defaults for the
    /// directory containing it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let save_dir = path.parent().unwrap_or_else(|| Path::new("."));
            log::info!("No config at {:?}, using defaults", path);
            return Ok(Self::for_save_dir(save_dir));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: JukeboxConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file {:?}", path))?;
        log::debug!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_live_under_save_dir() {
        let config = JukeboxConfig::for_save_dir(Path::new("/save"));
        assert_eq!(config.cache_dir, PathBuf::from("/save/indexes-cache"));
        assert_eq!(
            config.name_cache_path,
            PathBuf::from("/save/cached-index-names.json")
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.json");
        let config = JukeboxConfig::load(&path).unwrap();
        assert_eq!(config, JukeboxConfig::for_save_dir(tmp.path()));
    }

    #[test]
    fn save_then_load_keeps_sources() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.json");
        let config = JukeboxConfig::for_save_dir(tmp.path()).with_indexes(vec![
            IndexSource::new("https://example.com/a.json", true),
            IndexSource::new("https://example.com/b.json", false),
        ]);
        config.save(&path).unwrap();

        let loaded = JukeboxConfig::load(&path).unwrap();
        assert_eq!(loaded.indexes.len(), 2);
        assert!(!loaded.indexes[1].enabled);
    }

    #[test]
    fn optional_fields_fall_back() {
        let json = r#"{"cache_dir": "/c", "name_cache_path": "/n.json"}"#;
        let config: JukeboxConfig = serde_json::from_str(json).unwrap();
        assert!(config.indexes.is_empty());
        assert_eq!(config.request_timeout_secs, REQUEST_TIMEOUT_SECS);
        assert_eq!(config.resolver_url, RESOLVER_URL);
    }
}

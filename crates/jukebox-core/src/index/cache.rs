use super::types::*;
use crate::error::{JukeboxError, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Cache file name for a source URL. Depends only on the URL so every fetch
/// of the same source overwrites the same file.
pub fn cache_file_name(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}.json", hasher.finalize())
}

pub fn index_cache_path(cache_dir: &Path, url: &str) -> PathBuf {
    cache_dir.join(cache_file_name(url))
}

/// Read and parse a cached manifest
pub async fn read_cached_index(path: &Path) -> Result<IndexMetadata> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(JukeboxError::missing_file(path));
    }

    let contents = fs::read_to_string(path).await?;
    if contents.trim().is_empty() {
        return Err(JukeboxError::Parse(format!(
            "Index file is empty: {}",
            path.display()
        )));
    }

    let json: Value = serde_json::from_str(&contents)?;
    parse_index(&json)
}

/// Write a manifest to the cache without indentation
pub async fn write_cached_index(path: &Path, json: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let serialized = serde_json::to_string(json)?;
    fs::write(path, serialized).await?;
    log::debug!("Cached index at {:?}", path);
    Ok(())
}

/// Decode the top-level metadata only
pub fn parse_index_metadata(json: &Value) -> Result<IndexMetadata> {
    if !json.is_object() {
        return Err(JukeboxError::Parse("Index supposed to be an object".into()));
    }
    let metadata: IndexMetadata = serde_json::from_value(json.clone())
        .map_err(|e| JukeboxError::Parse(format!("Invalid index metadata: {}", e)))?;
    Ok(metadata)
}

/// Decode a full manifest. Malformed song entries are logged and skipped.
pub fn parse_index(json: &Value) -> Result<IndexMetadata> {
    let mut index = parse_index_metadata(json)?;

    let nongs = json.get("nongs");

    for (key, entry) in section(nongs, "youtube", &index.id) {
        match serde_json::from_value::<YoutubeEntry>(entry.clone()) {
            Ok(parsed) => index
                .songs
                .push(IndexSongMetadata::from_youtube(key, &index.id, parsed)),
            Err(e) => log::error!(
                "Skipping YouTube song {} in index {}: {}",
                key,
                index.id,
                e
            ),
        }
    }

    for (key, entry) in section(nongs, "hosted", &index.id) {
        match serde_json::from_value::<HostedEntry>(entry.clone()) {
            Ok(parsed) => index
                .songs
                .push(IndexSongMetadata::from_hosted(key, &index.id, parsed)),
            Err(e) => log::error!(
                "Skipping hosted song {} in index {}: {}",
                key,
                index.id,
                e
            ),
        }
    }

    Ok(index)
}

fn section<'a>(
    nongs: Option<&'a Value>,
    name: &str,
    index_id: &str,
) -> impl Iterator<Item = (&'a String, &'a Value)> {
    let entries = match nongs.and_then(|n| n.get(name)) {
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            log::warn!("Index {} has a malformed \"{}\" section", index_id, name);
            None
        }
        None => None,
    };
    entries.into_iter().flat_map(|map| map.iter())
}

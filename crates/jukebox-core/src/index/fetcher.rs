use super::cache::{parse_index_metadata, write_cached_index};
use super::types::{IndexMetadata, IndexSource};
use crate::error::{JukeboxError, Result};
use reqwest::Client;
use serde_json::Value;
use std::path::Path;

/// Fetch one manifest and overwrite its cache file.
///
/// The cache is only touched once the body parsed as an object with valid
/// top-level metadata, so a failed fetch leaves the last good copy in place.
pub async fn fetch_index(
    client: &Client,
    source: &IndexSource,
    cache_path: &Path,
) -> Result<IndexMetadata> {
    log::info!("Fetching index {}", source.url);

    let response = client.get(&source.url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(JukeboxError::Network(format!(
            "HTTP {} from {}",
            status, source.url
        )));
    }

    let body = response.text().await?;
    let mut json: Value = serde_json::from_str(&body)?;

    let Some(object) = json.as_object_mut() else {
        return Err(JukeboxError::Validation(
            "Index supposed to be an object".into(),
        ));
    };
    object.insert("url".to_string(), Value::String(source.url.clone()));

    let metadata = parse_index_metadata(&json)?;
    write_cached_index(cache_path, &json).await?;

    log::info!(
        "Index \"{}\" ({}) fetched and cached: {}",
        metadata.name,
        metadata.id,
        source.url
    );
    Ok(metadata)
}

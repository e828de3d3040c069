//! Audio resolution API client
//!
//! Turns a YouTube watch URL into a direct audio stream URL.

use crate::download::downloader::download_to_memory;
use crate::download::types::CancelToken;
use crate::error::{JukeboxError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const STREAM_STATUS: &str = "stream";

#[derive(Debug, Clone, Serialize)]
pub struct ResolveRequest<'a> {
    pub url: &'a str,
    pub format: &'a str,
    #[serde(rename = "audioOnly")]
    pub audio_only: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<serde_json::Value>,
}

impl ResolveResponse {
    /// The stream URL, if the response is a usable stream
    pub fn into_stream_url(self) -> Result<String> {
        if self.status.as_deref() != Some(STREAM_STATUS) {
            return Err(JukeboxError::Resolution(format!(
                "response is not a stream (status: {})",
                self.status.as_deref().unwrap_or("missing")
            )));
        }
        match self.url {
            Some(serde_json::Value::String(url)) => Ok(url),
            _ => Err(JukeboxError::Resolution(
                "stream response has no URL".into(),
            )),
        }
    }
}

/// Ask the resolution API for an mp3 audio-only stream of a video
pub async fn resolve_audio_stream<P>(
    client: &Client,
    resolver_url: &str,
    watch_url: &str,
    cancel: &CancelToken,
    on_progress: P,
) -> Result<String>
where
    P: Fn(f32) + Send + Sync,
{
    let request = client
        .post(resolver_url)
        .header("Accept", "application/json")
        .json(&ResolveRequest {
            url: watch_url,
            format: "mp3",
            audio_only: true,
        });

    let body = download_to_memory(request, cancel, on_progress).await?;
    let response: ResolveResponse = serde_json::from_slice(&body).map_err(|e| {
        JukeboxError::Resolution(format!("unable to parse resolver response: {}", e))
    })?;

    let stream_url = response.into_stream_url()?;
    log::info!("Resolved {} to stream {}", watch_url, stream_url);
    Ok(stream_url)
}

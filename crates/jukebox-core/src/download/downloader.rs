use super::types::CancelToken;
use crate::error::{JukeboxError, Result};
use futures::StreamExt;
use reqwest::RequestBuilder;
use std::path::Path;
use std::time::Instant;
use tokio::fs::{create_dir_all, File};
use tokio::io::AsyncWriteExt;

/// Upper bound on buffer space reserved up front from `Content-Length`
const MAX_PREALLOC_BYTES: u64 = 16 * 1024 * 1024;

/// Send a request and collect the body, reporting the fraction received
/// after every chunk. Cancellation is checked while waiting for the
/// response and for each chunk.
pub async fn download_to_memory<P>(
    request: RequestBuilder,
    cancel: &CancelToken,
    on_progress: P,
) -> Result<Vec<u8>>
where
    P: Fn(f32) + Send + Sync,
{
    let start = Instant::now();
    let response = cancel
        .guard(async { request.send().await.map_err(JukeboxError::from) })
        .await?;

    let url = response.url().to_string();
    let status = response.status();
    if !status.is_success() {
        return Err(JukeboxError::Network(format!("HTTP {} from {}", status, url)));
    }

    let total_size = response.content_length();
    log::debug!("Download size: {:?} bytes ({})", total_size, url);

    let reserve = total_size.unwrap_or(0).min(MAX_PREALLOC_BYTES) as usize;
    let mut bytes = Vec::with_capacity(reserve);
    let mut stream = response.bytes_stream();

    loop {
        let next = cancel.guard(async { Ok(stream.next().await) }).await?;
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk?;
        bytes.extend_from_slice(&chunk);

        if let Some(total) = total_size.filter(|t| *t > 0) {
            on_progress((bytes.len() as f64 / total as f64).min(1.0) as f32);
        }
    }
    on_progress(1.0);

    log::info!(
        "Download stats: url={}, size={} bytes, time={:.2}s",
        url,
        bytes.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(bytes)
}

/// Write downloaded audio to its final location
pub async fn write_song_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    log::debug!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

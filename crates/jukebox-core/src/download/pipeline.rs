use super::downloader::{download_to_memory, write_song_file};
use super::types::{CancelToken, DownloadStage, ProgressReporter};
use crate::api::resolve_audio_stream;
use crate::error::{JukeboxError, Result};
use crate::nongs::{HostedSong, Song, YtSong};
use crate::registry::LocalRegistry;
use reqwest::Client;
use std::path::PathBuf;

/// Share of overall progress spent resolving a YouTube stream URL
pub const RESOLVE_PROGRESS_SHARE: f32 = 0.1;

pub const SONG_FILE_EXTENSION: &str = "mp3";

/// Everything one pipeline run needs
pub struct PipelineContext<'a> {
    pub client: &'a Client,
    pub resolver_url: &'a str,
    pub registry: &'a dyn LocalRegistry,
    pub cancel: &'a CancelToken,
    pub reporter: &'a dyn ProgressReporter,
}

/// A song that passed validation and has somewhere to download from
#[derive(Debug, Clone, Copy)]
pub enum RemoteSource<'a> {
    Youtube(&'a YtSong),
    Hosted(&'a HostedSong),
}

/// Check a song can be downloaded at all, before any work is scheduled
pub fn validate(song: &Song) -> Result<RemoteSource<'_>> {
    match song {
        Song::Local(_) => Err(JukeboxError::Validation(
            "cannot download a local alternative".into(),
        )),
        Song::Youtube(yt) if !yt.has_valid_id() => Err(JukeboxError::Validation(format!(
            "Invalid YouTube ID: {}",
            yt.youtube_id
        ))),
        Song::Youtube(yt) => Ok(RemoteSource::Youtube(yt)),
        Song::Hosted(hosted) => Ok(RemoteSource::Hosted(hosted)),
    }
}

/// Fetch a song's audio and store it under a fresh registry path.
/// Returns `None` when the server sent an empty body.
pub async fn run_pipeline(ctx: &PipelineContext<'_>, song: &Song) -> Result<Option<PathBuf>> {
    let bytes = match validate(song)? {
        RemoteSource::Youtube(yt) => fetch_youtube(ctx, yt).await?,
        RemoteSource::Hosted(hosted) => fetch_hosted(ctx, hosted).await?,
    };

    if ctx.cancel.is_cancelled() {
        return Err(JukeboxError::Cancelled);
    }

    if bytes.is_empty() {
        log::warn!(
            "Empty response for {}, treating as nothing to download",
            song.unique_id()
        );
        return Ok(None);
    }

    let destination = ctx.registry.generate_song_file_path(SONG_FILE_EXTENSION);
    write_song_file(&destination, &bytes).await?;
    Ok(Some(destination))
}

async fn fetch_youtube(ctx: &PipelineContext<'_>, yt: &YtSong) -> Result<Vec<u8>> {
    ctx.reporter.set_stage(DownloadStage::Resolving);
    let stream_url = resolve_audio_stream(
        ctx.client,
        ctx.resolver_url,
        &yt.watch_url(),
        ctx.cancel,
        |p| ctx.reporter.set_progress(p * RESOLVE_PROGRESS_SHARE),
    )
    .await?;

    if ctx.cancel.is_cancelled() {
        return Err(JukeboxError::Cancelled);
    }

    ctx.reporter.set_stage(DownloadStage::Fetching);
    download_to_memory(ctx.client.get(&stream_url), ctx.cancel, |p| {
        ctx.reporter
            .set_progress(RESOLVE_PROGRESS_SHARE + p * (1.0 - RESOLVE_PROGRESS_SHARE))
    })
    .await
}

async fn fetch_hosted(ctx: &PipelineContext<'_>, hosted: &HostedSong) -> Result<Vec<u8>> {
    ctx.reporter.set_stage(DownloadStage::Fetching);
    download_to_memory(ctx.client.get(&hosted.url), ctx.cancel, |p| {
        ctx.reporter.set_progress(p)
    })
    .await
}

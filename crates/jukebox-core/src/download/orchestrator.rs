//! Download orchestration: one cancellable task per alternative.
//!
//! A request for a unique id that is already downloading cancels the older
//! task; only the newest one reports a terminal state.

use super::pipeline::{run_pipeline, validate, PipelineContext};
use super::types::{CancelToken, DownloadOutcome, DownloadStage, ProgressReporter};
use crate::error::{JukeboxError, Result};
use crate::events::JukeboxEvent;
use crate::manager::{lock, DownloadRecord, IndexManager};
use crate::nongs::Song;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tokio::task::JoinHandle;

/// Handle to a scheduled download. Dropping it does not stop the download.
pub struct DownloadHandle {
    unique_id: String,
    task: JoinHandle<DownloadOutcome>,
}

impl DownloadHandle {
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Wait for the download to reach a terminal state
    pub async fn wait(self) -> DownloadOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => DownloadOutcome::Failed(format!("download task failed: {}", e)),
        }
    }
}

/// Reports pipeline progress into the download table, as long as the
/// download it belongs to is still the current one.
struct RecordReporter<'a> {
    manager: &'a IndexManager,
    unique_id: &'a str,
    gd_song_id: i32,
    generation: u64,
}

impl ProgressReporter for RecordReporter<'_> {
    fn set_stage(&self, stage: DownloadStage) {
        let mut downloads = lock(&self.manager.inner.downloads);
        if let Some(record) = downloads.get_mut(self.unique_id) {
            if record.generation == self.generation {
                record.stage = stage;
            }
        }
    }

    fn set_progress(&self, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        {
            let mut downloads = lock(&self.manager.inner.downloads);
            match downloads.get_mut(self.unique_id) {
                Some(record) if record.generation == self.generation => {
                    record.progress = fraction;
                }
                _ => return,
            }
        }
        self.manager.emit(JukeboxEvent::DownloadProgress {
            gd_song_id: self.gd_song_id,
            unique_id: self.unique_id.to_string(),
            progress: fraction,
        });
    }
}

impl IndexManager {
    /// Download an alternative by game song and unique id
    pub fn download(&self, gd_song_id: i32, unique_id: &str) -> Result<DownloadHandle> {
        let song = self
            .list_alternatives(gd_song_id)?
            .into_iter()
            .find(|song| song.unique_id() == unique_id)
            .ok_or_else(|| {
                JukeboxError::not_found(format!("Song {} not found in manifest", unique_id))
            })?;
        self.download_song(song)
    }

    /// Start downloading an alternative.
    ///
    /// Local songs and malformed YouTube ids are rejected before anything is
    /// recorded or requested. Must be called within a tokio runtime.
    pub fn download_song(&self, song: Song) -> Result<DownloadHandle> {
        validate(&song)?;

        let unique_id = song.unique_id().to_string();
        let gd_song_id = song.gd_song_id();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        let (cancel_tx, cancel) = CancelToken::pair();

        {
            let mut downloads = lock(&self.inner.downloads);
            let previous = downloads.insert(
                unique_id.clone(),
                DownloadRecord {
                    generation,
                    gd_song_id,
                    progress: 0.0,
                    stage: DownloadStage::Idle,
                    cancel_tx,
                },
            );
            if let Some(previous) = previous {
                log::info!("Replacing in-flight download of {}", unique_id);
                let _ = previous.cancel_tx.send(true);
            }
        }

        self.emit(JukeboxEvent::DownloadProgress {
            gd_song_id,
            unique_id: unique_id.clone(),
            progress: 0.0,
        });

        let manager = self.clone();
        let task = tokio::spawn(async move { manager.run_download(song, generation, cancel).await });

        Ok(DownloadHandle { unique_id, task })
    }

    /// Progress of an active download, `None` if nothing is downloading
    pub fn download_progress(&self, unique_id: &str) -> Option<f32> {
        lock(&self.inner.downloads)
            .get(unique_id)
            .map(|record| record.progress)
    }

    pub fn download_stage(&self, unique_id: &str) -> Option<DownloadStage> {
        lock(&self.inner.downloads)
            .get(unique_id)
            .map(|record| record.stage)
    }

    /// Cancel an active download. Returns false if none was running.
    pub fn cancel_download(&self, unique_id: &str) -> bool {
        match lock(&self.inner.downloads).get(unique_id) {
            Some(record) => {
                log::info!("Cancelling download of {}", unique_id);
                let _ = record.cancel_tx.send(true);
                true
            }
            None => false,
        }
    }

    /// Game songs with downloads in flight
    pub fn active_downloads(&self) -> Vec<(String, i32)> {
        lock(&self.inner.downloads)
            .iter()
            .map(|(id, record)| (id.clone(), record.gd_song_id))
            .collect()
    }

    async fn run_download(
        &self,
        song: Song,
        generation: u64,
        cancel: CancelToken,
    ) -> DownloadOutcome {
        let unique_id = song.unique_id().to_string();
        let gd_song_id = song.gd_song_id();

        let reporter = RecordReporter {
            manager: self,
            unique_id: &unique_id,
            gd_song_id,
            generation,
        };
        let ctx = PipelineContext {
            client: &self.inner.client,
            resolver_url: &self.inner.config.resolver_url,
            registry: self.inner.registry.as_ref(),
            cancel: &cancel,
            reporter: &reporter,
        };
        let result = run_pipeline(&ctx, &song).await;

        // Whoever removes the record decides the terminal state: a cancel
        // that lands before this point wins over a finished transfer.
        let cancelled = {
            let mut downloads = lock(&self.inner.downloads);
            match downloads.get(&unique_id) {
                Some(record) if record.generation == generation => {
                    let cancelled = *record.cancel_tx.borrow();
                    downloads.remove(&unique_id);
                    cancelled
                }
                _ => {
                    log::info!("Download of {} was superseded", unique_id);
                    return DownloadOutcome::Superseded;
                }
            }
        };

        if cancelled || matches!(result, Err(JukeboxError::Cancelled)) {
            self.emit(JukeboxEvent::error(false, "Failed to fetch song: cancelled"));
            self.emit(JukeboxEvent::StateChanged { gd_song_id });
            return DownloadOutcome::Cancelled;
        }

        let outcome = match result {
            Err(e) => self.fail(gd_song_id, format!("Failed to fetch song: {}", e)),
            Ok(None) => DownloadOutcome::NoContent,
            Ok(Some(path)) => self.adopt(song, path),
        };
        self.emit(JukeboxEvent::StateChanged { gd_song_id });
        outcome
    }

    /// Hand a finished download to the registry and make it active
    fn adopt(&self, song: Song, path: PathBuf) -> DownloadOutcome {
        let gd_song_id = song.gd_song_id();
        let unique_id = song.unique_id().to_string();

        // The adopted copy keeps its index id so the catalog lists it once
        let mut adopted = song;
        adopted.metadata_mut().local_path = Some(path.clone());

        if let Err(e) = self.inner.registry.add_song(adopted) {
            return self.fail(gd_song_id, format!("Failed to add song: {}", e));
        }
        if let Err(e) = self.inner.registry.set_active_song(gd_song_id, &unique_id) {
            return self.fail(gd_song_id, format!("Failed to set song as active: {}", e));
        }

        log::info!("Downloaded {} for {} to {:?}", unique_id, gd_song_id, path);
        DownloadOutcome::Completed(path)
    }

    fn fail(&self, gd_song_id: i32, message: String) -> DownloadOutcome {
        log::error!("Download for {} failed: {}", gd_song_id, message);
        self.emit(JukeboxEvent::error(true, message.clone()));
        DownloadOutcome::Failed(message)
    }
}

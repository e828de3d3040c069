use crate::error::{JukeboxError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::watch;

/// Progress sink for a running download pipeline
pub trait ProgressReporter: Send + Sync {
    /// Enter a new pipeline stage
    fn set_stage(&self, stage: DownloadStage);

    /// Overall progress in [0, 1]
    fn set_progress(&self, fraction: f32);
}

/// A reporter that does nothing.
/// Useful for one-off fetches and tests.
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn set_stage(&self, _stage: DownloadStage) {}
    fn set_progress(&self, _fraction: f32) {}
}

/// Where an active download currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStage {
    Idle,
    /// Asking the resolution API for a stream URL (YouTube only)
    Resolving,
    Fetching,
}

/// Terminal state of one download request
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Completed(PathBuf),
    /// The server answered with an empty body; nothing was written
    NoContent,
    Failed(String),
    Cancelled,
    /// Replaced by a newer request for the same alternative
    Superseded,
}

impl DownloadOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DownloadOutcome::Completed(_))
    }
}

/// Cancellation token wrapper
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// Token plus the sender that cancels it
    pub fn pair() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self::new(rx))
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Never resolves if the sender is dropped
    /// without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
    }

    /// Run a future, aborting it with `Cancelled` as soon as the token fires
    pub async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(JukeboxError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(JukeboxError::Cancelled),
            res = fut => res,
        }
    }
}

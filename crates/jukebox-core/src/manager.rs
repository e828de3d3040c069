//! Owner of all index and download state.

use crate::catalog::merge_alternatives;
use crate::config::JukeboxConfig;
use crate::download::types::{CancelToken, DownloadStage};
use crate::error::{JukeboxError, Result};
use crate::events::{EventSink, JukeboxEvent};
use crate::index::{
    fetch_index, index_cache_path, read_cached_index, IndexMetadata, IndexSource, NameCache,
};
use crate::nongs::{RemoteNongs, Song};
use crate::registry::LocalRegistry;
use futures::future::join_all;
use reqwest::Client;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// Manifests and the remote alternatives they contribute
#[derive(Default)]
pub(crate) struct IndexState {
    pub(crate) loaded: HashMap<String, IndexMetadata>,
    pub(crate) remote: HashMap<i32, RemoteNongs>,
}

/// In-flight download for one unique id
pub(crate) struct DownloadRecord {
    pub(crate) generation: u64,
    pub(crate) gd_song_id: i32,
    pub(crate) progress: f32,
    pub(crate) stage: DownloadStage,
    pub(crate) cancel_tx: watch::Sender<bool>,
}

pub(crate) struct Inner {
    pub(crate) config: JukeboxConfig,
    pub(crate) client: Client,
    pub(crate) registry: Arc<dyn LocalRegistry>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) names: NameCache,
    pub(crate) sources: Mutex<Vec<IndexSource>>,
    pub(crate) state: Mutex<IndexState>,
    pub(crate) downloads: Mutex<HashMap<String, DownloadRecord>>,
    pub(crate) refresh_cancel: Mutex<Option<watch::Sender<bool>>>,
    pub(crate) next_generation: AtomicU64,
    pub(crate) initialized: AtomicBool,
}

/// Index cache, catalog merge and download orchestration for one process.
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct IndexManager {
    pub(crate) inner: Arc<Inner>,
}

/// Lock a table, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl IndexManager {
    pub fn new(
        config: JukeboxConfig,
        registry: Arc<dyn LocalRegistry>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let names = NameCache::open(&config.name_cache_path);
        let sources = config.indexes.clone();

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                client,
                registry,
                events,
                names,
                sources: Mutex::new(sources),
                state: Mutex::new(IndexState::default()),
                downloads: Mutex::new(HashMap::new()),
                refresh_cancel: Mutex::new(None),
                next_generation: AtomicU64::new(0),
                initialized: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &JukeboxConfig {
        &self.inner.config
    }

    pub(crate) fn emit(&self, event: JukeboxEvent) {
        self.inner.events.emit(event);
    }

    /// Create the cache directory and run the first refresh.
    /// Calling it again after a successful init does nothing.
    pub async fn init(&self) -> Result<()> {
        if self.inner.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }

        let cache_dir = &self.inner.config.cache_dir;
        tokio::fs::create_dir_all(cache_dir).await?;

        if let Err(e) = self.refresh_all().await {
            self.emit(JukeboxEvent::error(
                false,
                format!("Failed to fetch indexes: {}", e),
            ));
            return Err(e);
        }

        self.inner.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Cancel every in-flight fetch and download
    pub fn shutdown(&self) {
        if let Some(tx) = lock(&self.inner.refresh_cancel).take() {
            let _ = tx.send(true);
        }
        for (unique_id, record) in lock(&self.inner.downloads).iter() {
            log::info!("Cancelling download of {} on shutdown", unique_id);
            let _ = record.cancel_tx.send(true);
        }
    }

    /// Configured index sources
    pub fn index_sources(&self) -> Vec<IndexSource> {
        let sources = lock(&self.inner.sources).clone();
        log::info!("Indexes: {}", sources.len());
        for source in &sources {
            log::info!("Index({}): {}", source.enabled, source.url);
        }
        sources
    }

    /// Replace the source list; takes effect on the next refresh
    pub fn set_index_sources(&self, sources: Vec<IndexSource>) {
        *lock(&self.inner.sources) = sources;
    }

    /// Drop every manifest and fetch all enabled sources again.
    ///
    /// Per-source failures are reported as error events and fall back to the
    /// last cached copy of that source. A refresh started while another is
    /// running cancels the older one.
    pub async fn refresh_all(&self) -> Result<()> {
        let (tx, cancel) = CancelToken::pair();
        if let Some(previous) = lock(&self.inner.refresh_cancel).replace(tx) {
            let _ = previous.send(true);
        }

        {
            let mut state = lock(&self.inner.state);
            state.loaded.clear();
            state.remote.clear();
        }

        let sources: Vec<IndexSource> = self
            .index_sources()
            .into_iter()
            .filter(IndexSource::is_fetchable)
            .collect();

        join_all(
            sources
                .iter()
                .map(|source| self.refresh_source(source, &cancel)),
        )
        .await;

        if !cancel.is_cancelled() {
            let state = lock(&self.inner.state);
            log::info!(
                "Refresh finished: {} indexes, {} game songs with index alternatives",
                state.loaded.len(),
                state.remote.len()
            );
        }
        Ok(())
    }

    async fn refresh_source(&self, source: &IndexSource, cancel: &CancelToken) {
        let cache_path = index_cache_path(&self.inner.config.cache_dir, &source.url);

        match cancel
            .guard(fetch_index(&self.inner.client, source, &cache_path))
            .await
        {
            Ok(metadata) => self.cache_index_name(&metadata.id, &metadata.name).await,
            Err(JukeboxError::Cancelled) => {
                log::info!("Fetch of {} cancelled by a newer refresh", source.url);
                return;
            }
            Err(e) => {
                log::warn!("Failed to fetch index {}: {}", source.url, e);
                self.emit(JukeboxEvent::error(
                    false,
                    format!("Failed to fetch index {}: {}", source.url, e),
                ));
                if !tokio::fs::try_exists(&cache_path).await.unwrap_or(false) {
                    return;
                }
                log::info!("Using cached copy of {}", source.url);
            }
        }

        let index = match read_cached_index(&cache_path).await {
            Ok(index) => index,
            Err(e) => {
                self.emit(JukeboxEvent::error(
                    false,
                    format!("Failed to load index {}: {}", source.url, e),
                ));
                return;
            }
        };
        self.cache_index_name(&index.id, &index.name).await;
        self.apply_index(index, Some(cancel));
    }

    /// Load a cached manifest into the remote catalog, replacing any manifest
    /// with the same id.
    pub async fn load_from_cache(&self, path: &Path) -> Result<()> {
        let index = read_cached_index(path).await?;
        self.cache_index_name(&index.id, &index.name).await;
        self.apply_index(index, None);
        Ok(())
    }

    /// Swap a parsed manifest into the remote catalog. Skipped when the
    /// refresh that produced it has been superseded.
    fn apply_index(&self, index: IndexMetadata, cancel: Option<&CancelToken>) {
        let mut rejected = Vec::new();
        let total = {
            let mut state = lock(&self.inner.state);
            if cancel.map(CancelToken::is_cancelled).unwrap_or(false) {
                log::info!("Discarding index {} from a cancelled refresh", index.id);
                return;
            }

            for remote in state.remote.values_mut() {
                remote.remove_index(&index.id);
            }
            state.remote.retain(|_, remote| !remote.is_empty());

            for entry in &index.songs {
                for &gd_song_id in &entry.gd_song_ids {
                    let remote = state
                        .remote
                        .entry(gd_song_id)
                        .or_insert_with(|| RemoteNongs::new(gd_song_id));
                    let song = entry.song_for(gd_song_id);
                    let kind = song.nong_type();
                    if let Err(e) = remote.add(song) {
                        rejected.push(format!("Failed to add {} song from index: {}", kind, e));
                    }
                }
            }

            log::info!(
                "Index \"{}\" ({}) loaded. Total index objects: {}.",
                index.name,
                index.id,
                state.remote.len()
            );
            state.loaded.insert(index.id.clone(), index);
            state.remote.len()
        };

        for message in rejected {
            self.emit(JukeboxEvent::error(false, message));
        }
        log::debug!("{} game songs have index alternatives", total);
    }

    async fn cache_index_name(&self, index_id: &str, name: &str) {
        if let Err(e) = self.inner.names.set(index_id, name).await {
            log::warn!("Failed to cache name of index {}: {:#}", index_id, e);
        }
    }

    /// Display name of an index, falling back to the last name seen
    pub fn index_name(&self, index_id: &str) -> Option<String> {
        if let Some(index) = lock(&self.inner.state).loaded.get(index_id) {
            return Some(index.name.clone());
        }
        self.inner.names.get(index_id)
    }

    pub fn loaded_index(&self, index_id: &str) -> Option<IndexMetadata> {
        lock(&self.inner.state).loaded.get(index_id).cloned()
    }

    pub fn loaded_indexes(&self) -> Vec<IndexMetadata> {
        let mut indexes: Vec<_> = lock(&self.inner.state).loaded.values().cloned().collect();
        indexes.sort_by(|a, b| a.id.cmp(&b.id));
        indexes
    }

    /// Index alternatives currently known for a game song
    pub fn remote_nongs(&self, gd_song_id: i32) -> Option<RemoteNongs> {
        lock(&self.inner.state).remote.get(&gd_song_id).cloned()
    }

    /// Every alternative for a game song, local and remote, in display order
    pub fn list_alternatives(&self, gd_song_id: i32) -> Result<Vec<Song>> {
        let local = self.inner.registry.get_nongs(gd_song_id).ok_or_else(|| {
            JukeboxError::not_found(format!("GD song {} not initialized", gd_song_id))
        })?;
        let remote = self.remote_nongs(gd_song_id);
        Ok(merge_alternatives(&local, remote.as_ref()))
    }
}

//! Contract with the local song registry.
//!
//! The registry owns the user's own alternatives and decides which one is
//! active for each game song. The engine only reads snapshots from it and
//! hands finished downloads back.

use crate::error::{JukeboxError, Result};
use crate::nongs::{Nongs, Song};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait LocalRegistry: Send + Sync {
    /// Snapshot of the alternatives registered for a game song
    fn get_nongs(&self, gd_song_id: i32) -> Option<Nongs>;

    /// Mark an alternative as the one to play for a game song
    fn set_active_song(&self, gd_song_id: i32, unique_id: &str) -> Result<()>;

    /// Fresh path for a newly downloaded file with the given extension
    fn generate_song_file_path(&self, extension: &str) -> PathBuf;

    /// Adopt a downloaded alternative, replacing any entry with the same unique id
    fn add_song(&self, song: Song) -> Result<()>;
}

/// In-memory registry, used by tests and by embedders without persistence
pub struct MemoryRegistry {
    songs_dir: PathBuf,
    nongs: Mutex<HashMap<i32, Nongs>>,
    active: Mutex<HashMap<i32, String>>,
}

impl MemoryRegistry {
    pub fn new(songs_dir: impl Into<PathBuf>) -> Self {
        Self {
            songs_dir: songs_dir.into(),
            nongs: Mutex::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn songs_dir(&self) -> &Path {
        &self.songs_dir
    }

    pub fn insert(&self, nongs: Nongs) {
        let gd_song_id = nongs.gd_song_id();
        let default_id = nongs.default_song().metadata.unique_id.clone();
        if let Ok(mut active) = self.active.lock() {
            active.entry(gd_song_id).or_insert(default_id);
        }
        if let Ok(mut map) = self.nongs.lock() {
            map.insert(gd_song_id, nongs);
        }
    }

    pub fn active_song(&self, gd_song_id: i32) -> Option<String> {
        self.active.lock().ok()?.get(&gd_song_id).cloned()
    }
}

impl LocalRegistry for MemoryRegistry {
    fn get_nongs(&self, gd_song_id: i32) -> Option<Nongs> {
        self.nongs.lock().ok()?.get(&gd_song_id).cloned()
    }

    fn set_active_song(&self, gd_song_id: i32, unique_id: &str) -> Result<()> {
        let known = self
            .nongs
            .lock()
            .map_err(|_| JukeboxError::Validation("registry lock poisoned".into()))?
            .get(&gd_song_id)
            .map(|n| n.contains(unique_id));

        match known {
            None => Err(JukeboxError::not_found(format!(
                "Game song {} is not registered",
                gd_song_id
            ))),
            Some(false) => Err(JukeboxError::not_found(format!(
                "Song {} is not registered for game song {}",
                unique_id, gd_song_id
            ))),
            Some(true) => {
                if let Ok(mut active) = self.active.lock() {
                    active.insert(gd_song_id, unique_id.to_string());
                }
                log::debug!("Active song for {} is now {}", gd_song_id, unique_id);
                Ok(())
            }
        }
    }

    fn generate_song_file_path(&self, extension: &str) -> PathBuf {
        self.songs_dir
            .join(format!("{}.{}", uuid::Uuid::new_v4(), extension))
    }

    fn add_song(&self, song: Song) -> Result<()> {
        let mut map = self
            .nongs
            .lock()
            .map_err(|_| JukeboxError::Validation("registry lock poisoned".into()))?;
        let nongs = map.get_mut(&song.gd_song_id()).ok_or_else(|| {
            JukeboxError::not_found(format!(
                "Game song {} is not registered",
                song.gd_song_id()
            ))
        })?;
        nongs.upsert(song)
    }
}

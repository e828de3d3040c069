use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{JukeboxError, Result};

/// Length of every valid YouTube video id.
pub const YOUTUBE_ID_LEN: usize = 11;

/// Kind of alternative, ordered by how they are presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NongType {
    Local,
    Hosted,
    Youtube,
}

impl NongType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NongType::Local => "local",
            NongType::Hosted => "hosted",
            NongType::Youtube => "youtube",
        }
    }

    /// Rank used when ordering alternatives of different kinds
    pub fn sort_rank(&self) -> u8 {
        match self {
            NongType::Local => 1,
            NongType::Hosted => 2,
            NongType::Youtube => 3,
        }
    }
}

impl std::fmt::Display for NongType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity and display data shared by every alternative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongMetadata {
    /// Game song this alternative replaces
    pub gd_song_id: i32,

    /// Unique within the alternatives of one game song
    pub unique_id: String,

    pub name: String,
    pub artist: String,

    /// Where the audio lives once downloaded (hosted / YouTube only)
    #[serde(default)]
    pub local_path: Option<PathBuf>,

    #[serde(default)]
    pub start_offset_ms: i64,
}

impl SongMetadata {
    pub fn new(
        gd_song_id: i32,
        unique_id: impl Into<String>,
        name: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            gd_song_id,
            unique_id: unique_id.into(),
            name: name.into(),
            artist: artist.into(),
            local_path: None,
            start_offset_ms: 0,
        }
    }

    pub fn with_start_offset(mut self, start_offset_ms: i64) -> Self {
        self.start_offset_ms = start_offset_ms;
        self
    }

    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSong {
    pub metadata: SongMetadata,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostedSong {
    pub metadata: SongMetadata,
    pub url: String,
    /// Manifest this song was published in, `None` when added by the user
    #[serde(default)]
    pub index_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YtSong {
    pub metadata: SongMetadata,
    pub youtube_id: String,
    #[serde(default)]
    pub index_id: Option<String>,
}

impl YtSong {
    pub fn has_valid_id(&self) -> bool {
        self.youtube_id.chars().count() == YOUTUBE_ID_LEN
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.youtube_id)
    }
}

/// One alternative of a game song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Song {
    Local(LocalSong),
    Hosted(HostedSong),
    Youtube(YtSong),
}

impl Song {
    pub fn metadata(&self) -> &SongMetadata {
        match self {
            Song::Local(s) => &s.metadata,
            Song::Hosted(s) => &s.metadata,
            Song::Youtube(s) => &s.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut SongMetadata {
        match self {
            Song::Local(s) => &mut s.metadata,
            Song::Hosted(s) => &mut s.metadata,
            Song::Youtube(s) => &mut s.metadata,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.metadata().unique_id
    }

    pub fn gd_song_id(&self) -> i32 {
        self.metadata().gd_song_id
    }

    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    pub fn nong_type(&self) -> NongType {
        match self {
            Song::Local(_) => NongType::Local,
            Song::Hosted(_) => NongType::Hosted,
            Song::Youtube(_) => NongType::Youtube,
        }
    }

    pub fn index_id(&self) -> Option<&str> {
        match self {
            Song::Local(_) => None,
            Song::Hosted(s) => s.index_id.as_deref(),
            Song::Youtube(s) => s.index_id.as_deref(),
        }
    }

    /// Associate a remote alternative with the manifest it came from.
    /// Local songs never carry an index id.
    pub fn set_index_id(&mut self, index_id: Option<String>) {
        match self {
            Song::Local(_) => {}
            Song::Hosted(s) => s.index_id = index_id,
            Song::Youtube(s) => s.index_id = index_id,
        }
    }

    /// Playable file for this alternative, if it has one
    pub fn path(&self) -> Option<&Path> {
        match self {
            Song::Local(s) => Some(s.path.as_path()),
            Song::Hosted(s) => s.metadata.local_path.as_deref(),
            Song::Youtube(s) => s.metadata.local_path.as_deref(),
        }
    }

    /// Whether the playable file currently exists on disk
    pub fn is_downloaded(&self) -> bool {
        self.path().map(|p| p.exists()).unwrap_or(false)
    }
}

impl From<LocalSong> for Song {
    fn from(song: LocalSong) -> Self {
        Song::Local(song)
    }
}

impl From<HostedSong> for Song {
    fn from(song: HostedSong) -> Self {
        Song::Hosted(song)
    }
}

impl From<YtSong> for Song {
    fn from(song: YtSong) -> Self {
        Song::Youtube(song)
    }
}

/// All alternatives the local registry knows for one game song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nongs {
    gd_song_id: i32,
    default_song: LocalSong,
    #[serde(default)]
    locals: Vec<LocalSong>,
    #[serde(default)]
    youtube: Vec<YtSong>,
    #[serde(default)]
    hosted: Vec<HostedSong>,
}

impl Nongs {
    pub fn new(gd_song_id: i32, default_song: LocalSong) -> Self {
        Self {
            gd_song_id,
            default_song,
            locals: Vec::new(),
            youtube: Vec::new(),
            hosted: Vec::new(),
        }
    }

    pub fn gd_song_id(&self) -> i32 {
        self.gd_song_id
    }

    pub fn default_song(&self) -> &LocalSong {
        &self.default_song
    }

    pub fn locals(&self) -> &[LocalSong] {
        &self.locals
    }

    pub fn youtube(&self) -> &[YtSong] {
        &self.youtube
    }

    pub fn hosted(&self) -> &[HostedSong] {
        &self.hosted
    }

    pub fn contains(&self, unique_id: &str) -> bool {
        self.default_song.metadata.unique_id == unique_id
            || self.locals.iter().any(|s| s.metadata.unique_id == unique_id)
            || self.youtube.iter().any(|s| s.metadata.unique_id == unique_id)
            || self.hosted.iter().any(|s| s.metadata.unique_id == unique_id)
    }

    /// Add an alternative. Fails if the game song does not match or the
    /// unique id is already taken.
    pub fn add(&mut self, song: Song) -> Result<()> {
        if song.gd_song_id() != self.gd_song_id {
            return Err(JukeboxError::Validation(format!(
                "Song {} belongs to game song {}, not {}",
                song.unique_id(),
                song.gd_song_id(),
                self.gd_song_id
            )));
        }
        if self.contains(song.unique_id()) {
            return Err(JukeboxError::Validation(format!(
                "Song {} already exists for game song {}",
                song.unique_id(),
                self.gd_song_id
            )));
        }
        match song {
            Song::Local(s) => self.locals.push(s),
            Song::Hosted(s) => self.hosted.push(s),
            Song::Youtube(s) => self.youtube.push(s),
        }
        Ok(())
    }

    /// Replace an existing alternative with the same unique id, or add it
    pub fn upsert(&mut self, song: Song) -> Result<()> {
        self.remove(song.unique_id());
        self.add(song)
    }

    /// Remove a non-default alternative. Returns whether anything was removed.
    pub fn remove(&mut self, unique_id: &str) -> bool {
        let before = self.locals.len() + self.youtube.len() + self.hosted.len();
        self.locals.retain(|s| s.metadata.unique_id != unique_id);
        self.youtube.retain(|s| s.metadata.unique_id != unique_id);
        self.hosted.retain(|s| s.metadata.unique_id != unique_id);
        before != self.locals.len() + self.youtube.len() + self.hosted.len()
    }
}

/// Remote-only alternatives for one game song, built from loaded manifests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteNongs {
    gd_song_id: i32,
    youtube: Vec<YtSong>,
    hosted: Vec<HostedSong>,
}

impl RemoteNongs {
    pub fn new(gd_song_id: i32) -> Self {
        Self {
            gd_song_id,
            youtube: Vec::new(),
            hosted: Vec::new(),
        }
    }

    pub fn gd_song_id(&self) -> i32 {
        self.gd_song_id
    }

    pub fn youtube(&self) -> &[YtSong] {
        &self.youtube
    }

    pub fn hosted(&self) -> &[HostedSong] {
        &self.hosted
    }

    pub fn len(&self) -> usize {
        self.youtube.len() + self.hosted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, unique_id: &str) -> bool {
        self.youtube.iter().any(|s| s.metadata.unique_id == unique_id)
            || self.hosted.iter().any(|s| s.metadata.unique_id == unique_id)
    }

    pub fn add(&mut self, song: Song) -> Result<()> {
        if self.contains(song.unique_id()) {
            return Err(JukeboxError::Validation(format!(
                "Song {} already exists for game song {}",
                song.unique_id(),
                self.gd_song_id
            )));
        }
        match song {
            Song::Local(s) => {
                return Err(JukeboxError::Validation(format!(
                    "Local song {} cannot come from an index",
                    s.metadata.unique_id
                )))
            }
            Song::Hosted(s) => self.hosted.push(s),
            Song::Youtube(s) => self.youtube.push(s),
        }
        Ok(())
    }

    /// Drop every alternative contributed by the given manifest
    pub fn remove_index(&mut self, index_id: &str) {
        self.youtube
            .retain(|s| s.index_id.as_deref() != Some(index_id));
        self.hosted
            .retain(|s| s.index_id.as_deref() != Some(index_id));
    }

    pub fn songs(&self) -> impl Iterator<Item = Song> + '_ {
        self.youtube
            .iter()
            .cloned()
            .map(Song::Youtube)
            .chain(self.hosted.iter().cloned().map(Song::Hosted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_song(gd_song_id: i32) -> LocalSong {
        LocalSong {
            metadata: SongMetadata::new(gd_song_id, "default", "Original", "RobTop"),
            path: PathBuf::from("/songs/default.mp3"),
        }
    }

    fn yt(gd_song_id: i32, unique_id: &str, youtube_id: &str) -> YtSong {
        YtSong {
            metadata: SongMetadata::new(gd_song_id, unique_id, "Name", "Artist"),
            youtube_id: youtube_id.to_string(),
            index_id: Some("idx".to_string()),
        }
    }

    #[test]
    fn sort_rank_orders_local_hosted_youtube() {
        assert!(NongType::Local.sort_rank() < NongType::Hosted.sort_rank());
        assert!(NongType::Hosted.sort_rank() < NongType::Youtube.sort_rank());
    }

    #[test]
    fn youtube_id_must_be_eleven_chars() {
        assert!(yt(1, "a", "dQw4w9WgXcQ").has_valid_id());
        assert!(!yt(1, "a", "short").has_valid_id());
        assert!(!yt(1, "a", "dQw4w9WgXcQQ").has_valid_id());
    }

    #[test]
    fn nongs_rejects_duplicate_unique_ids() {
        let mut nongs = Nongs::new(42, default_song(42));
        nongs.add(yt(42, "a", "dQw4w9WgXcQ").into()).unwrap();
        assert!(nongs.add(yt(42, "a", "dQw4w9WgXcQ").into()).is_err());
        assert!(nongs.add(yt(42, "default", "dQw4w9WgXcQ").into()).is_err());
        assert_eq!(nongs.youtube().len(), 1);
    }

    #[test]
    fn nongs_rejects_songs_for_other_game_songs() {
        let mut nongs = Nongs::new(42, default_song(42));
        assert!(nongs.add(yt(7, "a", "dQw4w9WgXcQ").into()).is_err());
    }

    #[test]
    fn upsert_replaces_existing_entry() {
        let mut nongs = Nongs::new(42, default_song(42));
        nongs.add(yt(42, "a", "dQw4w9WgXcQ").into()).unwrap();
        let mut replacement = yt(42, "a", "dQw4w9WgXcQ");
        replacement.metadata.local_path = Some(PathBuf::from("/songs/a.mp3"));
        nongs.upsert(replacement.into()).unwrap();
        assert_eq!(nongs.youtube().len(), 1);
        assert!(nongs.youtube()[0].metadata.local_path.is_some());
    }

    #[test]
    fn remote_nongs_remove_index_keeps_other_sources() {
        let mut remote = RemoteNongs::new(42);
        remote.add(yt(42, "a", "dQw4w9WgXcQ").into()).unwrap();
        let mut other = yt(42, "b", "dQw4w9WgXcQ");
        other.index_id = Some("other".to_string());
        remote.add(other.into()).unwrap();

        remote.remove_index("idx");
        assert_eq!(remote.len(), 1);
        assert!(remote.contains("b"));
    }

    #[test]
    fn local_song_path_is_its_file() {
        let song: Song = default_song(1).into();
        assert_eq!(song.path(), Some(Path::new("/songs/default.mp3")));
        assert_eq!(song.index_id(), None);
        assert_eq!(song.nong_type(), NongType::Local);
    }
}

use serde::{Deserialize, Serialize};

use crate::nongs::{HostedSong, Song, SongMetadata, YtSong};

/// Minimum URL length for a source to be fetched at all
pub const MIN_SOURCE_URL_LEN: usize = 3;

/// One subscribed manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSource {
    pub url: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl IndexSource {
    pub fn new(url: impl Into<String>, enabled: bool) -> Self {
        Self {
            url: url.into(),
            enabled,
        }
    }

    /// Whether this source takes part in a fetch cycle
    pub fn is_fetchable(&self) -> bool {
        self.enabled && self.url.len() >= MIN_SOURCE_URL_LEN
    }
}

/// A loaded manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,

    /// Entries parsed from the manifest body
    #[serde(skip)]
    pub songs: Vec<IndexSongMetadata>,
}

/// Where a manifest entry's audio comes from
#[derive(Debug, Clone, PartialEq)]
pub enum IndexSongSource {
    Youtube { youtube_id: String },
    Hosted { url: String },
}

/// One entry of a manifest; may target several game songs
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSongMetadata {
    /// Key of the entry inside the manifest
    pub unique_id: String,
    /// Manifest the entry belongs to
    pub index_id: String,
    pub name: String,
    pub artist: String,
    pub start_offset_ms: i64,
    pub gd_song_ids: Vec<i32>,
    pub source: IndexSongSource,
}

impl IndexSongMetadata {
    pub fn from_youtube(unique_id: &str, index_id: &str, entry: YoutubeEntry) -> Self {
        Self {
            unique_id: unique_id.to_string(),
            index_id: index_id.to_string(),
            name: entry.name,
            artist: entry.artist,
            start_offset_ms: entry.start_offset.unwrap_or(0),
            gd_song_ids: entry.song_ids,
            source: IndexSongSource::Youtube {
                youtube_id: entry.yt_id,
            },
        }
    }

    pub fn from_hosted(unique_id: &str, index_id: &str, entry: HostedEntry) -> Self {
        Self {
            unique_id: unique_id.to_string(),
            index_id: index_id.to_string(),
            name: entry.name,
            artist: entry.artist,
            start_offset_ms: entry.start_offset.unwrap_or(0),
            gd_song_ids: entry.songs,
            source: IndexSongSource::Hosted { url: entry.url },
        }
    }

    /// Alternative for one of the targeted game songs
    pub fn song_for(&self, gd_song_id: i32) -> Song {
        let metadata = SongMetadata::new(gd_song_id, &self.unique_id, &self.name, &self.artist)
            .with_start_offset(self.start_offset_ms);
        match &self.source {
            IndexSongSource::Youtube { youtube_id } => Song::Youtube(YtSong {
                metadata,
                youtube_id: youtube_id.clone(),
                index_id: Some(self.index_id.clone()),
            }),
            IndexSongSource::Hosted { url } => Song::Hosted(HostedSong {
                metadata,
                url: url.clone(),
                index_id: Some(self.index_id.clone()),
            }),
        }
    }
}

/// Raw `nongs.youtube.<key>` entry
#[derive(Debug, Clone, Deserialize)]
pub struct YoutubeEntry {
    pub name: String,
    pub artist: String,
    #[serde(rename = "ytID")]
    pub yt_id: String,
    #[serde(rename = "songIDs")]
    pub song_ids: Vec<i32>,
    #[serde(rename = "startOffset", default)]
    pub start_offset: Option<i64>,
}

/// Raw `nongs.hosted.<key>` entry
#[derive(Debug, Clone, Deserialize)]
pub struct HostedEntry {
    pub name: String,
    pub artist: String,
    pub url: String,
    pub songs: Vec<i32>,
    #[serde(rename = "startOffset", default)]
    pub start_offset: Option<i64>,
}

//! Combined view of local and index alternatives for one game song.

use crate::nongs::{Nongs, RemoteNongs, Song};
use std::collections::HashSet;

/// Merge the registry's alternatives with those discovered in indexes.
///
/// Index entries the user already adopted locally (same unique id, carrying
/// an index id) are listed once, as the local copy.
pub fn merge_alternatives(local: &Nongs, remote: Option<&RemoteNongs>) -> Vec<Song> {
    let mut songs: Vec<Song> = Vec::with_capacity(
        1 + local.locals().len()
            + local.youtube().len()
            + local.hosted().len()
            + remote.map(|r| r.len()).unwrap_or(0),
    );

    songs.push(local.default_song().clone().into());
    songs.extend(local.locals().iter().cloned().map(Song::Local));

    let mut adopted: HashSet<String> = HashSet::new();
    for song in local
        .youtube()
        .iter()
        .cloned()
        .map(Song::Youtube)
        .chain(local.hosted().iter().cloned().map(Song::Hosted))
    {
        if song.index_id().is_some() {
            adopted.insert(song.unique_id().to_string());
        }
        songs.push(song);
    }

    if let Some(remote) = remote {
        songs.extend(
            remote
                .songs()
                .filter(|s| !adopted.contains(s.unique_id()) && !local.contains(s.unique_id())),
        );
    }

    let default_id = local.default_song().metadata.unique_id.clone();
    sort_alternatives(&mut songs, &default_id);
    songs
}

/// Sort key, compared field by field:
/// not-default, has index, file missing, type rank, has index, name.
type SortKey = (bool, bool, bool, u8, bool, String);

fn sort_key(song: &Song, default_id: &str) -> SortKey {
    let has_index = song.index_id().is_some();
    (
        song.unique_id() != default_id,
        has_index,
        !song.is_downloaded(),
        song.nong_type().sort_rank(),
        has_index,
        song.name().to_string(),
    )
}

/// Stable sort putting the default first, then user alternatives before index
/// ones, downloaded before missing, local < hosted < YouTube, then by name.
/// Each file existence check runs once per song.
pub fn sort_alternatives(songs: &mut [Song], default_id: &str) {
    songs.sort_by_cached_key(|song| sort_key(song, default_id));
}

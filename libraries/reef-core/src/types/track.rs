//! Track types

use super::ids::TrackId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A playable track
///
/// Carries the metadata the playback layer needs for display and transport.
/// Library bookkeeping (formats, fingerprints, availability) stays out of
/// this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub path: PathBuf,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    /// Duration in milliseconds, when known
    pub duration_ms: Option<u64>,
}

impl Track {
    /// Create a track with a title and path; metadata fields start empty
    pub fn new(id: TrackId, title: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
            title: title.into(),
            artist: None,
            album: None,
            album_artist: None,
            duration_ms: None,
        }
    }
}

/// In-memory track lookup by id
///
/// The playback layer resolves persisted [`TrackId`]s through this when
/// rebuilding a play queue. Tracks deleted from the library simply stop
/// resolving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackIndex {
    pub tracks: HashMap<TrackId, Track>,
}

impl TrackIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a list of tracks
    pub fn from_tracks(tracks: impl IntoIterator<Item = Track>) -> Self {
        Self {
            tracks: tracks.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    /// Insert or replace a track
    pub fn insert(&mut self, track: Track) {
        self.tracks.insert(track.id, track);
    }

    /// Look up a track by id
    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    /// Number of tracks in the index
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

//! Core types for queue coordination

use reef_core::{Track, TrackId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when the queue ends
    #[default]
    Off,

    /// Loop the entire queue
    All,

    /// Loop the current track only
    One,
}

impl RepeatMode {
    /// Next mode in the Off → All → One → Off cycle
    pub fn cycle(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }
}

/// A live entry in the play queue
///
/// `natural_index` records where the entry sits in the unshuffled order.
/// It is `None` while shuffle is off (the queue order *is* the natural
/// order) and assigned by the queue transforms whenever shuffle is on.
/// Values can become sparse after removals; only their relative order is
/// meaningful.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub track: Track,
    pub natural_index: Option<usize>,
}

impl QueueItem {
    /// Create an untagged queue item
    pub fn new(track: Track) -> Self {
        Self {
            track,
            natural_index: None,
        }
    }

    /// Create a queue item tagged with its natural-order position
    pub fn tagged(track: Track, natural_index: usize) -> Self {
        Self {
            track,
            natural_index: Some(natural_index),
        }
    }
}

/// Persistable snapshot of the play queue
///
/// The only durable artifact this crate owns. `natural_order` is present
/// exactly when `shuffle` is true; `natural_order[i]` is the position in
/// `queue` of the track logically at unshuffled slot `i`, always a dense
/// permutation of `0..queue.len()` even when live tags were sparse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    pub natural_order: Option<Vec<usize>>,
    pub queue: Vec<TrackId>,
    pub current_index: usize,
    pub position_ms: u64,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub speed: f32,
    pub pitch: f32,
}

impl Default for QueueState {
    fn default() -> Self {
        Self {
            natural_order: None,
            queue: Vec::new(),
            current_index: 0,
            position_ms: 0,
            shuffle: false,
            repeat: RepeatMode::Off,
            speed: 1.0,
            pitch: 1.0,
        }
    }
}

/// Change signal for observers, distinct from position ticking
///
/// `version` increases on every player mutation or event, so observers can
/// cheaply detect change without diffing snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerTransientState {
    pub version: u64,
    pub is_playing: bool,
}

/// Externally visible sleep timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum TimerState {
    /// No timer running
    #[default]
    Inactive,

    /// Timer armed; playback pauses once the deadline passes
    #[serde(rename_all = "camelCase")]
    Armed {
        /// Absolute deadline in monotonic milliseconds (see [`crate::now_ms`])
        deadline_ms: u64,
        /// Wait for the current track to end before pausing
        finish_current_track: bool,
    },
}

impl TimerState {
    /// Deadline and finish-current-track flag when armed
    pub fn armed(&self) -> Option<(u64, bool)> {
        match *self {
            Self::Armed {
                deadline_ms,
                finish_current_track,
            } => Some((deadline_ms, finish_current_track)),
            Self::Inactive => None,
        }
    }

    /// Whether a timer is currently armed
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }
}

/// User-facing sleep timer settings
///
/// The absolute deadline is computed from these at send time, so the value
/// can be persisted as a preference without drifting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepTimerSettings {
    pub duration: Duration,
    pub finish_current_track: bool,
}

impl Default for SleepTimerSettings {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(10 * 60),
            finish_current_track: true,
        }
    }
}

/// Configuration for the playback session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Draw a fresh shuffle permutation when playback wraps from the last
    /// track back to the first (default: false)
    pub reshuffle_on_wrap: bool,

    /// How long [`crate::PlaybackSession::connect`] waits for the session
    /// task to become ready (default: 10s)
    pub connect_timeout: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            reshuffle_on_wrap: false,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

//! Player capability
//!
//! The queue controller drives an abstract player rather than an audio
//! engine. Platform code implements [`Player`] over its native playback
//! surface; [`MemoryPlayer`] is a self-contained implementation used by the
//! test suite and by embedders that manage audio themselves.

use crate::types::{QueueItem, RepeatMode};
use rand::seq::SliceRandom;
use rand::thread_rng;

/// Default position threshold for "previous" restarting the current track
const PREVIOUS_RESTART_THRESHOLD_MS: u64 = 3_000;

/// Events reported by the player to the session
///
/// Platform integrations forward their native player callbacks as these;
/// the session refreshes published state and runs the timer's track-boundary
/// check in response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Play/pause state flipped
    PlayingChanged,

    /// A different queue entry became current
    TrackTransition {
        reason: TransitionReason,
    },

    /// The shuffle flag changed
    ShuffleChanged,

    /// Anything else worth a state refresh
    Generic,
}

/// Why the current queue entry changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    /// The previous track finished and playback advanced on its own
    Auto,

    /// An explicit seek landed on a different entry
    Seek,

    /// Repeat-one restarted the same entry
    Repeat,

    /// The queue itself was replaced
    PlaylistChanged,
}

/// Live player surface the queue controller mutates
///
/// Contract for the shuffle flag: enabling shuffle tags every item with its
/// current position (the actual order at that moment becomes the natural
/// order) and then permutes the actual order, keeping the current item
/// current. Disabling shuffle restores the actual order from the tags and
/// clears them. Loading items never re-orders them, which is why a restored
/// snapshot applies the flag before the items.
pub trait Player {
    /// Number of entries in the queue
    fn item_count(&self) -> usize;

    /// Entry at an actual-queue position
    fn item(&self, index: usize) -> Option<&QueueItem>;

    /// Replace the whole queue; the current index resets to 0
    fn set_queue(&mut self, items: Vec<QueueItem>);

    /// Insert entries at an actual-queue position
    fn insert(&mut self, index: usize, items: Vec<QueueItem>);

    /// Remove the entry at an actual-queue position
    fn remove(&mut self, index: usize);

    /// Move an entry between actual-queue positions
    fn move_item(&mut self, from: usize, to: usize);

    /// Remove all entries
    fn clear(&mut self);

    /// Update an entry's natural-order tag in place
    fn set_natural_index(&mut self, index: usize, natural_index: Option<usize>);

    /// Actual-queue position of the current entry
    fn current_index(&self) -> usize;

    /// Playback position within the current entry
    fn position_ms(&self) -> u64;

    /// Duration of the current entry, when known
    fn duration_ms(&self) -> Option<u64>;

    /// Whether the player is actively playing
    fn is_playing(&self) -> bool;

    /// Start or resume playback
    fn play(&mut self);

    /// Pause playback
    fn pause(&mut self);

    /// Jump to an entry and position
    fn seek_to(&mut self, index: usize, position_ms: u64);

    /// Whether shuffle is active
    fn shuffle(&self) -> bool;

    /// Flip the shuffle flag (see the trait-level ordering contract)
    fn set_shuffle(&mut self, shuffle: bool);

    /// Current repeat mode
    fn repeat(&self) -> RepeatMode;

    /// Set the repeat mode
    fn set_repeat(&mut self, repeat: RepeatMode);

    /// Playback speed multiplier
    fn speed(&self) -> f32;

    /// Playback pitch multiplier
    fn pitch(&self) -> f32;

    /// Set speed and pitch together
    fn set_playback_parameters(&mut self, speed: f32, pitch: f32);

    /// Position beyond which "previous" restarts the current track instead
    /// of moving back
    fn previous_restart_threshold_ms(&self) -> u64 {
        PREVIOUS_RESTART_THRESHOLD_MS
    }
}

/// In-process player
///
/// Keeps the queue, transport flags and shuffle ordering in memory. Does no
/// audio I/O; position only moves through [`MemoryPlayer::set_position`] and
/// [`MemoryPlayer::finish_track`], which embedders (and tests) call from
/// their clock source.
#[derive(Debug, Clone)]
pub struct MemoryPlayer {
    items: Vec<QueueItem>,
    current_index: usize,
    position_ms: u64,
    playing: bool,
    shuffle: bool,
    repeat: RepeatMode,
    speed: f32,
    pitch: f32,
}

impl MemoryPlayer {
    /// Create an empty player
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            current_index: 0,
            position_ms: 0,
            playing: false,
            shuffle: false,
            repeat: RepeatMode::Off,
            speed: 1.0,
            pitch: 1.0,
        }
    }

    /// All live queue entries in actual order
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    /// Advance the playback position (clock source hook)
    pub fn set_position(&mut self, position_ms: u64) {
        self.position_ms = position_ms;
    }

    /// Simulate the current track reaching its end
    ///
    /// Advances according to the repeat mode, the way a native player would:
    /// repeat-one restarts, repeat-all wraps, otherwise playback stops at
    /// the end of the queue. Returns the transition that occurred, if any,
    /// for forwarding to the session.
    pub fn finish_track(&mut self) -> Option<PlayerEvent> {
        if self.items.is_empty() {
            return None;
        }
        self.position_ms = 0;
        match self.repeat {
            RepeatMode::One => Some(PlayerEvent::TrackTransition {
                reason: TransitionReason::Repeat,
            }),
            _ if self.current_index + 1 < self.items.len() => {
                self.current_index += 1;
                Some(PlayerEvent::TrackTransition {
                    reason: TransitionReason::Auto,
                })
            }
            RepeatMode::All => {
                self.current_index = 0;
                Some(PlayerEvent::TrackTransition {
                    reason: TransitionReason::Auto,
                })
            }
            RepeatMode::Off => {
                self.playing = false;
                Some(PlayerEvent::PlayingChanged)
            }
        }
    }

    fn clamp_current_index(&mut self) {
        if self.items.is_empty() {
            self.current_index = 0;
        } else if self.current_index >= self.items.len() {
            self.current_index = self.items.len() - 1;
        }
    }

    /// Reorder `items` so that position `j` holds the entry previously at
    /// `order[j]`, keeping the current entry current.
    fn apply_order(&mut self, order: &[usize]) {
        let old_current = self.current_index;
        let mut slots: Vec<Option<QueueItem>> = self.items.drain(..).map(Some).collect();
        self.items = order.iter().filter_map(|&i| slots[i].take()).collect();
        if let Some(new_current) = order.iter().position(|&i| i == old_current) {
            self.current_index = new_current;
        } else {
            self.clamp_current_index();
        }
    }
}

impl Default for MemoryPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Player for MemoryPlayer {
    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn item(&self, index: usize) -> Option<&QueueItem> {
        self.items.get(index)
    }

    fn set_queue(&mut self, items: Vec<QueueItem>) {
        self.items = items;
        self.current_index = 0;
        self.position_ms = 0;
    }

    fn insert(&mut self, index: usize, items: Vec<QueueItem>) {
        let was_empty = self.items.is_empty();
        let added = items.len();
        let index = index.min(self.items.len());
        self.items.splice(index..index, items);
        // Inserting ahead of the current entry shifts it
        if !was_empty && index <= self.current_index {
            self.current_index += added;
        }
    }

    fn remove(&mut self, index: usize) {
        if index >= self.items.len() {
            return;
        }
        self.items.remove(index);
        if index < self.current_index {
            self.current_index -= 1;
        } else {
            self.clamp_current_index();
        }
        if self.items.is_empty() {
            self.playing = false;
            self.position_ms = 0;
        }
    }

    fn move_item(&mut self, from: usize, to: usize) {
        let len = self.items.len();
        if from >= len || to >= len || from == to {
            return;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        if from == self.current_index {
            self.current_index = to;
        } else if from < self.current_index && self.current_index <= to {
            self.current_index -= 1;
        } else if to <= self.current_index && self.current_index < from {
            self.current_index += 1;
        }
    }

    fn clear(&mut self) {
        self.items.clear();
        self.current_index = 0;
        self.position_ms = 0;
        self.playing = false;
    }

    fn set_natural_index(&mut self, index: usize, natural_index: Option<usize>) {
        if let Some(item) = self.items.get_mut(index) {
            item.natural_index = natural_index;
        }
    }

    fn current_index(&self) -> usize {
        self.current_index
    }

    fn position_ms(&self) -> u64 {
        self.position_ms
    }

    fn duration_ms(&self) -> Option<u64> {
        self.items
            .get(self.current_index)
            .and_then(|item| item.track.duration_ms)
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) {
        if !self.items.is_empty() {
            self.playing = true;
        }
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek_to(&mut self, index: usize, position_ms: u64) {
        if self.items.is_empty() {
            return;
        }
        self.current_index = index.min(self.items.len() - 1);
        self.position_ms = match self.duration_ms() {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        };
    }

    fn shuffle(&self) -> bool {
        self.shuffle
    }

    fn set_shuffle(&mut self, shuffle: bool) {
        if self.shuffle == shuffle {
            return;
        }
        self.shuffle = shuffle;
        if self.items.is_empty() {
            return;
        }

        if shuffle {
            // The actual order at this moment becomes the natural order
            for (i, item) in self.items.iter_mut().enumerate() {
                item.natural_index = Some(i);
            }
            let mut order: Vec<usize> = (0..self.items.len()).collect();
            order.shuffle(&mut thread_rng());
            self.apply_order(&order);
        } else {
            let mut order: Vec<usize> = (0..self.items.len()).collect();
            order.sort_by_key(|&i| self.items[i].natural_index.unwrap_or(usize::MAX));
            self.apply_order(&order);
            for item in &mut self.items {
                item.natural_index = None;
            }
        }
    }

    fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    fn set_repeat(&mut self, repeat: RepeatMode) {
        self.repeat = repeat;
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn pitch(&self) -> f32 {
        self.pitch
    }

    fn set_playback_parameters(&mut self, speed: f32, pitch: f32) {
        self.speed = speed;
        self.pitch = pitch;
    }
}

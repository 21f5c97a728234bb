//! Queue controller - core orchestration
//!
//! Owns the live player and translates every operation into an atomic
//! player mutation followed by a snapshot broadcast. Observers watch
//! [`QueueState`] for queue changes and [`PlayerTransientState`] for a
//! cheap monotonic change signal.

use crate::error::{PlaybackError, Result};
use crate::player::{Player, PlayerEvent, TransitionReason};
use crate::shuffle::{self, bumped_tag, insert_tags};
use crate::types::{PlaybackConfig, PlayerTransientState, QueueItem, QueueState, RepeatMode};
use rand::{thread_rng, Rng};
use reef_core::{Track, TrackResolver};
use tokio::sync::watch;
use tracing::debug;

/// Wrap or clamp a candidate queue index
///
/// With `repeat` the index wraps modulo `count`; without it, out-of-range
/// indices yield `None` so callers can fall back to the current index.
fn wrap_index(index: i64, count: usize, repeat: bool) -> Option<usize> {
    if count == 0 {
        return None;
    }
    if repeat {
        Some(index.rem_euclid(count as i64) as usize)
    } else if (0..count as i64).contains(&index) {
        Some(index as usize)
    } else {
        None
    }
}

/// Stateful wrapper around one live player
///
/// All mutations go through `&mut self`, so an owner (typically
/// [`crate::PlaybackSession`] behind a mutex) serializes access; the
/// controller itself holds no locks.
pub struct QueueController<P: Player> {
    player: P,
    config: PlaybackConfig,
    /// Queue index at the previous track transition, for wrap detection
    last_index: Option<usize>,
    version: u64,
    state_tx: watch::Sender<QueueState>,
    transient_tx: watch::Sender<PlayerTransientState>,
}

impl<P: Player> QueueController<P> {
    /// Create a controller owning `player`
    pub fn new(player: P, config: PlaybackConfig) -> Self {
        let (state_tx, _) = watch::channel(QueueState::capture(&player));
        let (transient_tx, _) = watch::channel(PlayerTransientState {
            version: 0,
            is_playing: player.is_playing(),
        });
        Self {
            player,
            config,
            last_index: None,
            version: 0,
            state_tx,
            transient_tx,
        }
    }

    /// Watch queue snapshots; a new value is published on every mutation
    pub fn subscribe_state(&self) -> watch::Receiver<QueueState> {
        self.state_tx.subscribe()
    }

    /// Watch the transient change signal
    pub fn subscribe_transient(&self) -> watch::Receiver<PlayerTransientState> {
        self.transient_tx.subscribe()
    }

    /// The owned player
    pub fn player(&self) -> &P {
        &self.player
    }

    /// Direct player access for platform glue
    ///
    /// After mutating the player externally, feed the change back through
    /// [`QueueController::handle_event`] so observers see it.
    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Current snapshot of the live queue
    pub fn queue_state(&self) -> QueueState {
        QueueState::capture(&self.player)
    }

    /// Whether the player is actively playing
    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    fn publish(&mut self) {
        self.state_tx.send_replace(QueueState::capture(&self.player));
        self.version += 1;
        self.transient_tx.send_replace(PlayerTransientState {
            version: self.version,
            is_playing: self.player.is_playing(),
        });
    }

    // ===== Transport =====

    /// Skip to the next track, wrapping when a repeat mode is active
    ///
    /// At the end of the queue with repeat off this stays on the current
    /// track (restarted from the top), not an error.
    pub fn next(&mut self) {
        let count = self.player.item_count();
        if count == 0 {
            return;
        }
        let current = self.player.current_index();
        let target = wrap_index(
            current as i64 + 1,
            count,
            self.player.repeat() != RepeatMode::Off,
        )
        .unwrap_or(current);
        self.player.seek_to(target, 0);
        self.player.play();
        if target != current {
            self.note_transition(TransitionReason::Seek);
        }
        self.publish();
    }

    /// Go to the previous track, wrapping when a repeat mode is active
    pub fn previous(&mut self) {
        let count = self.player.item_count();
        if count == 0 {
            return;
        }
        let current = self.player.current_index();
        let target = wrap_index(
            current as i64 - 1,
            count,
            self.player.repeat() != RepeatMode::Off,
        )
        .unwrap_or(current);
        self.player.seek_to(target, 0);
        self.player.play();
        if target != current {
            self.note_transition(TransitionReason::Seek);
        }
        self.publish();
    }

    /// Smart previous: restart the current track when well into it,
    /// otherwise move back
    pub fn previous_smart(&mut self) {
        if self.player.position_ms() > self.player.previous_restart_threshold_ms() {
            let current = self.player.current_index();
            self.player.seek_to(current, 0);
            self.player.play();
            self.publish();
        } else {
            self.previous();
        }
    }

    /// Start or resume playback
    pub fn play(&mut self) {
        let count = self.player.item_count();
        if count > 0 && !self.player.is_playing() {
            // Stalled at the very end of the last track: restart it instead
            // of letting the player pause again immediately
            let current = self.player.current_index();
            let has_next =
                self.player.repeat() != RepeatMode::Off || current + 1 < count;
            if !has_next {
                if let Some(duration) = self.player.duration_ms() {
                    if self.player.position_ms() + 1 >= duration {
                        self.player.seek_to(current, 0);
                    }
                }
            }
        }
        self.player.play();
        self.publish();
    }

    /// Pause playback
    pub fn pause(&mut self) {
        self.player.pause();
        self.publish();
    }

    /// Toggle between playing and paused
    pub fn toggle_play(&mut self) {
        if self.player.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jump to a queue position and play it
    pub fn seek(&mut self, index: usize) {
        if index >= self.player.item_count() {
            return;
        }
        let current = self.player.current_index();
        self.player.seek_to(index, 0);
        self.player.play();
        if index != current {
            self.note_transition(TransitionReason::Seek);
        }
        self.publish();
    }

    /// Seek within the current track by fraction of its duration
    ///
    /// No-op when the duration is unknown or zero.
    pub fn seek_fraction(&mut self, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        let Some(duration) = self.player.duration_ms() else {
            return;
        };
        if duration == 0 {
            return;
        }
        let position = ((duration as f64) * f64::from(fraction)) as u64;
        let current = self.player.current_index();
        self.player.seek_to(current, position.min(duration));
        self.publish();
    }

    // ===== Queue Management =====

    /// Replace the queue and start playing
    ///
    /// `start_index` selects the track to start with; under shuffle it is
    /// placed first and the rest of the order is drawn fresh.
    pub fn set_tracks(&mut self, tracks: Vec<Track>, start_index: Option<usize>) {
        let (items, start) = shuffle::prepare_set(self.player.shuffle(), tracks, start_index);
        self.player.set_queue(items);
        self.player.seek_to(start, 0);
        self.player.play();
        self.note_transition(TransitionReason::PlaylistChanged);
        self.publish();
    }

    /// Append tracks to the end of the queue
    pub fn add_tracks(&mut self, tracks: Vec<Track>) {
        if tracks.is_empty() {
            return;
        }
        let count = self.player.item_count();
        let items = shuffle::prepare_append(self.player.shuffle(), count, tracks);
        self.player.insert(count, items);
        self.publish();
    }

    /// Insert tracks right after the current one, in the actual order and
    /// the natural order both
    ///
    /// Under shuffle this shifts every natural-order tag behind the current
    /// track to make room, so disabling shuffle later still plays the
    /// inserted tracks after the one that was current. On an empty queue it
    /// degrades to an append.
    pub fn play_next(&mut self, tracks: Vec<Track>) {
        if tracks.is_empty() {
            return;
        }
        let count = self.player.item_count();

        if !self.player.shuffle() {
            let at = if count > 0 {
                self.player.current_index() + 1
            } else {
                0
            };
            self.player
                .insert(at, tracks.into_iter().map(QueueItem::new).collect());
        } else if count == 0 {
            let items = shuffle::prepare_append(true, 0, tracks);
            self.player.insert(0, items);
        } else {
            let current = self.player.current_index();
            let Some(current_tag) = self.player.item(current).and_then(|i| i.natural_index)
            else {
                // Tags are always assigned while shuffled; if one is somehow
                // missing, fall back to a plain append
                return self.add_tracks(tracks);
            };
            let added = tracks.len();

            for index in 0..count {
                if let Some(tag) = self.player.item(index).and_then(|i| i.natural_index) {
                    let bumped = bumped_tag(tag, current_tag, added);
                    if bumped != tag {
                        self.player.set_natural_index(index, Some(bumped));
                    }
                }
            }

            let items = insert_tags(current_tag, added)
                .zip(tracks)
                .map(|(tag, track)| QueueItem::tagged(track, tag))
                .collect();
            self.player.insert(current + 1, items);
        }
        self.publish();
    }

    /// Move a track between actual-queue positions; tags travel with it
    pub fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        let count = self.player.item_count();
        if from >= count {
            return Err(PlaybackError::IndexOutOfBounds(from));
        }
        if to >= count {
            return Err(PlaybackError::IndexOutOfBounds(to));
        }
        self.player.move_item(from, to);
        self.publish();
        Ok(())
    }

    /// Remove the track at an actual-queue position
    ///
    /// Remaining tags are not renumbered; snapshot capture tolerates the
    /// gap.
    pub fn remove_track(&mut self, index: usize) -> Result<()> {
        if index >= self.player.item_count() {
            return Err(PlaybackError::IndexOutOfBounds(index));
        }
        self.player.remove(index);
        self.publish();
        Ok(())
    }

    /// Remove all tracks
    pub fn clear(&mut self) {
        self.player.clear();
        self.publish();
    }

    // ===== Shuffle & Repeat =====

    /// Flip the shuffle flag; the player re-derives its order from tags
    pub fn toggle_shuffle(&mut self) {
        let shuffle = self.player.shuffle();
        self.player.set_shuffle(!shuffle);
        self.publish();
    }

    /// Turn shuffle on if it is not already
    pub fn enable_shuffle(&mut self) {
        if !self.player.shuffle() {
            self.player.set_shuffle(true);
        }
        self.publish();
    }

    /// Cycle the repeat mode Off → All → One → Off
    pub fn toggle_repeat(&mut self) {
        let repeat = self.player.repeat();
        self.player.set_repeat(repeat.cycle());
        self.publish();
    }

    /// Set playback speed and pitch together
    pub fn set_speed_and_pitch(&mut self, speed: f32, pitch: f32) {
        self.player.set_playback_parameters(speed, pitch);
        self.publish();
    }

    // ===== Events =====

    /// Feed a player-side event into the controller
    pub fn handle_event(&mut self, event: PlayerEvent) {
        if let PlayerEvent::TrackTransition { reason } = event {
            self.note_transition(reason);
        }
        self.publish();
    }

    /// Record a track transition and apply the wrap-around reshuffle policy
    ///
    /// When playback lands on index 0 coming from the last index (by
    /// automatic advance or a seek) while shuffled, and the preference is
    /// on, a random track is chosen and the shuffle flag is cycled to draw
    /// a fresh permutation. Queues of two or fewer tracks are left alone.
    fn note_transition(&mut self, reason: TransitionReason) {
        let count = self.player.item_count();
        let current = self.player.current_index();
        if self.config.reshuffle_on_wrap
            && count > 2
            && current == 0
            && self.last_index == Some(count - 1)
            && matches!(reason, TransitionReason::Auto | TransitionReason::Seek)
            && self.player.shuffle()
        {
            let target = thread_rng().gen_range(0..count - 1);
            self.player.seek_to(target, 0);
            self.player.set_shuffle(false);
            self.player.set_shuffle(true);
            debug!(target, "reshuffled queue after wrap-around");
        }
        self.last_index = Some(self.player.current_index());
    }

    // ===== Persistence =====

    /// Load a persisted snapshot into the player
    pub fn restore<R>(&mut self, state: &QueueState, resolver: &R)
    where
        R: TrackResolver + ?Sized,
    {
        state.restore(&mut self.player, resolver);
        self.last_index = Some(self.player.current_index());
        self.publish();
    }
}

//! Snapshot capture and restore
//!
//! [`QueueState`] is the persisted form of the live queue. Capture reads the
//! player; restore rebuilds a player from a snapshot through a track
//! resolver, dropping entries whose tracks no longer exist.

use crate::player::Player;
use crate::types::{QueueItem, QueueState};
use reef_core::TrackResolver;
use tracing::debug;

impl QueueState {
    /// Snapshot the live player
    ///
    /// Works even when live natural-order tags are discontinuous: the
    /// mapping is built by sorting tagged entries by tag, so only relative
    /// order matters and the result is always a dense permutation.
    ///
    /// Position is recorded as 0 while playing, so a restored session
    /// restarts the current track from the top; the live position is only
    /// durable when captured paused.
    pub fn capture<P: Player + ?Sized>(player: &P) -> Self {
        let count = player.item_count();
        let mut queue = Vec::with_capacity(count);
        let mut tagged: Vec<(usize, usize)> = Vec::new();
        for index in 0..count {
            if let Some(item) = player.item(index) {
                queue.push(item.track.id);
                if let Some(tag) = item.natural_index {
                    tagged.push((index, tag));
                }
            }
        }

        let natural_order = if player.shuffle() {
            tagged.sort_by_key(|&(_, tag)| tag);
            Some(tagged.into_iter().map(|(index, _)| index).collect())
        } else {
            None
        };

        Self {
            natural_order,
            queue,
            current_index: player.current_index(),
            position_ms: if player.is_playing() {
                0
            } else {
                player.position_ms()
            },
            shuffle: player.shuffle(),
            repeat: player.repeat(),
            speed: player.speed(),
            pitch: player.pitch(),
        }
    }

    /// Load this snapshot into a player
    ///
    /// Tracks that no longer resolve are skipped; a stale snapshot restores
    /// to a partial queue rather than failing. The shuffle flag is applied
    /// before the items so the player does not re-derive a new order over
    /// the restored tags.
    pub fn restore<P, R>(&self, player: &mut P, resolver: &R)
    where
        P: Player + ?Sized,
        R: TrackResolver + ?Sized,
    {
        player.set_shuffle(self.shuffle);

        let mut items = Vec::with_capacity(self.queue.len());
        for (index, id) in self.queue.iter().enumerate() {
            match resolver.resolve(*id) {
                Some(track) => {
                    // Tag positions refer to the unfiltered snapshot indices
                    let natural_index = self
                        .natural_order
                        .as_ref()
                        .and_then(|mapping| mapping.iter().position(|&actual| actual == index));
                    items.push(QueueItem {
                        track,
                        natural_index,
                    });
                }
                None => debug!(track_id = %id, "skipping unresolved track during queue restore"),
            }
        }
        player.set_queue(items);

        player.seek_to(self.current_index, self.position_ms);
        player.set_repeat(self.repeat);
        player.set_playback_parameters(self.speed, self.pitch);
    }
}

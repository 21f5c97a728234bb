//! Queue controller integration tests
//!
//! Covers shuffle round-trips, order-preserving insertion while shuffled,
//! wrap-around behaviour and snapshot round-trips through the public API.

use reef_core::{Track, TrackId, TrackIndex};
use reef_playback::{
    MemoryPlayer, PlaybackConfig, Player, QueueController, QueueState, RepeatMode, TransitionReason,
};
use reef_playback::{PlayerEvent, QueueItem};
use std::collections::HashSet;

fn track(id: i64) -> Track {
    Track::new(TrackId::new(id), format!("Track {id}"), format!("/music/{id}.flac"))
}

fn tracks(ids: &[i64]) -> Vec<Track> {
    ids.iter().map(|&id| track(id)).collect()
}

fn controller_with(ids: &[i64]) -> QueueController<MemoryPlayer> {
    let mut controller = QueueController::new(MemoryPlayer::new(), PlaybackConfig::default());
    controller.set_tracks(tracks(ids), None);
    controller
}

fn queue_ids(controller: &QueueController<MemoryPlayer>) -> Vec<i64> {
    controller
        .player()
        .items()
        .iter()
        .map(|item| item.track.id.get())
        .collect()
}

#[test]
fn shuffle_round_trip_restores_natural_order() {
    let mut controller = controller_with(&[1, 2, 3, 4, 5, 6, 7]);
    controller.toggle_shuffle();
    controller.toggle_shuffle();
    assert_eq!(queue_ids(&controller), vec![1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn set_tracks_under_shuffle_starts_with_requested_track() {
    let mut controller = controller_with(&[]);
    controller.toggle_shuffle();
    controller.set_tracks(tracks(&[1, 2, 3, 4, 5]), Some(2));

    // The requested track plays first and the start index is 0
    assert_eq!(controller.player().current_index(), 0);
    assert_eq!(controller.player().items()[0].track.id.get(), 3);

    // Turning shuffle off recovers the caller-supplied order
    controller.toggle_shuffle();
    assert_eq!(queue_ids(&controller), vec![1, 2, 3, 4, 5]);
}

#[test]
fn add_tracks_under_shuffle_land_at_natural_end() {
    let mut controller = controller_with(&[1, 2, 3]);
    controller.toggle_shuffle();
    controller.add_tracks(tracks(&[8, 9]));

    controller.toggle_shuffle();
    assert_eq!(queue_ids(&controller), vec![1, 2, 3, 8, 9]);
}

#[test]
fn play_next_tags_are_monotonic() {
    let mut controller = controller_with(&[1, 2, 3, 4, 5]);
    controller.toggle_shuffle();

    let current = controller.player().current_index();
    let current_tag = controller.player().items()[current].natural_index.unwrap();
    let before: Vec<(i64, usize)> = controller
        .player()
        .items()
        .iter()
        .map(|item| (item.track.id.get(), item.natural_index.unwrap()))
        .collect();

    controller.play_next(tracks(&[8, 9]));

    let after: std::collections::HashMap<i64, usize> = controller
        .player()
        .items()
        .iter()
        .map(|item| (item.track.id.get(), item.natural_index.unwrap()))
        .collect();

    // Existing tags above the current one moved up by exactly k
    for (id, tag) in before {
        if tag > current_tag {
            assert_eq!(after[&id], tag + 2);
        } else {
            assert_eq!(after[&id], tag);
        }
    }
    // New tracks take the next natural slots and the next actual slots
    assert_eq!(after[&8], current_tag + 1);
    assert_eq!(after[&9], current_tag + 2);
    let items = controller.player().items();
    assert_eq!(items[current + 1].track.id.get(), 8);
    assert_eq!(items[current + 2].track.id.get(), 9);
}

#[test]
fn play_next_while_shuffled_plays_next_in_both_orders() {
    let mut controller = controller_with(&[1, 2, 3, 4]);
    controller.toggle_shuffle();
    let current_id = queue_ids(&controller)[controller.player().current_index()];

    controller.play_next(tracks(&[9]));

    // Next in the actual queue
    let ids = queue_ids(&controller);
    let current = controller.player().current_index();
    assert_eq!(ids[current + 1], 9);

    // And next in the natural order once shuffle is off
    controller.toggle_shuffle();
    let ids = queue_ids(&controller);
    let pos_current = ids.iter().position(|&id| id == current_id).unwrap();
    assert_eq!(ids[pos_current + 1], 9);
}

#[test]
fn removal_leaves_sparse_tags_but_capture_is_dense() {
    let mut controller = controller_with(&[1, 2, 3, 4, 5, 6]);
    controller.toggle_shuffle();
    controller.remove_track(1).unwrap();
    controller.remove_track(3).unwrap();

    let state = controller.queue_state();
    let mapping = state.natural_order.expect("shuffled capture has a mapping");
    assert_eq!(mapping.len(), 4);

    // A dense permutation of the actual indices, gaps or not
    let mut sorted = mapping.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2, 3]);
}

#[test]
fn capture_restore_round_trip() {
    let resolver = TrackIndex::from_tracks(tracks(&[1, 2, 3, 4, 5]));
    let mut controller = controller_with(&[1, 2, 3, 4, 5]);
    controller.toggle_shuffle();
    controller.seek(3);
    controller.toggle_repeat();
    controller.set_speed_and_pitch(1.25, 1.0);

    let state = controller.queue_state();

    let mut fresh = QueueController::new(MemoryPlayer::new(), PlaybackConfig::default());
    fresh.restore(&state, &resolver);

    assert_eq!(fresh.queue_state(), state);
    assert_eq!(queue_ids(&fresh), queue_ids(&controller));
    assert_eq!(fresh.player().repeat(), RepeatMode::All);
}

#[test]
fn restore_drops_deleted_tracks() {
    let mut controller = controller_with(&[1, 2, 3]);
    let state = controller.queue_state();

    // Track 2 has been deleted from the library since the snapshot
    let resolver = TrackIndex::from_tracks(tracks(&[1, 3]));
    let mut fresh = QueueController::new(MemoryPlayer::new(), PlaybackConfig::default());
    fresh.restore(&state, &resolver);

    assert_eq!(queue_ids(&fresh), vec![1, 3]);
}

#[test]
fn next_at_boundary_without_repeat_is_noop() {
    let mut controller = controller_with(&[1, 2, 3]);
    controller.seek(2);
    controller.next();
    assert_eq!(controller.player().current_index(), 2);
}

#[test]
fn reshuffle_on_wrap_draws_a_fresh_permutation() {
    let config = PlaybackConfig {
        reshuffle_on_wrap: true,
        ..PlaybackConfig::default()
    };

    let mut changed = 0;
    for _ in 0..20 {
        let mut controller = QueueController::new(MemoryPlayer::new(), config.clone());
        controller.set_tracks(tracks(&[1, 2, 3, 4, 5]), None);
        controller.toggle_repeat(); // All
        controller.toggle_shuffle();

        let before = controller.queue_state().natural_order.unwrap();

        // Advance to the last slot, then wrap to the first. The player
        // confirms the seek through its callback, like a native player would.
        controller.seek(4);
        controller.handle_event(PlayerEvent::TrackTransition {
            reason: TransitionReason::Seek,
        });
        controller.next();

        let state = controller.queue_state();
        assert!(state.shuffle);
        let after = state.natural_order.unwrap();
        assert_eq!(after.len(), 5);

        // The natural order itself is preserved across the reshuffle
        let mut recovered = controller;
        recovered.toggle_shuffle();
        assert_eq!(queue_ids(&recovered), vec![1, 2, 3, 4, 5]);

        if after != before {
            changed += 1;
        }
    }
    // A fresh permutation differs most of the time; all-equal over 20 runs
    // would mean the reshuffle never happened
    assert!(changed > 0, "wrap-around never changed the permutation");
}

#[test]
fn reshuffle_on_wrap_needs_more_than_two_tracks() {
    let config = PlaybackConfig {
        reshuffle_on_wrap: true,
        ..PlaybackConfig::default()
    };
    let mut controller = QueueController::new(MemoryPlayer::new(), config);
    controller.set_tracks(tracks(&[1, 2]), None);
    controller.toggle_repeat();
    controller.toggle_shuffle();

    let before = controller.queue_state();
    controller.seek(1);
    controller.next();
    // Two tracks: wrap happens, reshuffle does not
    let after = controller.queue_state();
    assert_eq!(before.queue, after.queue);
    assert_eq!(controller.player().current_index(), 0);
}

#[test]
fn auto_transition_event_triggers_wrap_reshuffle() {
    let config = PlaybackConfig {
        reshuffle_on_wrap: true,
        ..PlaybackConfig::default()
    };
    let mut controller = QueueController::new(MemoryPlayer::new(), config);
    controller.set_tracks(tracks(&[1, 2, 3, 4, 5]), None);
    controller.toggle_repeat(); // All
    controller.toggle_shuffle();
    controller.seek(4);
    controller.handle_event(PlayerEvent::TrackTransition {
        reason: TransitionReason::Seek,
    });

    // The player advances on its own past the end of the queue
    let event = controller.player_mut().finish_track().unwrap();
    assert_eq!(
        event,
        PlayerEvent::TrackTransition {
            reason: TransitionReason::Auto
        }
    );
    controller.handle_event(event);

    // Reshuffling keeps the queue and the shuffle flag intact
    let state = controller.queue_state();
    assert!(state.shuffle);
    assert_eq!(state.queue.len(), 5);
    let mapping = state.natural_order.unwrap();
    let unique: HashSet<usize> = mapping.iter().copied().collect();
    assert_eq!(unique.len(), 5);

    // And the natural order is still the caller-supplied one
    controller.toggle_shuffle();
    assert_eq!(queue_ids(&controller), vec![1, 2, 3, 4, 5]);
}

#[test]
fn clear_empties_queue_and_stops() {
    let mut controller = controller_with(&[1, 2, 3]);
    controller.clear();
    assert_eq!(controller.player().item_count(), 0);
    assert!(!controller.is_playing());

    // Operations on the empty queue are no-ops, not errors
    controller.next();
    controller.previous();
    controller.seek(0);
    controller.seek_fraction(0.5);
    assert_eq!(controller.player().item_count(), 0);
}

#[test]
fn move_keeps_tags_attached_to_tracks() {
    let mut controller = controller_with(&[1, 2, 3, 4]);
    controller.toggle_shuffle();
    let tags_by_id: std::collections::HashMap<i64, usize> = controller
        .player()
        .items()
        .iter()
        .map(|item| (item.track.id.get(), item.natural_index.unwrap()))
        .collect();

    controller.move_track(0, 3).unwrap();

    for item in controller.player().items() {
        assert_eq!(item.natural_index.unwrap(), tags_by_id[&item.track.id.get()]);
    }
}

#[test]
fn tags_survive_queue_item_round_trip() {
    // Tag travels with the item through player storage
    let mut player = MemoryPlayer::new();
    player.set_queue(vec![QueueItem::tagged(track(1), 5)]);
    assert_eq!(player.items()[0].natural_index, Some(5));
}

#[test]
fn shuffled_queues_keep_the_same_track_set() {
    let mut controller = controller_with(&[1, 2, 3, 4, 5, 6, 7, 8]);
    controller.toggle_shuffle();
    let ids: HashSet<i64> = queue_ids(&controller).into_iter().collect();
    assert_eq!(ids.len(), 8);

    let state: QueueState = controller.queue_state();
    assert!(state.shuffle);
    let mapping = state.natural_order.unwrap();
    let unique: HashSet<usize> = mapping.iter().copied().collect();
    assert_eq!(unique.len(), 8);
}

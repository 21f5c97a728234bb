//! Session bridge integration tests

use reef_core::{Track, TrackId, TrackIndex};
use reef_playback::{
    MemoryPlayer, PlaybackConfig, PlaybackError, PlaybackSession, PlayerEvent, QueueState,
    SessionCommand, SessionReply, SleepTimerSettings, TimerState, SET_TIMER_COMMAND,
    TIMER_DEADLINE_KEY,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn track(id: i64) -> Track {
    Track::new(TrackId::new(id), format!("Track {id}"), format!("/music/{id}.flac"))
}

fn tracks(ids: &[i64]) -> Vec<Track> {
    ids.iter().map(|&id| track(id)).collect()
}

fn resolver(ids: &[i64]) -> Arc<TrackIndex> {
    Arc::new(TrackIndex::from_tracks(ids.iter().map(|&id| track(id))))
}

#[tokio::test]
async fn unknown_commands_are_rejected_explicitly() {
    let session = PlaybackSession::new(MemoryPlayer::new(), PlaybackConfig::default());
    let result = session.dispatch(&SessionCommand::new("openEqualizer")).await;
    match result {
        Err(PlaybackError::UnsupportedCommand(name)) => assert_eq!(name, "openEqualizer"),
        other => panic!("expected unsupported-command error, got {other:?}"),
    }
}

#[tokio::test]
async fn set_timer_command_round_trips_through_the_bridge() {
    let handle = PlaybackSession::connect(
        MemoryPlayer::new(),
        PlaybackConfig::default(),
        None,
        resolver(&[]),
    )
    .await
    .unwrap();

    let settings = SleepTimerSettings {
        duration: Duration::from_secs(60),
        finish_current_track: false,
    };
    let reply = handle.set_timer(&settings).await.unwrap();
    assert_eq!(reply, SessionReply::Ack);

    let mut rx = handle.subscribe_timer_state();
    timeout(Duration::from_secs(5), async {
        while !rx.borrow_and_update().is_armed() {
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("timer never armed");

    let (_, finish) = handle.timer_state().armed().unwrap();
    assert!(!finish);

    handle.cancel_timer().await.unwrap();
    timeout(Duration::from_secs(5), async {
        while rx.borrow_and_update().is_armed() {
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("timer never cancelled");
    assert_eq!(handle.timer_state(), TimerState::Inactive);
}

#[tokio::test]
async fn bare_set_timer_acts_as_cancel() {
    let session = PlaybackSession::new(MemoryPlayer::new(), PlaybackConfig::default());
    session.timer().arm(reef_playback::now_ms() + 60_000, true).await;

    // No payload: deadline defaults to -1
    session
        .dispatch(&SessionCommand::new(SET_TIMER_COMMAND))
        .await
        .unwrap();
    assert_eq!(session.timer().state().await, TimerState::Inactive);
}

#[tokio::test]
async fn negative_deadline_cancels() {
    let session = PlaybackSession::new(MemoryPlayer::new(), PlaybackConfig::default());
    session.timer().arm(reef_playback::now_ms() + 60_000, true).await;

    session
        .dispatch(&SessionCommand::new(SET_TIMER_COMMAND).with_arg(TIMER_DEADLINE_KEY, -1))
        .await
        .unwrap();
    assert_eq!(session.timer().state().await, TimerState::Inactive);
}

#[tokio::test]
async fn connect_restores_the_initial_snapshot() {
    let state = QueueState {
        queue: vec![TrackId::new(1), TrackId::new(2), TrackId::new(3)],
        current_index: 1,
        ..QueueState::default()
    };

    let handle = PlaybackSession::connect(
        MemoryPlayer::new(),
        PlaybackConfig::default(),
        Some(state),
        resolver(&[1, 2, 3]),
    )
    .await
    .unwrap();
    assert!(handle.is_connected());

    let restored = handle.queue_state();
    assert_eq!(
        restored.queue,
        vec![TrackId::new(1), TrackId::new(2), TrackId::new(3)]
    );
    assert_eq!(restored.current_index, 1);
}

#[tokio::test]
async fn connect_skips_snapshot_entries_that_no_longer_resolve() {
    let state = QueueState {
        queue: vec![TrackId::new(1), TrackId::new(2), TrackId::new(3)],
        ..QueueState::default()
    };

    let handle = PlaybackSession::connect(
        MemoryPlayer::new(),
        PlaybackConfig::default(),
        Some(state),
        resolver(&[2]),
    )
    .await
    .unwrap();

    assert_eq!(handle.queue_state().queue, vec![TrackId::new(2)]);
}

#[tokio::test]
async fn handle_drives_standard_operations() {
    let handle = PlaybackSession::connect(
        MemoryPlayer::new(),
        PlaybackConfig::default(),
        None,
        resolver(&[]),
    )
    .await
    .unwrap();

    handle.set_tracks(tracks(&[1, 2, 3]), None).await;
    handle.next().await;
    assert_eq!(handle.queue_state().current_index, 1);

    handle.toggle_shuffle().await;
    assert!(handle.queue_state().shuffle);
    handle.toggle_shuffle().await;

    handle.play_next(tracks(&[9])).await;
    let state = handle.queue_state();
    assert_eq!(state.queue[state.current_index + 1], TrackId::new(9));

    handle.pause().await;
    assert!(!handle.transient_state().is_playing);
}

#[tokio::test]
async fn player_events_bump_the_transient_version() {
    let handle = PlaybackSession::connect(
        MemoryPlayer::new(),
        PlaybackConfig::default(),
        None,
        resolver(&[]),
    )
    .await
    .unwrap();
    handle.set_tracks(tracks(&[1, 2]), None).await;

    let mut rx = handle.subscribe_transient_state();
    let before = rx.borrow_and_update().version;

    handle.notify_player_event(PlayerEvent::Generic).await.unwrap();
    timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("no transient update")
        .unwrap();
    assert!(rx.borrow().version > before);
}

#[tokio::test]
async fn queue_state_watch_tracks_mutations() {
    let handle = PlaybackSession::connect(
        MemoryPlayer::new(),
        PlaybackConfig::default(),
        None,
        resolver(&[]),
    )
    .await
    .unwrap();

    let mut rx = handle.subscribe_queue_state();
    assert!(rx.borrow_and_update().queue.is_empty());

    handle.set_tracks(tracks(&[5, 6]), None).await;
    timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("no queue update")
        .unwrap();
    assert_eq!(
        rx.borrow().queue,
        vec![TrackId::new(5), TrackId::new(6)]
    );
}

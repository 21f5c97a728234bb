//! Reef Player - Queue Coordination
//!
//! Platform-agnostic play-queue coordination for Reef Player.
//!
//! This crate provides:
//! - A persistable queue snapshot ([`QueueState`]) with capture/restore
//! - Reversible shuffle: the unshuffled order is always recoverable
//! - Order-preserving queue edits while shuffled ("play next" and friends)
//! - Repeat modes (Off, All, One) and wrapped navigation
//! - A sleep timer with "stop now" and "finish current track" policies
//! - A session command bridge for out-of-process controllers
//!
//! # Architecture
//!
//! The crate never touches audio. It drives an abstract [`Player`]
//! capability; platform code implements that trait over its native engine,
//! or uses [`MemoryPlayer`] and handles audio itself. State flows one way:
//! a command mutates the player, then a fresh [`QueueState`] and
//! [`PlayerTransientState`] are published to watchers.
//!
//! # Example: queue control
//!
//! ```rust
//! use reef_core::{Track, TrackId};
//! use reef_playback::{MemoryPlayer, PlaybackConfig, QueueController};
//!
//! let tracks = vec![
//!     Track::new(TrackId::new(1), "First", "/music/first.flac"),
//!     Track::new(TrackId::new(2), "Second", "/music/second.flac"),
//!     Track::new(TrackId::new(3), "Third", "/music/third.flac"),
//! ];
//!
//! let mut controller = QueueController::new(MemoryPlayer::new(), PlaybackConfig::default());
//! controller.set_tracks(tracks, Some(1));
//! controller.toggle_shuffle();
//! controller.next();
//!
//! // Disabling shuffle recovers the original order
//! controller.toggle_shuffle();
//! let state = controller.queue_state();
//! assert_eq!(state.queue.len(), 3);
//! assert!(!state.shuffle);
//! ```
//!
//! # Example: session with a sleep timer
//!
//! ```rust,no_run
//! use reef_core::TrackIndex;
//! use reef_playback::{MemoryPlayer, PlaybackConfig, PlaybackSession, SleepTimerSettings};
//! use std::sync::Arc;
//!
//! # async fn demo() -> reef_playback::Result<()> {
//! let handle = PlaybackSession::connect(
//!     MemoryPlayer::new(),
//!     PlaybackConfig::default(),
//!     None,
//!     Arc::new(TrackIndex::new()),
//! )
//! .await?;
//!
//! handle.set_timer(&SleepTimerSettings::default()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod controller;
mod error;
mod player;
mod session;
pub mod shuffle;
mod state;
mod timer;
pub mod types;

// Public exports
pub use controller::QueueController;
pub use error::{PlaybackError, Result};
pub use player::{MemoryPlayer, Player, PlayerEvent, TransitionReason};
pub use session::{
    PlaybackSession, SessionCommand, SessionHandle, SessionReply, SET_TIMER_COMMAND,
    SUPPORTED_COMMANDS, TIMER_DEADLINE_KEY, TIMER_FINISH_TRACK_KEY,
};
pub use timer::{deadline_after, now_ms, SleepTimer};
pub use types::{
    PlaybackConfig, PlayerTransientState, QueueItem, QueueState, RepeatMode, SleepTimerSettings,
    TimerState,
};

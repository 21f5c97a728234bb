//! Session command bridge
//!
//! The boundary between remote controllers (UI process, system integration,
//! external apps) and the queue controller. Remote commands arrive as a
//! name plus a flat key/value payload — the transport is a generic message
//! channel shared with unrelated protocol traffic, so no structured types
//! cross it. Unknown command names get an explicit "unsupported" error,
//! never a silent drop.

use crate::controller::QueueController;
use crate::error::{PlaybackError, Result};
use crate::player::{Player, PlayerEvent};
use crate::timer::{deadline_after, SleepTimer};
use crate::types::{PlaybackConfig, PlayerTransientState, QueueState, SleepTimerSettings, TimerState};
use reef_core::{Track, TrackResolver};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Command name for arming or cancelling the sleep timer
pub const SET_TIMER_COMMAND: &str = "setTimer";
/// Payload key: absolute deadline in monotonic milliseconds; -1 cancels
pub const TIMER_DEADLINE_KEY: &str = "deadlineMillis";
/// Payload key: wait for the current track to finish before pausing
pub const TIMER_FINISH_TRACK_KEY: &str = "finishCurrentTrack";

/// Command names this session accepts
pub const SUPPORTED_COMMANDS: &[&str] = &[SET_TIMER_COMMAND];

/// A named command with a flat key/value payload
#[derive(Debug, Clone)]
pub struct SessionCommand {
    pub name: String,
    pub args: Map<String, Value>,
}

impl SessionCommand {
    /// Create a command with an empty payload
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Map::new(),
        }
    }

    /// Attach a payload entry
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// Reply to a successfully handled command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionReply {
    /// Command handled, nothing to return
    Ack,
}

enum SessionRequest {
    Command {
        command: SessionCommand,
        reply: oneshot::Sender<Result<SessionReply>>,
    },
    PlayerEvent(PlayerEvent),
}

/// The service side of the session
///
/// Wires one queue controller and one sleep timer behind the command
/// bridge. Use it directly for in-process embedding, or through
/// [`PlaybackSession::connect`] to serve a [`SessionHandle`] over a
/// channel.
pub struct PlaybackSession<P: Player> {
    controller: Arc<Mutex<QueueController<P>>>,
    timer: SleepTimer<P>,
}

impl<P: Player + Send + 'static> PlaybackSession<P> {
    /// Create a session owning `player`
    pub fn new(player: P, config: PlaybackConfig) -> Self {
        let controller = Arc::new(Mutex::new(QueueController::new(player, config)));
        let timer = SleepTimer::new(Arc::clone(&controller));
        Self { controller, timer }
    }

    /// Shared handle to the queue controller
    ///
    /// Standard operations (transport, queue edits) go straight to the
    /// controller; only session-protocol commands travel through
    /// [`PlaybackSession::dispatch`].
    pub fn controller(&self) -> Arc<Mutex<QueueController<P>>> {
        Arc::clone(&self.controller)
    }

    /// The sleep timer
    pub fn timer(&self) -> &SleepTimer<P> {
        &self.timer
    }

    /// Handle a named session command
    pub async fn dispatch(&self, command: &SessionCommand) -> Result<SessionReply> {
        match command.name.as_str() {
            SET_TIMER_COMMAND => {
                self.on_set_timer(&command.args).await;
                Ok(SessionReply::Ack)
            }
            other => {
                warn!(command = other, "unsupported session command");
                Err(PlaybackError::UnsupportedCommand(other.to_string()))
            }
        }
    }

    /// Absent or malformed payload entries fall back to defaults, so a bare
    /// `setTimer` is a cancel.
    async fn on_set_timer(&self, args: &Map<String, Value>) {
        let deadline = args
            .get(TIMER_DEADLINE_KEY)
            .and_then(Value::as_i64)
            .unwrap_or(-1);
        let finish_current_track = args
            .get(TIMER_FINISH_TRACK_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(true);
        if deadline < 0 {
            self.timer.cancel().await;
        } else {
            self.timer.arm(deadline as u64, finish_current_track).await;
        }
    }

    /// Feed a player event into the session
    ///
    /// Refreshes the published snapshots and runs the timer's
    /// track-boundary check for play/pause flips and track transitions.
    /// The controller lock is released before the timer lock is taken.
    pub async fn on_player_event(&self, event: PlayerEvent) {
        {
            let mut controller = self.controller.lock().await;
            controller.handle_event(event);
        }
        if matches!(
            event,
            PlayerEvent::PlayingChanged | PlayerEvent::TrackTransition { .. }
        ) {
            self.timer.check_track_boundary().await;
        }
    }

    /// Spawn the session task and hand out a connected [`SessionHandle`]
    ///
    /// The task restores `initial` (when given) through `resolver` before
    /// signalling readiness; `connect` waits for that signal up to
    /// `config.connect_timeout` and fails with
    /// [`PlaybackError::ConnectTimeout`] instead of polling forever.
    pub async fn connect(
        player: P,
        config: PlaybackConfig,
        initial: Option<QueueState>,
        resolver: Arc<dyn TrackResolver + Send + Sync>,
    ) -> Result<SessionHandle<P>> {
        let connect_timeout = config.connect_timeout;
        let session = PlaybackSession::new(player, config);

        let controller = session.controller();
        let (queue_state, transient_state) = {
            let controller = session.controller.lock().await;
            (controller.subscribe_state(), controller.subscribe_transient())
        };
        let timer_state = session.timer.subscribe();

        let (request_tx, request_rx) = mpsc::channel(32);
        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(session.serve(request_rx, ready_tx, initial, resolver));

        match timeout(connect_timeout, ready_rx).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(PlaybackError::ChannelClosed),
            Err(_) => {
                task.abort();
                return Err(PlaybackError::ConnectTimeout);
            }
        }

        Ok(SessionHandle {
            controller,
            requests: request_tx,
            task: Arc::new(task),
            queue_state,
            transient_state,
            timer_state,
        })
    }

    async fn serve(
        self,
        mut requests: mpsc::Receiver<SessionRequest>,
        ready: oneshot::Sender<()>,
        initial: Option<QueueState>,
        resolver: Arc<dyn TrackResolver + Send + Sync>,
    ) {
        if let Some(state) = initial {
            let mut controller = self.controller.lock().await;
            controller.restore(&state, resolver.as_ref());
            debug!(tracks = state.queue.len(), "restored queue snapshot");
        }
        let _ = ready.send(());

        while let Some(request) = requests.recv().await {
            match request {
                SessionRequest::Command { command, reply } => {
                    let _ = reply.send(self.dispatch(&command).await);
                }
                SessionRequest::PlayerEvent(event) => self.on_player_event(event).await,
            }
        }
    }
}

/// Remote-controller side of the session
///
/// Standard operations lock the shared controller directly (and are
/// serialized by it); session-protocol commands travel over the message
/// channel. Cheap to clone; all clones talk to the same session.
pub struct SessionHandle<P: Player> {
    controller: Arc<Mutex<QueueController<P>>>,
    requests: mpsc::Sender<SessionRequest>,
    task: Arc<JoinHandle<()>>,
    queue_state: watch::Receiver<QueueState>,
    transient_state: watch::Receiver<PlayerTransientState>,
    timer_state: watch::Receiver<TimerState>,
}

impl<P: Player> Clone for SessionHandle<P> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            requests: self.requests.clone(),
            task: Arc::clone(&self.task),
            queue_state: self.queue_state.clone(),
            transient_state: self.transient_state.clone(),
            timer_state: self.timer_state.clone(),
        }
    }
}

impl<P: Player + Send + 'static> SessionHandle<P> {
    // ===== Transport =====

    /// Skip to the next track
    pub async fn next(&self) {
        self.controller.lock().await.next();
    }

    /// Go to the previous track
    pub async fn previous(&self) {
        self.controller.lock().await.previous();
    }

    /// Smart previous: restart when well into the current track
    pub async fn previous_smart(&self) {
        self.controller.lock().await.previous_smart();
    }

    /// Start or resume playback
    pub async fn play(&self) {
        self.controller.lock().await.play();
    }

    /// Pause playback
    pub async fn pause(&self) {
        self.controller.lock().await.pause();
    }

    /// Toggle between playing and paused
    pub async fn toggle_play(&self) {
        self.controller.lock().await.toggle_play();
    }

    /// Jump to a queue position and play it
    pub async fn seek(&self, index: usize) {
        self.controller.lock().await.seek(index);
    }

    /// Seek within the current track by fraction of its duration
    pub async fn seek_fraction(&self, fraction: f32) {
        self.controller.lock().await.seek_fraction(fraction);
    }

    // ===== Queue =====

    /// Replace the queue and start playing
    pub async fn set_tracks(&self, tracks: Vec<Track>, start_index: Option<usize>) {
        self.controller.lock().await.set_tracks(tracks, start_index);
    }

    /// Append tracks to the end of the queue
    pub async fn add_tracks(&self, tracks: Vec<Track>) {
        self.controller.lock().await.add_tracks(tracks);
    }

    /// Insert tracks right after the current one
    pub async fn play_next(&self, tracks: Vec<Track>) {
        self.controller.lock().await.play_next(tracks);
    }

    /// Move a track between queue positions
    pub async fn move_track(&self, from: usize, to: usize) -> Result<()> {
        self.controller.lock().await.move_track(from, to)
    }

    /// Remove the track at a queue position
    pub async fn remove_track(&self, index: usize) -> Result<()> {
        self.controller.lock().await.remove_track(index)
    }

    /// Remove all tracks
    pub async fn clear(&self) {
        self.controller.lock().await.clear();
    }

    // ===== Modes =====

    /// Flip the shuffle flag
    pub async fn toggle_shuffle(&self) {
        self.controller.lock().await.toggle_shuffle();
    }

    /// Turn shuffle on if it is not already
    pub async fn enable_shuffle(&self) {
        self.controller.lock().await.enable_shuffle();
    }

    /// Cycle the repeat mode
    pub async fn toggle_repeat(&self) {
        self.controller.lock().await.toggle_repeat();
    }

    /// Set playback speed and pitch together
    pub async fn set_speed_and_pitch(&self, speed: f32, pitch: f32) {
        self.controller.lock().await.set_speed_and_pitch(speed, pitch);
    }
}

impl<P: Player> SessionHandle<P> {
    /// Send a named command and wait for its reply
    pub async fn send(&self, command: SessionCommand) -> Result<SessionReply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(SessionRequest::Command {
                command,
                reply: reply_tx,
            })
            .await
            .map_err(|_| PlaybackError::ChannelClosed)?;
        reply_rx.await.map_err(|_| PlaybackError::ChannelClosed)?
    }

    /// Forward a player event to the session
    pub async fn notify_player_event(&self, event: PlayerEvent) -> Result<()> {
        self.requests
            .send(SessionRequest::PlayerEvent(event))
            .await
            .map_err(|_| PlaybackError::ChannelClosed)
    }

    /// Arm the sleep timer; the absolute deadline is computed here, at send
    /// time
    pub async fn set_timer(&self, settings: &SleepTimerSettings) -> Result<SessionReply> {
        let deadline = deadline_after(settings.duration);
        self.send(
            SessionCommand::new(SET_TIMER_COMMAND)
                .with_arg(TIMER_DEADLINE_KEY, deadline as i64)
                .with_arg(TIMER_FINISH_TRACK_KEY, settings.finish_current_track),
        )
        .await
    }

    /// Cancel the sleep timer
    pub async fn cancel_timer(&self) -> Result<SessionReply> {
        self.send(SessionCommand::new(SET_TIMER_COMMAND).with_arg(TIMER_DEADLINE_KEY, -1))
            .await
    }

    /// Latest queue snapshot
    pub fn queue_state(&self) -> QueueState {
        self.queue_state.borrow().clone()
    }

    /// Latest transient state
    pub fn transient_state(&self) -> PlayerTransientState {
        *self.transient_state.borrow()
    }

    /// Latest timer state
    pub fn timer_state(&self) -> TimerState {
        *self.timer_state.borrow()
    }

    /// Watch queue snapshots
    pub fn subscribe_queue_state(&self) -> watch::Receiver<QueueState> {
        self.queue_state.clone()
    }

    /// Watch the transient change signal
    pub fn subscribe_transient_state(&self) -> watch::Receiver<PlayerTransientState> {
        self.transient_state.clone()
    }

    /// Watch the timer state
    pub fn subscribe_timer_state(&self) -> watch::Receiver<TimerState> {
        self.timer_state.clone()
    }

    /// Whether the session task is still running
    pub fn is_connected(&self) -> bool {
        !self.task.is_finished()
    }
}

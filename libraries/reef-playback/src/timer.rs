//! Sleep timer state machine
//!
//! A mutex-guarded `Inactive | Armed` state with two independent triggers:
//! a 1-second watchdog task and an event-driven check at track boundaries.
//! Both serialize through the same mutex, so the externally published state
//! can never claim an armed deadline after the pause already happened, and
//! the pause fires exactly once however the two triggers race.
//!
//! Lock order is always timer mutex first, controller mutex second.

use crate::controller::QueueController;
use crate::player::Player;
use crate::types::TimerState;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tracing::debug;

/// Watchdog tick period
const WATCHDOG_PERIOD: Duration = Duration::from_secs(1);

/// Milliseconds on the process-wide monotonic clock
///
/// Timer deadlines are absolute values of this clock, so they survive being
/// handed across the session boundary and compare consistently between the
/// sender and the watchdog. Uses tokio's instant type, which follows the
/// test-controlled clock under `start_paused`.
pub fn now_ms() -> u64 {
    static ANCHOR: Lazy<Instant> = Lazy::new(Instant::now);
    Instant::now().duration_since(*ANCHOR).as_millis() as u64
}

/// Absolute deadline for a timer running `duration` from now
pub fn deadline_after(duration: Duration) -> u64 {
    now_ms() + duration.as_millis() as u64
}

struct TimerInner {
    state: TimerState,
    watchdog: Option<JoinHandle<()>>,
    state_tx: watch::Sender<TimerState>,
}

impl TimerInner {
    fn publish(&self) {
        self.state_tx.send_replace(self.state);
    }

    /// Drop to `Inactive`, publish, and retire the watchdog
    fn disarm(&mut self) {
        self.state = TimerState::Inactive;
        self.publish();
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
    }
}

/// Best-effort sleep timer over a shared queue controller
///
/// Cloning yields another handle to the same timer.
pub struct SleepTimer<P: Player> {
    controller: Arc<Mutex<QueueController<P>>>,
    inner: Arc<Mutex<TimerInner>>,
    state_rx: watch::Receiver<TimerState>,
}

impl<P: Player> Clone for SleepTimer<P> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            inner: Arc::clone(&self.inner),
            state_rx: self.state_rx.clone(),
        }
    }
}

impl<P: Player + Send + 'static> SleepTimer<P> {
    /// Create an inactive timer controlling playback through `controller`
    pub fn new(controller: Arc<Mutex<QueueController<P>>>) -> Self {
        let (state_tx, state_rx) = watch::channel(TimerState::Inactive);
        Self {
            controller,
            inner: Arc::new(Mutex::new(TimerInner {
                state: TimerState::Inactive,
                watchdog: None,
                state_tx,
            })),
            state_rx,
        }
    }

    /// Watch the externally visible timer state
    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.state_rx.clone()
    }

    /// Current timer state
    pub async fn state(&self) -> TimerState {
        self.inner.lock().await.state
    }

    /// Arm the timer for an absolute deadline
    ///
    /// Replaces any running watchdog; overlapping arms resolve
    /// last-writer-wins under the mutex.
    pub async fn arm(&self, deadline_ms: u64, finish_current_track: bool) {
        let mut inner = self.inner.lock().await;
        inner.state = TimerState::Armed {
            deadline_ms,
            finish_current_track,
        };
        inner.publish();
        if let Some(watchdog) = inner.watchdog.take() {
            watchdog.abort();
        }
        let timer = self.clone();
        inner.watchdog = Some(tokio::spawn(async move {
            timer.watchdog_loop().await;
        }));
        debug!(deadline_ms, finish_current_track, "sleep timer armed");
    }

    /// Cancel the timer and stop the watchdog
    pub async fn cancel(&self) {
        let mut inner = self.inner.lock().await;
        inner.disarm();
        debug!("sleep timer cancelled");
    }

    /// Event-driven early check, run at play/pause flips and track
    /// transitions
    ///
    /// Lets a finish-current-track timer fire exactly at the track boundary
    /// instead of up to a tick later.
    pub async fn check_track_boundary(&self) {
        let mut inner = self.inner.lock().await;
        if let TimerState::Armed {
            deadline_ms,
            finish_current_track,
        } = inner.state
        {
            if finish_current_track && now_ms() >= deadline_ms {
                self.controller.lock().await.pause();
                inner.disarm();
                debug!("sleep timer fired at track boundary");
            }
        }
    }

    async fn watchdog_loop(&self) {
        let mut tick = interval(WATCHDOG_PERIOD);
        loop {
            tick.tick().await;
            let mut inner = self.inner.lock().await;
            match inner.state {
                TimerState::Armed {
                    deadline_ms,
                    finish_current_track,
                } => {
                    if now_ms() >= deadline_ms {
                        let mut controller = self.controller.lock().await;
                        if !finish_current_track || !controller.is_playing() {
                            controller.pause();
                            drop(controller);
                            inner.disarm();
                            debug!("sleep timer fired");
                            return;
                        }
                    }
                }
                // Another path already disarmed; nothing left to watch
                TimerState::Inactive => return,
            }
        }
    }
}

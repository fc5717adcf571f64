//! Debounce coordinator
//!
//! Collapses a burst of change events into one deferred sync action:
//!
//! ```text
//! Idle       + change   -> Pending     (arm timer)
//! Pending    + change   -> Pending     (cancel timer, arm a fresh one)
//! Pending    + deadline -> Processing  (dispatch exactly once)
//! Processing + change   -> Processing  (reported and dropped)
//! Processing + done     -> Idle
//! ```
//!
//! The coordinator never reads the clock itself; callers pass `now`, which
//! keeps every transition deterministic under test.

use chrono::Local;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::batch::ChangeBatch;
use crate::ChangeEvent;

/// Default quiet window before a burst is pushed
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_secs(15);

/// Default subject prefix for generated commit messages
pub const DEFAULT_MESSAGE_PREFIX: &str = "Auto-commit";

/// Observable coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Pending,
    Processing,
}

/// Opaque identity of one armed countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy)]
struct DebounceTimer {
    handle: TimerHandle,
    deadline: Instant,
}

/// What happened to a change event handed to [`Coordinator::record`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// First change of a burst: a countdown was started
    Armed { handle: TimerHandle, deadline: Instant },
    /// The pending countdown was cancelled and replaced
    Rearmed {
        cancelled: TimerHandle,
        handle: TimerHandle,
        deadline: Instant,
    },
    /// An action is in flight; the change was counted and dropped
    Dropped,
}

/// A sync action the caller must now run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Generated commit message
    pub message: String,
    /// Changes recorded during the burst
    pub changes: Vec<ChangeEvent>,
}

/// Counters kept for the lifetime of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub events_recorded: u64,
    pub events_dropped: u64,
    pub timer_resets: u64,
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// The debounce state machine
///
/// Owns the only timer and the processing flag; nothing else mutates them.
#[derive(Debug)]
pub struct Coordinator {
    quiet_window: Duration,
    message_prefix: String,
    timer: Option<DebounceTimer>,
    processing: bool,
    next_handle: u64,
    batch: ChangeBatch,
    stats: CoordinatorStats,
}

impl Coordinator {
    pub fn new(quiet_window: Duration) -> Self {
        Self {
            quiet_window,
            message_prefix: DEFAULT_MESSAGE_PREFIX.to_string(),
            timer: None,
            processing: false,
            next_handle: 0,
            batch: ChangeBatch::new(),
            stats: CoordinatorStats::default(),
        }
    }

    /// Override the commit message subject prefix
    pub fn with_message_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.message_prefix = prefix.into();
        self
    }

    pub fn quiet_window(&self) -> Duration {
        self.quiet_window
    }

    pub fn state(&self) -> CoordinatorState {
        if self.processing {
            CoordinatorState::Processing
        } else if self.timer.is_some() {
            CoordinatorState::Pending
        } else {
            CoordinatorState::Idle
        }
    }

    /// The processing flag: true exactly while a dispatched action runs
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Handle and deadline of the armed countdown, if any
    pub fn pending_timer(&self) -> Option<(TimerHandle, Instant)> {
        self.timer.map(|t| (t.handle, t.deadline))
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    /// Feed one change event into the state machine
    pub fn record(&mut self, event: &ChangeEvent, now: Instant) -> ChangeOutcome {
        if self.processing {
            self.stats.events_dropped += 1;
            debug!(path = %event.path.display(), kind = %event.kind, "change dropped while processing");
            return ChangeOutcome::Dropped;
        }

        self.stats.events_recorded += 1;
        self.batch.record(event);

        let next = self.arm(now);
        match self.timer.replace(next) {
            Some(previous) => {
                self.stats.timer_resets += 1;
                debug!(path = %event.path.display(), "debounce timer reset");
                ChangeOutcome::Rearmed {
                    cancelled: previous.handle,
                    handle: next.handle,
                    deadline: next.deadline,
                }
            }
            None => {
                debug!(path = %event.path.display(), "debounce timer armed");
                ChangeOutcome::Armed {
                    handle: next.handle,
                    deadline: next.deadline,
                }
            }
        }
    }

    fn arm(&mut self, now: Instant) -> DebounceTimer {
        self.next_handle += 1;
        DebounceTimer {
            handle: TimerHandle(self.next_handle),
            deadline: now + self.quiet_window,
        }
    }

    /// The countdown identified by `handle` elapsed
    ///
    /// Returns the dispatch to run, or `None` when the handle was cancelled
    /// or an action is already in flight.
    pub fn fire(&mut self, handle: TimerHandle) -> Option<Dispatch> {
        match self.timer {
            Some(timer) if timer.handle == handle && !self.processing => {}
            _ => {
                debug!(?handle, "stale debounce timer ignored");
                return None;
            }
        }

        self.timer = None;
        self.processing = true;
        self.stats.dispatched += 1;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let message = self.batch.commit_message(&self.message_prefix, &timestamp);
        let changes = self.batch.take();

        info!(changes = changes.len(), "dispatching sync action");
        Some(Dispatch { message, changes })
    }

    /// The dispatched action finished; always returns to `Idle`
    pub fn complete<E: std::fmt::Display>(&mut self, outcome: &Result<(), E>) {
        if !self.processing {
            warn!("completion reported with no action in flight");
        }

        self.processing = false;
        match outcome {
            Ok(()) => {
                self.stats.succeeded += 1;
                info!("sync action succeeded");
            }
            Err(e) => {
                self.stats.failed += 1;
                warn!(error = %e, "sync action failed");
            }
        }
    }

    /// Cancel the pending countdown (session shutdown)
    pub fn cancel(&mut self) -> Option<TimerHandle> {
        let cancelled = self.timer.take().map(|t| t.handle);
        if cancelled.is_some() {
            // Changes of a cancelled burst are never pushed
            self.batch.take();
            debug!("pending debounce timer cancelled");
        }
        cancelled
    }
}

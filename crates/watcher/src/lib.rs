//! File system watching and push coalescing for Autopilot
//!
//! This crate provides:
//! - Ignore rules (built-in, .gitignore, .autopilotignore, config patterns)
//! - A notify-backed observer with write stabilisation
//! - The debounce coordinator (Idle / Pending / Processing)
//! - The single-threaded session loop that drives a [`SyncAction`]

pub mod batch;
pub mod debounce;
pub mod error;
pub mod ignore;
pub mod observer;
pub mod session;
mod settle;

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

// Re-exports
pub use batch::ChangeBatch;
pub use debounce::{ChangeOutcome, Coordinator, CoordinatorState, CoordinatorStats, Dispatch, TimerHandle};
pub use error::WatchError;
pub use crate::ignore::{IgnoreConfig, IgnoreRules};
pub use observer::{ObserverConfig, Subscription};
pub use session::{run_session, EventSource, Notice, SessionSummary};

/// File system change reported by the observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Path that changed, relative to the watched root
    pub path: PathBuf,
    /// Type of change
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Type of file system change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// File created
    Added,
    /// File contents changed
    Modified,
    /// File removed
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        };
        f.write_str(label)
    }
}

/// Item produced by an observer subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    /// A settled file change
    Change(ChangeEvent),
    /// Non-fatal watcher failure (unreadable subtree, queue overflow, ...)
    Error(String),
}

/// Unit of work dispatched once a burst of changes has gone quiet
///
/// The session never runs two actions at once and never retries a failed
/// one; the next burst simply dispatches again.
#[async_trait]
pub trait SyncAction: Send + Sync {
    /// Failure type, reported through [`Notice::Failed`]
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run the action with the generated commit message
    async fn run(&self, message: String) -> Result<(), Self::Error>;
}

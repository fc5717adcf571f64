//! Git plumbing for Autopilot
//!
//! This crate provides:
//! - An async runner around the `git` executable
//! - `git status --porcelain` parsing
//! - The stage → commit → push flow with classified failures

pub mod command;
pub mod error;
pub mod status;
pub mod sync;

// Re-exports
pub use command::Git;
pub use error::{GitError, PushTarget, SyncError};
pub use status::StatusEntry;
pub use sync::{stage_commit_push, SyncProgress, SyncReport, SyncStep};

/// Remote used when none is configured
pub const DEFAULT_REMOTE: &str = "origin";

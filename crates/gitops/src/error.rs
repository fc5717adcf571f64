//! Error types for git operations

use std::io;
use thiserror::Error;

use crate::sync::SyncStep;

/// Failure to run a single git invocation
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[source] io::Error),

    /// git exited non-zero; `output` holds its stderr (or stdout when stderr was empty)
    #[error("git {command} failed: {output}")]
    Command { command: String, output: String },
}

impl GitError {
    /// Captured git output, if git ran at all
    pub fn output(&self) -> Option<&str> {
        match self {
            GitError::Spawn(_) => None,
            GitError::Command { output, .. } => Some(output),
        }
    }
}

/// Classified failure of a stage → commit → push run
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("nothing to commit")]
    NoChanges,

    #[error("branch '{branch}' has no upstream branch")]
    NoUpstream { remote: String, branch: String },

    #[error("push rejected by remote")]
    Rejected,

    #[error("authentication failed")]
    Authentication,

    #[error("remote repository not found")]
    RemoteNotFound,

    #[error("network error")]
    Network,

    #[error("{step} failed: {detail}")]
    Failed { step: SyncStep, detail: String },
}

/// Remote and branch a push was aimed at, as named in hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushTarget<'a> {
    pub remote: &'a str,
    pub branch: &'a str,
}

impl SyncError {
    /// Map git's output for a failed step onto a known failure
    pub fn classify(step: SyncStep, output: &str, target: PushTarget<'_>) -> Self {
        let lower = output.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["nothing to commit", "no changes added to commit"]) {
            SyncError::NoChanges
        } else if has(&["no upstream branch", "has no upstream"]) {
            SyncError::NoUpstream {
                remote: target.remote.to_string(),
                branch: target.branch.to_string(),
            }
        } else if has(&[
            "authentication failed",
            "permission denied (publickey",
            "remote: permission to",
            "could not read username",
            "invalid username or password",
            "returned error: 403",
        ]) {
            SyncError::Authentication
        } else if has(&[
            "repository not found",
            "does not appear to be a git repository",
            "no such remote",
        ]) {
            SyncError::RemoteNotFound
        } else if has(&["[rejected]", "rejected", "non-fast-forward", "fetch first"]) {
            SyncError::Rejected
        } else if has(&[
            "could not resolve host",
            "unable to access",
            "connection refused",
            "connection timed out",
            "operation timed out",
            "network is unreachable",
        ]) {
            SyncError::Network
        } else {
            SyncError::Failed {
                step,
                detail: output.trim().to_string(),
            }
        }
    }

    /// Classify a [`GitError`] raised while running `step`
    pub fn from_git(step: SyncStep, error: GitError, target: PushTarget<'_>) -> Self {
        match error {
            GitError::Spawn(e) => SyncError::Failed {
                step,
                detail: e.to_string(),
            },
            GitError::Command { output, .. } => SyncError::classify(step, &output, target),
        }
    }

    /// Corrective action shown to the user
    pub fn hint(&self) -> String {
        match self {
            SyncError::NoChanges => "Working directory is clean.".to_string(),
            SyncError::NoUpstream { remote, branch } => format!("Run: git push -u {} {}", remote, branch),
            SyncError::Rejected => {
                "Your local branch is behind the remote. Try: git pull --rebase".to_string()
            }
            SyncError::Authentication => {
                "Check the credentials git uses for this remote (SSH key or credential helper).".to_string()
            }
            SyncError::RemoteNotFound => "Verify the remote URL is correct: git remote -v".to_string(),
            SyncError::Network => "Check your internet connection and try again.".to_string(),
            SyncError::Failed { .. } => "Check your internet connection and repository access.".to_string(),
        }
    }
}

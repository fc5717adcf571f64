//! Stage → commit → push

use std::fmt;
use tracing::{debug, info};

use crate::command::Git;
use crate::error::{PushTarget, SyncError};

/// Branch name used in hints when HEAD is detached
const DETACHED: &str = "HEAD";

/// Steps of one sync run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    Status,
    Stage,
    Commit,
    Push,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncStep::Status => "status",
            SyncStep::Stage => "stage",
            SyncStep::Commit => "commit",
            SyncStep::Push => "push",
        };
        f.write_str(label)
    }
}

/// Progress callback payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncProgress {
    Started(SyncStep),
    Finished(SyncStep),
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub files_changed: usize,
    pub branch: Option<String>,
    /// Short hash of the new commit
    pub commit: String,
}

/// Detect changes, stage everything, commit with `message` and push
///
/// Any failing step aborts the run; git output is classified into a
/// [`SyncError`]. A clean work tree yields [`SyncError::NoChanges`] without
/// creating a commit. `remote` is the remote named in hints; the push
/// itself follows the branch's upstream.
pub async fn stage_commit_push<F>(
    git: &Git,
    remote: &str,
    message: &str,
    mut on_progress: F,
) -> Result<SyncReport, SyncError>
where
    F: FnMut(SyncProgress),
{
    let local = PushTarget {
        remote,
        branch: DETACHED,
    };

    on_progress(SyncProgress::Started(SyncStep::Status));
    let changes = git
        .status()
        .await
        .map_err(|e| SyncError::from_git(SyncStep::Status, e, local))?;
    if changes.is_empty() {
        debug!("work tree clean");
        return Err(SyncError::NoChanges);
    }
    on_progress(SyncProgress::Finished(SyncStep::Status));

    on_progress(SyncProgress::Started(SyncStep::Stage));
    git.stage_all()
        .await
        .map_err(|e| SyncError::from_git(SyncStep::Stage, e, local))?;
    on_progress(SyncProgress::Finished(SyncStep::Stage));

    on_progress(SyncProgress::Started(SyncStep::Commit));
    git.commit(message)
        .await
        .map_err(|e| SyncError::from_git(SyncStep::Commit, e, local))?;
    let commit = git
        .head_short()
        .await
        .map_err(|e| SyncError::from_git(SyncStep::Commit, e, local))?;
    on_progress(SyncProgress::Finished(SyncStep::Commit));

    let branch = git.current_branch().await.ok().flatten();
    let branch_label = branch.as_deref().unwrap_or(DETACHED);
    let target = PushTarget {
        remote,
        branch: branch_label,
    };

    on_progress(SyncProgress::Started(SyncStep::Push));
    git.push()
        .await
        .map_err(|e| SyncError::from_git(SyncStep::Push, e, target))?;
    on_progress(SyncProgress::Finished(SyncStep::Push));

    info!(files = changes.len(), branch = branch_label, %commit, "changes pushed");

    Ok(SyncReport {
        files_changed: changes.len(),
        branch,
        commit,
    })
}

//! Precondition checks run before `push` and `watch`
//!
//! Checked in order: credential, git installed, inside a repository, remote
//! configured. The first failure stops the run.

use gitops::Git;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreflightError {
    #[error("You are not connected to GitHub")]
    NotConnected,

    #[error("Git is not installed")]
    GitMissing,

    #[error("Not a git repository")]
    NotARepository,

    #[error("No remote repository configured (expected remote '{0}')")]
    NoRemote(String),
}

impl PreflightError {
    pub fn hint(&self) -> &'static str {
        match self {
            PreflightError::NotConnected => "Run `autopilot connect` first.",
            PreflightError::GitMissing => "Install Git: https://git-scm.com/downloads",
            PreflightError::NotARepository => "Run `autopilot init` or `git init` first.",
            PreflightError::NoRemote(_) => {
                "Run `autopilot init` to set up a GitHub repository, or: git remote add origin <url>"
            }
        }
    }
}

/// Run the checks; `remote: None` skips the remote check
///
/// `on_pass` receives a short label for each check that succeeded.
pub async fn check<F>(git: &Git, token: Option<&str>, remote: Option<&str>, mut on_pass: F) -> Result<(), PreflightError>
where
    F: FnMut(&str),
{
    if token.map_or(true, |t| t.trim().is_empty()) {
        return Err(PreflightError::NotConnected);
    }
    on_pass("Connected to GitHub");

    if !git.is_installed().await {
        return Err(PreflightError::GitMissing);
    }
    on_pass("Git installed");

    if !git.is_inside_repository().await {
        return Err(PreflightError::NotARepository);
    }
    on_pass("Inside git repository");

    if let Some(remote) = remote {
        // An unreadable remote list counts as no remote
        if !git.has_remote(remote).await.unwrap_or(false) {
            return Err(PreflightError::NoRemote(remote.to_string()));
        }
        on_pass("Remote found");
    }

    Ok(())
}

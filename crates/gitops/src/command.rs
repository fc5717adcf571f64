//! Async runner for the `git` executable
//!
//! Every call spawns `git` in the configured working directory via
//! `tokio::process`, so long pushes never block the runtime. Arguments are
//! passed directly (no shell), which keeps commit messages with quotes or
//! newlines intact.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::GitError;
use crate::status::{parse_porcelain, StatusEntry};

/// Handle on a working directory in which git commands are run
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    async fn output(&self, args: &[&str]) -> Result<Output, GitError> {
        trace!(?args, workdir = %self.workdir.display(), "running git");
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            // Never block on an interactive credential prompt
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(GitError::Spawn)
    }

    /// Run git and return trimmed stdout, or the captured failure output
    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.output(args).await?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if output.status.success() {
            return Ok(stdout.trim_end().to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let captured = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        let command = args.first().copied().unwrap_or_default().to_string();
        debug!(%command, code = ?output.status.code(), output = %captured, "git command failed");

        Err(GitError::Command {
            command,
            output: captured,
        })
    }

    /// `git --version` runs and looks like git
    pub async fn is_installed(&self) -> bool {
        match self.output(&["--version"]).await {
            Ok(output) => {
                output.status.success() && String::from_utf8_lossy(&output.stdout).contains("git version")
            }
            Err(_) => false,
        }
    }

    /// The working directory lies inside a git work tree
    pub async fn is_inside_repository(&self) -> bool {
        matches!(
            self.run(&["rev-parse", "--is-inside-work-tree"]).await.as_deref(),
            Ok("true")
        )
    }

    /// A remote named exactly `name` is configured
    pub async fn has_remote(&self, name: &str) -> Result<bool, GitError> {
        let remotes = self.run(&["remote"]).await?;
        Ok(remotes.lines().any(|remote| remote.trim() == name))
    }

    /// Absolute path of the work tree root
    pub async fn toplevel(&self) -> Result<PathBuf, GitError> {
        self.run(&["rev-parse", "--show-toplevel"]).await.map(PathBuf::from)
    }

    /// Absolute path of the `.git` directory
    pub async fn git_dir(&self) -> Result<PathBuf, GitError> {
        self.run(&["rev-parse", "--absolute-git-dir"]).await.map(PathBuf::from)
    }

    /// Changed, staged and untracked paths
    pub async fn status(&self) -> Result<Vec<StatusEntry>, GitError> {
        let output = self.run(&["status", "--porcelain"]).await?;
        Ok(parse_porcelain(&output))
    }

    pub async fn stage_all(&self) -> Result<(), GitError> {
        self.run(&["add", "-A"]).await.map(drop)
    }

    pub async fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "-m", message]).await.map(drop)
    }

    /// Short hash of `HEAD`
    pub async fn head_short(&self) -> Result<String, GitError> {
        self.run(&["rev-parse", "--short", "HEAD"]).await
    }

    /// Push the current branch to its upstream
    pub async fn push(&self) -> Result<(), GitError> {
        self.run(&["push"]).await.map(drop)
    }

    /// `git push -u <remote> <branch>`
    pub async fn push_upstream(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run(&["push", "-u", remote, branch]).await.map(drop)
    }

    /// Checked-out branch; `None` on a detached HEAD
    pub async fn current_branch(&self) -> Result<Option<String>, GitError> {
        let branch = self.run(&["branch", "--show-current"]).await?;
        let branch = branch.trim();
        Ok((!branch.is_empty()).then(|| branch.to_string()))
    }

    pub async fn init(&self) -> Result<(), GitError> {
        self.run(&["init"]).await.map(drop)
    }

    /// `git branch -M <name>`
    pub async fn rename_branch(&self, name: &str) -> Result<(), GitError> {
        self.run(&["branch", "-M", name]).await.map(drop)
    }

    pub async fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.run(&["remote", "add", name, url]).await.map(drop)
    }

    /// Set a repository-local config value
    pub async fn set_config(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.run(&["config", key, value]).await.map(drop)
    }
}

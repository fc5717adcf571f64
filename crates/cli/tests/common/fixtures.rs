//! Git repository fixtures

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git in `dir`, failing with its output
pub fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .with_context(|| format!("Failed to run git {:?}", args))?;
    if !output.status.success() {
        anyhow::bail!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Scratch directory, optionally a repository with a local bare remote
pub struct TestRepo {
    _temp_dir: TempDir,
    root: PathBuf,
    work: PathBuf,
}

impl TestRepo {
    /// Empty directory that is not a repository
    pub fn plain() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().to_path_buf();
        let work = root.join("work");
        std::fs::create_dir_all(&work)?;
        Ok(Self {
            _temp_dir: temp_dir,
            root,
            work,
        })
    }

    /// Repository on branch `main` with one commit and no remote
    pub fn without_remote() -> Result<Self> {
        let repo = Self::plain()?;
        let work = repo.path();
        git(work, &["init"])?;
        git(work, &["config", "user.name", "Autopilot Test"])?;
        git(work, &["config", "user.email", "test@example.com"])?;
        git(work, &["config", "commit.gpgsign", "false"])?;
        git(work, &["branch", "-M", "main"])?;
        repo.write("README.md", "# test\n")?;
        git(work, &["add", "-A"])?;
        git(work, &["commit", "-m", "Initial commit"])?;
        Ok(repo)
    }

    /// Repository tracking `origin/main` in a local bare repository
    pub fn with_remote() -> Result<Self> {
        let repo = Self::without_remote()?;
        let remote = repo.remote_path();
        git(&repo.root, &["init", "--bare", "remote.git"])?;
        git(repo.path(), &["remote", "add", "origin", &remote.display().to_string()])?;
        git(repo.path(), &["push", "-u", "origin", "main"])?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.work
    }

    pub fn remote_path(&self) -> PathBuf {
        self.root.join("remote.git")
    }

    /// Config file outside the work tree
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn write(&self, relative: &str, contents: &str) -> Result<()> {
        let path = self.work.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Subject of the newest commit on the remote's `main`
    pub fn remote_head_subject(&self) -> Result<String> {
        git(
            &self.root,
            &["--git-dir", "remote.git", "log", "-1", "--format=%s", "main"],
        )
    }
}

//! Per-repository watch lock
//!
//! One watch session per repository: an exclusive `flock` on
//! `<git-dir>/autopilot/watch.lock`, which records the owner's pid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct WatchLock {
    path: PathBuf,
    // Holds the flock for the lifetime of the session
    _file: File,
}

/// Lock file content
#[derive(Debug, Serialize, Deserialize)]
struct LockContent {
    pid: u32,
    started_at: String,
}

impl WatchLock {
    pub fn lock_path(git_dir: &Path) -> PathBuf {
        git_dir.join("autopilot").join("watch.lock")
    }

    /// Acquire the exclusive watch lock for the repository owning `git_dir`
    ///
    /// Fails when another live process holds it.
    pub fn acquire(git_dir: &Path) -> Result<Self> {
        let lock_path = Self::lock_path(git_dir);

        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create lock directory")?;
        }

        for _ in 0..ACQUIRE_ATTEMPTS {
            let mut file = open_lock_file(&lock_path)?;

            if !try_flock_exclusive(&file)? {
                // flock is dropped when its owner exits, so the holder is alive
                return match read_lock_content(&mut file) {
                    Ok(content) => Err(anyhow::anyhow!(
                        "Watch mode is already running in this repository (pid {}, since {})",
                        content.pid,
                        content.started_at
                    )),
                    Err(_) => Err(anyhow::anyhow!("Watch mode is already running in this repository")),
                };
            }

            // The previous owner unlinked the file between our open and flock
            if !is_same_file(&file, &lock_path) {
                continue;
            }

            if let Ok(previous) = read_lock_content(&mut file) {
                if previous.pid != std::process::id() && is_process_alive(previous.pid) {
                    // Unlocked file whose recorded owner still exists
                    anyhow::bail!(
                        "Watch mode is already running in this repository (pid {}, since {})",
                        previous.pid,
                        previous.started_at
                    );
                }
                warn!(path = %lock_path.display(), pid = previous.pid, "reclaiming stale watch lock");
            }
            write_lock_content(&mut file)?;

            return Ok(Self {
                path: lock_path,
                _file: file,
            });
        }

        anyhow::bail!("Lock file {} keeps being replaced", lock_path.display())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock and remove the lock file
    ///
    /// A file that has since been replaced at the same path is left alone.
    pub fn release(self) -> Result<()> {
        if is_same_file(&self._file, &self.path) {
            std::fs::remove_file(&self.path).context("Failed to remove lock file")?;
        }
        Ok(())
    }
}

impl Drop for WatchLock {
    fn drop(&mut self) {
        if is_same_file(&self._file, &self.path) {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

const ACQUIRE_ATTEMPTS: usize = 3;

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .context("Failed to open lock file")
}

/// Whether `path` still names the inode behind `file`
#[cfg(unix)]
fn is_same_file(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), std::fs::metadata(path)) {
        (Ok(held), Ok(current)) => held.dev() == current.dev() && held.ino() == current.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(_file: &File, path: &Path) -> bool {
    path.exists()
}

fn write_lock_content(file: &mut File) -> Result<()> {
    let content = LockContent {
        pid: std::process::id(),
        started_at: chrono::Local::now().to_rfc3339(),
    };
    let serialized = serde_json::to_string(&content).context("Failed to serialize lock content")?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn read_lock_content(file: &mut File) -> Result<LockContent> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).context("Failed to deserialize lock content")
}

/// Try to acquire exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> Result<bool> {
    Ok(true)
}

#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Null signal: existence check only
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(_) => true,
    }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}

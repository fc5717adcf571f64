//! Watch mode entry point

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::daemon::{self, WatchOptions};
use crate::system_config::SystemConfig;
use crate::user_error;

pub async fn run(debounce: Option<u64>, path: Option<PathBuf>, config: &SystemConfig) -> Result<()> {
    let secs = debounce.unwrap_or(config.watch.debounce_secs);
    if !(1..=3600).contains(&secs) {
        return Err(user_error(
            format!("Invalid debounce time: {}", secs),
            "Debounce must be between 1 and 3600 seconds.",
        ));
    }

    let path = match path {
        Some(p) => p,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    if !path.is_dir() {
        anyhow::bail!("Not a directory: {}", path.display());
    }

    daemon::run_watch(
        config,
        WatchOptions {
            path,
            debounce: Duration::from_secs(secs),
        },
    )
    .await
}

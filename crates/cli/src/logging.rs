//! Tracing setup
//!
//! `RUST_LOG` wins when set; otherwise the level follows `-v`. Diagnostics go
//! to stderr so they never mix with command output, plus an optional daily
//! log file when `log.directory` is configured.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const LOG_FILE_PREFIX: &str = "autopilot.log";

/// Keeps the non-blocking file writer flushing; hold until exit
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Default filter directive for a `-v` count
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber; later calls are no-ops
pub fn init(verbosity: u8, log_dir: Option<&Path>) -> LogGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));

    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match log_dir.map(|dir| (dir, std::fs::create_dir_all(dir))) {
        Some((dir, Ok(()))) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(true);
            (Some(layer), Some(guard))
        }
        Some((dir, Err(e))) => {
            eprintln!("warning: cannot create log directory {}: {}", dir.display(), e);
            (None, None)
        }
        None => (None, None),
    };

    let _ = Registry::default()
        .with(filter)
        .with(stderr)
        .with(file_layer)
        .try_init();

    LogGuard { _file: guard }
}

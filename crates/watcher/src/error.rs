//! Error types for the watcher crate

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid ignore rules in {}: {source}", path.display())]
    Ignore {
        path: PathBuf,
        #[source]
        source: ::ignore::Error,
    },

    #[error("failed to watch {}: {source}", path.display())]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

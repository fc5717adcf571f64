//! Autopilot command-line library
//!
//! Everything behind the `autopilot` binary: commands, configuration,
//! logging, preflight checks and the watch-mode lifecycle.

pub mod cmd;
pub mod daemon;
pub mod locks;
pub mod logging;
pub mod preflight;
pub mod signals;
pub mod system_config;
pub mod util;

use gitops::SyncError;
use preflight::PreflightError;

/// Failure with a corrective hint, reported once by `main`
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct UserError {
    pub message: String,
    pub hint: String,
}

pub fn user_error(message: impl Into<String>, hint: impl Into<String>) -> anyhow::Error {
    UserError {
        message: message.into(),
        hint: hint.into(),
    }
    .into()
}

/// Hint attached to any known error in the chain
pub fn hint_for(err: &anyhow::Error) -> Option<String> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<PreflightError>() {
            Some(e.hint().to_string())
        } else if let Some(e) = cause.downcast_ref::<SyncError>() {
            Some(e.hint())
        } else {
            cause.downcast_ref::<UserError>().map(|e| e.hint.clone())
        }
    })
}

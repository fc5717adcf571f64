//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use github::{CredentialStore, GitHubClient, KeyringStore, DEFAULT_ACCOUNT};
use gitops::StatusEntry;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

use crate::system_config::SystemConfig;

/// Environment variable that supplies the token instead of the keyring
///
/// Set but empty means "not connected".
pub const TOKEN_ENV: &str = "AUTOPILOT_TOKEN";

pub fn credential_store() -> KeyringStore {
    KeyringStore::new()
}

/// Token from `AUTOPILOT_TOKEN`, falling back to the credential store
pub fn current_token(store: &dyn CredentialStore) -> Result<Option<String>> {
    token_from(std::env::var(TOKEN_ENV).ok(), store)
}

fn token_from(env_value: Option<String>, store: &dyn CredentialStore) -> Result<Option<String>> {
    if let Some(value) = env_value {
        let value = value.trim().to_string();
        return Ok((!value.is_empty()).then_some(value));
    }
    store
        .get(DEFAULT_ACCOUNT)
        .context("Failed to read token from the credential store")
}

pub fn github_client(config: &SystemConfig) -> Result<GitHubClient> {
    GitHubClient::new(config.github.api_url.clone()).context("Failed to create GitHub client")
}

/// Spinner on stderr for network calls
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Up to `limit` status lines, then `... and N more`
pub fn summarize_changes(entries: &[StatusEntry], limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = entries.iter().take(limit).map(|e| e.to_string()).collect();
    if entries.len() > limit {
        lines.push(format!("... and {} more", entries.len() - limit));
    }
    lines
}

pub fn print_changes(entries: &[StatusEntry], limit: usize) {
    println!("{}", format!("📝 Found {} change(s):", entries.len()).cyan());
    for line in summarize_changes(entries, limit) {
        println!("  {}", line.dimmed());
    }
}

/// Repository name derived from a directory name
pub fn default_repo_name(dir: &Path) -> String {
    let raw = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut name = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
            name.push(c);
        } else if !name.ends_with('-') {
            name.push('-');
        }
    }
    let name = name.trim_matches('-').to_string();

    if name.is_empty() {
        "my-project".to_string()
    } else {
        name
    }
}

//! Remove the stored token

use anyhow::{Context, Result};
use github::{CredentialStore, DEFAULT_ACCOUNT};
use owo_colors::OwoColorize;

use crate::util;

pub async fn run() -> Result<()> {
    let removed = util::credential_store()
        .delete(DEFAULT_ACCOUNT)
        .context("Failed to remove token")?;

    if removed {
        println!("{} Disconnected from GitHub", "✓".green());
    } else {
        println!("{}", "You are not connected to GitHub.".yellow());
    }

    if std::env::var_os(util::TOKEN_ENV).is_some() {
        println!(
            "{}",
            format!("Note: {} is set and still provides a token.", util::TOKEN_ENV).dimmed()
        );
    }
    Ok(())
}

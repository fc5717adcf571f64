//! Connect a GitHub account

use anyhow::{Context, Result};
use dialoguer::Password;
use github::{CredentialStore, TokenStatus, DEFAULT_ACCOUNT};
use owo_colors::OwoColorize;

use crate::system_config::SystemConfig;
use crate::{user_error, util};

pub async fn run(token: Option<String>, config: &SystemConfig) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None => {
            println!("{}", "Create a token at https://github.com/settings/tokens (scope: repo)".dimmed());
            Password::new()
                .with_prompt("GitHub Personal Access Token")
                .interact()
                .context("Failed to read token")?
        }
    };
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("No token provided");
    }

    let client = util::github_client(config)?;
    let pb = util::spinner("Validating token...");
    let status = client.validate_token(token).await;
    pb.finish_and_clear();

    match status.context("Failed to validate token")? {
        TokenStatus::Valid(user) => {
            util::credential_store()
                .set(DEFAULT_ACCOUNT, token)
                .context("Failed to save token")?;

            println!("{} Connected as {}", "✓".green(), format!("@{}", user.login).cyan());
            if let Some(name) = &user.name {
                println!("  {}", name.dimmed());
            }
            Ok(())
        }
        TokenStatus::Invalid => Err(user_error(
            "Invalid token",
            "Check that the token is correct and has not expired.",
        )),
    }
}

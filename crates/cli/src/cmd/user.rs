//! Show the connected GitHub account

use anyhow::{Context, Result};
use github::TokenStatus;
use owo_colors::OwoColorize;

use crate::system_config::SystemConfig;
use crate::util;

pub async fn run(config: &SystemConfig) -> Result<()> {
    let store = util::credential_store();
    let Some(token) = util::current_token(&store)? else {
        println!("{}", "⚠  You are not connected to GitHub.".yellow());
        println!("{}", "💡 Run `autopilot connect` first.".dimmed());
        return Ok(());
    };

    let client = util::github_client(config)?;
    let pb = util::spinner("Fetching account...");
    let status = client.validate_token(&token).await;
    pb.finish_and_clear();

    match status.context("Failed to reach GitHub")? {
        TokenStatus::Valid(user) => {
            println!("{}", "GitHub Account".bold());
            println!("  {}: {}", "Username".dimmed(), format!("@{}", user.login).cyan());
            println!("  {}: {}", "Name".dimmed(), user.name.as_deref().unwrap_or("(not set)"));
            println!("  {}: {}", "Email".dimmed(), user.email.as_deref().unwrap_or("(private)"));
            let scopes = if user.scopes.is_empty() {
                "(none reported)".to_string()
            } else {
                user.scopes.join(", ")
            };
            println!("  {}: {}", "Scopes".dimmed(), scopes);
        }
        TokenStatus::Invalid => {
            println!("{}", "❌ Your token is invalid or has expired.".red());
            println!("{}", "💡 Run `autopilot connect` to reconnect.".dimmed());
        }
    }
    Ok(())
}

//! One-shot stage → commit → push

use anyhow::{Context, Result};
use dialoguer::Input;
use gitops::{stage_commit_push, Git, SyncError, SyncProgress};
use owo_colors::OwoColorize;

use crate::preflight::{self, PreflightError};
use crate::system_config::SystemConfig;
use crate::util;

pub async fn run(message: Option<String>, config: &SystemConfig) -> Result<()> {
    let store = util::credential_store();
    let token = util::current_token(&store)?;
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let git = Git::new(&cwd);

    preflight::check(&git, token.as_deref(), None, |_| {}).await?;

    let changes = git.status().await.context("Failed to read git status")?;
    if changes.is_empty() {
        println!("{}", "📝 No changes to commit".yellow());
        println!("{}", "Working directory is clean.".dimmed());
        return Ok(());
    }
    util::print_changes(&changes, 5);
    println!();

    if !git.has_remote(&config.git.remote).await.unwrap_or(false) {
        return Err(PreflightError::NoRemote(config.git.remote.clone()).into());
    }

    let message = match message {
        Some(m) if !m.trim().is_empty() => m,
        _ => Input::<String>::new()
            .with_prompt("Commit message")
            .default(default_message())
            .interact_text()
            .context("Failed to read commit message")?,
    };

    let result = stage_commit_push(&git, &config.git.remote, &message, |progress| match progress {
        SyncProgress::Started(step) => println!("{}", format!("→ {}...", step).dimmed()),
        SyncProgress::Finished(step) => println!("{} {}", "✓".green(), step),
    })
    .await;

    match result {
        Ok(report) => {
            println!(
                "\n{} Successfully pushed! {}",
                "✓".green(),
                format!(
                    "({} file(s) on {}, {})",
                    report.files_changed,
                    report.branch.as_deref().unwrap_or("HEAD"),
                    report.commit
                )
                .dimmed()
            );
            Ok(())
        }
        // Raced with another writer; nothing left to do
        Err(SyncError::NoChanges) => {
            println!("{}", "📝 No changes to commit".yellow());
            Ok(())
        }
        Err(e) => Err(e).context("Push failed"),
    }
}

fn default_message() -> String {
    format!("Update {}", chrono::Local::now().format("%Y-%m-%d"))
}

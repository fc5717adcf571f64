//! Watch-mode lifecycle
//!
//! Preflight → lock → subscribe → session loop → drain → unsubscribe →
//! unlock. The session loop owns the coordinator; this module only wires
//! collaborators together and renders progress.

use anyhow::{Context, Result};
use async_trait::async_trait;
use gitops::{stage_commit_push, Git, SyncError, SyncProgress, SyncStep};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use watcher::{run_session, ChangeKind, Coordinator, Notice, SessionSummary, Subscription, SyncAction};

use crate::locks::WatchLock;
use crate::preflight;
use crate::signals::ShutdownSignal;
use crate::system_config::SystemConfig;
use crate::util;

/// Resolved settings for one watch session
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Directory to start from; the repository root is watched
    pub path: PathBuf,
    pub debounce: Duration,
}

/// Stage, commit and push with the generated message
pub struct AutoPush {
    git: Git,
    remote: String,
}

impl AutoPush {
    pub fn new(git: Git, remote: impl Into<String>) -> Self {
        Self {
            git,
            remote: remote.into(),
        }
    }
}

#[async_trait]
impl SyncAction for AutoPush {
    type Error = SyncError;

    async fn run(&self, message: String) -> Result<(), SyncError> {
        let report = stage_commit_push(&self.git, &self.remote, &message, |progress| {
            if let SyncProgress::Finished(step) = progress {
                let label = match step {
                    SyncStep::Status => "changes detected",
                    SyncStep::Stage => "changes staged",
                    SyncStep::Commit => "committed",
                    SyncStep::Push => "pushed",
                };
                println!("   {} {}", "✓".green(), label.dimmed());
            }
        })
        .await?;

        println!(
            "   {}",
            format!(
                "{} file(s) on {} ({})",
                report.files_changed,
                report.branch.as_deref().unwrap_or("HEAD"),
                report.commit
            )
            .dimmed()
        );
        Ok(())
    }
}

/// Run watch mode until interrupted
pub async fn run_watch(config: &SystemConfig, options: WatchOptions) -> Result<()> {
    println!("{}", "👀 Starting Autopilot Watch Mode...\n".blue());

    let store = util::credential_store();
    let token = util::current_token(&store)?;
    let git = Git::new(&options.path);

    preflight::check(&git, token.as_deref(), Some(config.git.remote.as_str()), |passed| {
        println!("{} {}", "✓".green(), passed);
    })
    .await?;

    let root = git.toplevel().await.context("Failed to locate repository root")?;
    let git_dir = git.git_dir().await.context("Failed to locate .git directory")?;
    let git = Git::new(&root);

    let lock = WatchLock::acquire(&git_dir)?;

    let shutdown = ShutdownSignal::new();
    let listener = shutdown.listen()?;

    let mut subscription = Subscription::start(&root, config.ignore_config(), config.observer_config())
        .with_context(|| format!("Failed to watch {}", root.display()))?;

    println!("{}", "✓ All checks passed\n".green());
    println!("{}", "🤖 Watching for changes...".cyan());
    println!("{}", format!("   Repository: {}", root.display()).dimmed());
    println!("{}", format!("   Debounce time: {}s", options.debounce.as_secs()).dimmed());
    println!(
        "{}",
        format!("   Ignore sources: {}", subscription.ignore_sources()).dimmed()
    );
    println!("{}", "   Press Ctrl+C to stop\n".dimmed());
    info!(root = %root.display(), debounce_secs = options.debounce.as_secs(), "watch session started");

    let mut coordinator =
        Coordinator::new(options.debounce).with_message_prefix(config.git.auto_message_prefix.clone());
    let action = AutoPush::new(git, config.git.remote.clone());

    let summary = run_session(
        &mut coordinator,
        &mut subscription,
        &action,
        shutdown.wait(),
        present,
    )
    .await;

    subscription.close().await;
    listener.abort();
    lock.release()?;

    print_summary(&summary);
    println!("{}", "✓ Watch mode stopped\n".green());
    Ok(())
}

fn present(notice: Notice<'_, SyncError>) {
    match notice {
        Notice::Queued {
            event,
            rearmed,
            fires_in,
        } => {
            let line = format!("📝 {}: {}", event.kind, event.path.display());
            if event.kind == ChangeKind::Deleted {
                println!("{}", line.red());
            } else {
                println!("{}", line.cyan());
            }
            if rearmed {
                println!("{}", "   ⏳ Resetting timer...".dimmed());
            }
            println!(
                "{}",
                format!("   ⏲  Will process in {}s if no new changes...\n", fires_in.as_secs()).dimmed()
            );
        }
        Notice::Dropped { event } => {
            println!(
                "{}",
                format!(
                    "   {}: {} (push in progress, picked up next cycle)",
                    event.kind,
                    event.path.display()
                )
                .dimmed()
            );
        }
        Notice::ObserverError { message } => {
            println!("{} {}", "❌ Watcher error:".red(), message);
        }
        Notice::Dispatching { dispatch } => {
            println!(
                "{}",
                format!("\n🔍 Processing {} change(s)...", dispatch.changes.len()).cyan()
            );
        }
        Notice::Succeeded => {
            println!("{}", "✓ Changes pushed successfully\n".green());
            println!("{}", "👀 Watching for more changes...\n".cyan());
        }
        Notice::Failed { error } => {
            match error {
                SyncError::NoChanges => println!("{}", "📝 Nothing to commit".yellow()),
                other => println!("{} {}", "❌ Failed to push:".red(), other),
            }
            println!("{}", format!("💡 {}\n", error.hint()).dimmed());
            println!("{}", "👀 Watching for more changes...\n".cyan());
        }
        Notice::Draining => {
            println!("{}", "Waiting for the current push to finish...".yellow());
        }
    }
}

fn print_summary(summary: &SessionSummary) {
    let stats = &summary.stats;
    if summary.cancelled_pending {
        println!("{}", "Pending changes were not pushed.".yellow());
    }
    println!(
        "{}",
        format!(
            "Session: {} change(s) seen, {} push(es), {} failed, {} ignored while busy",
            stats.events_recorded, stats.succeeded, stats.failed, stats.events_dropped
        )
        .dimmed()
    );
}

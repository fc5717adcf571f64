//! Set up a repository and its GitHub remote

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input};
use github::{GitHubError, NewRepository, TokenStatus};
use gitops::{Git, PushTarget, SyncError, SyncStep};
use owo_colors::OwoColorize;
use std::path::Path;

use crate::preflight::PreflightError;
use crate::system_config::SystemConfig;
use crate::{user_error, util};

const GITIGNORE: &str = "\
# Dependencies and build output
node_modules/
target/
dist/

# Environment
.env

# OS and editor files
.DS_Store
*.log
";

#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Accept every prompt with its default
    pub yes: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    pub public: bool,
    pub no_files: bool,
}

pub async fn run(options: InitOptions, config: &SystemConfig) -> Result<()> {
    println!("{}", "🚀 Initializing repository...\n".blue());

    let store = util::credential_store();
    let token = util::current_token(&store)?.ok_or(PreflightError::NotConnected)?;

    let client = util::github_client(config)?;
    let pb = util::spinner("Validating token...");
    let status = client.validate_token(&token).await;
    pb.finish_and_clear();
    let login = match status.context("Failed to validate token")? {
        TokenStatus::Valid(user) => user.login,
        TokenStatus::Invalid => {
            return Err(user_error(
                "Your token is invalid or expired",
                "Run `autopilot logout` then `autopilot connect`.",
            ))
        }
    };
    println!("{} Connected as @{}", "✓".green(), login);

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let git = Git::new(&cwd);
    if !git.is_installed().await {
        return Err(PreflightError::GitMissing.into());
    }

    if git.is_inside_repository().await {
        println!("{}", "✓ Already a git repository".green());
    } else {
        println!("{}", "📁 Not a git repository. Initializing...".cyan());
        git.init().await.context("Failed to initialize git repository")?;
        println!("{}", "✓ Git repository initialized".green());

        git.rename_branch(&config.git.default_branch)
            .await
            .context("Failed to set default branch")?;
        println!("{} Default branch set to {}", "✓".green(), config.git.default_branch);

        if !options.no_files {
            write_starter_files(&cwd)?;
        }

        if git.status().await.context("Failed to read git status")?.is_empty() {
            println!("{}", "Nothing to commit yet".dimmed());
        } else {
            git.stage_all().await.context("Failed to stage files")?;
            git.commit("Initial commit").await.context("Failed to create initial commit")?;
            println!("{}", "✓ Initial commit created".green());
        }
    }
    println!();

    let remote = &config.git.remote;
    if git.has_remote(remote).await.unwrap_or(false) {
        println!("{} Remote {} already configured\n", "✓".green(), remote);
        return Ok(());
    }

    let proceed = options.yes
        || Confirm::new()
            .with_prompt("Create a new GitHub repository?")
            .default(true)
            .interact()
            .context("Failed to read confirmation")?;
    if !proceed {
        println!("{}", "\n💡 You can manually add a remote with:".yellow());
        println!("{}", format!("  git remote add {} <url>", remote).dimmed());
        println!(
            "{}",
            format!("  git push -u {} {}\n", remote, config.git.default_branch).dimmed()
        );
        return Ok(());
    }

    let mut request = NewRepository {
        name: options.name.clone().unwrap_or_else(|| util::default_repo_name(&cwd)),
        description: options.description.clone().filter(|d| !d.trim().is_empty()),
        private: !options.public,
    };
    if !options.yes && options.name.is_none() {
        request.name = prompt_name(&request.name)?;
    }

    let created = loop {
        let pb = util::spinner(format!("Creating {}...", request.name));
        let result = client.create_repository(&token, &request).await;
        pb.finish_and_clear();

        match result {
            Ok(created) => break created,
            Err(GitHubError::NameTaken(name)) if !options.yes => {
                println!("{}", format!("❌ Repository name '{}' already exists", name).red());
                request.name = prompt_name(&name)?;
            }
            Err(GitHubError::NameTaken(name)) => {
                return Err(user_error(
                    format!("Repository name '{}' already exists", name),
                    "Pass a different name with --name.",
                ))
            }
            Err(GitHubError::Unauthorized) => {
                return Err(user_error(
                    "GitHub rejected the token",
                    "Run `autopilot logout` then `autopilot connect`.",
                ))
            }
            Err(e) => return Err(e).context("Failed to create repository"),
        }
    };
    println!("{} Repository {} created on GitHub", "✓".green(), created.full_name);

    git.add_remote(remote, &created.clone_url)
        .await
        .context("Failed to add remote")?;
    println!("{} Remote {} added", "✓".green(), remote);

    if git.head_short().await.is_ok() {
        let branch = git
            .current_branch()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| config.git.default_branch.clone());
        git.push_upstream(remote, &branch)
            .await
            .map_err(|e| SyncError::from_git(SyncStep::Push, e, PushTarget { remote, branch: &branch }))
            .context("Failed to push to GitHub")?;
        println!("{}", "✓ Pushed to GitHub\n".green());
    } else {
        println!("{}", "No commits to push yet\n".yellow());
    }

    println!("{}", "🎉 All done!".cyan());
    println!("{}", format!("View your repository: {}\n", created.html_url).dimmed());
    Ok(())
}

fn prompt_name(initial: &str) -> Result<String> {
    let name: String = Input::new()
        .with_prompt("Repository name")
        .with_initial_text(initial)
        .validate_with(|input: &String| -> Result<(), &'static str> {
            if input.trim().is_empty() {
                Err("Name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("Failed to read repository name")?;
    Ok(name.trim().to_string())
}

/// Create `.gitignore` and `README.md` unless they already exist
fn write_starter_files(dir: &Path) -> Result<()> {
    let gitignore = dir.join(".gitignore");
    if !gitignore.exists() {
        std::fs::write(&gitignore, GITIGNORE).context("Failed to write .gitignore")?;
        println!("{}", "✓ Created .gitignore".green());
    }

    let readme = dir.join("README.md");
    if !readme.exists() {
        std::fs::write(&readme, readme_content(dir)).context("Failed to write README.md")?;
        println!("{}", "✓ Created README.md".green());
    }
    Ok(())
}

fn readme_content(dir: &Path) -> String {
    let project = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "My Project".to_string());
    format!("# {}\n\nCreated with Autopilot CLI.\n", project)
}

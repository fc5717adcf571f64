//! Autopilot CLI - autopilot command

use clap::{ArgAction, Parser, Subcommand};
use cli_lib::cmd;
use cli_lib::cmd::init::InitOptions;
use cli_lib::{hint_for, logging, system_config};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Autopilot - commit and push your work automatically
#[derive(Parser)]
#[command(name = "autopilot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect your GitHub account with a Personal Access Token
    Connect {
        /// Token to store (prompted when omitted)
        #[arg(long)]
        token: Option<String>,
    },
    /// Show the connected GitHub account
    User,
    /// Disconnect your GitHub account
    Logout,
    /// Initialize a repository and create it on GitHub
    Init {
        /// Accept all prompts with their defaults
        #[arg(short = 'y', long)]
        yes: bool,
        /// Repository name (default: current directory name)
        #[arg(long)]
        name: Option<String>,
        /// Repository description
        #[arg(long)]
        description: Option<String>,
        /// Create a public repository (default: private)
        #[arg(long)]
        public: bool,
        /// Don't create .gitignore and README.md
        #[arg(long)]
        no_files: bool,
    },
    /// Stage, commit and push all changes
    Push {
        /// Commit message (prompted when omitted)
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Watch for changes and push automatically
    Watch {
        /// Seconds of quiet before pushing (default: watch.debounce_secs)
        #[arg(short, long)]
        debounce: Option<u64>,
        /// Directory inside the repository to watch (default: current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Print a configuration value
    Get {
        /// Key, e.g. watch.debounce_secs
        key: String,
    },
    /// Set a configuration value
    Set {
        key: String,
        value: String,
    },
    /// Show the config file path
    Path {
        /// Create the file with documented defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Show an example configuration
    Example,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_dir = system_config::load().ok().and_then(|c| c.log_directory());
    let guard = logging::init(cli.verbose, log_dir.as_deref());

    let result = dispatch(cli.command).await;

    let code = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            if let Some(hint) = hint_for(&e) {
                eprintln!("{}", format!("💡 {}", hint).dimmed());
            }
            ExitCode::FAILURE
        }
    };

    drop(guard);
    code
}

async fn dispatch(command: Commands) -> anyhow::Result<()> {
    let config = system_config::load;

    match command {
        Commands::Connect { token } => cmd::connect::run(token, &config()?).await,
        Commands::User => cmd::user::run(&config()?).await,
        Commands::Logout => cmd::logout::run().await,
        Commands::Init {
            yes,
            name,
            description,
            public,
            no_files,
        } => {
            let options = InitOptions {
                yes,
                name,
                description,
                public,
                no_files,
            };
            cmd::init::run(options, &config()?).await
        }
        Commands::Push { message } => cmd::push::run(message, &config()?).await,
        Commands::Watch { debounce, path } => cmd::watch::run(debounce, path, &config()?).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}

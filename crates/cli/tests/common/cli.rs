//! CLI command execution helpers
//!
//! Wraps the `autopilot` binary. Every command runs with its own config file
//! and with `AUTOPILOT_TOKEN` set to empty, so the OS keyring is never read.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const BINARY: &str = env!("CARGO_BIN_EXE_autopilot");

/// CLI command builder
pub struct AutopilotCommand {
    working_dir: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl AutopilotCommand {
    /// Create a new command in the given working directory
    ///
    /// The config file defaults to `<working_dir>/.autopilot-test.toml`.
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        let working_dir = working_dir.as_ref().to_path_buf();
        let mut env = HashMap::new();
        env.insert(
            "AUTOPILOT_CONFIG".to_string(),
            working_dir.join(".autopilot-test.toml").display().to_string(),
        );
        env.insert("AUTOPILOT_TOKEN".to_string(), String::new());
        env.insert("GIT_TERMINAL_PROMPT".to_string(), "0".to_string());

        Self {
            working_dir,
            args: Vec::new(),
            env,
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Pretend a token is stored
    pub fn connected(&mut self) -> &mut Self {
        self.env("AUTOPILOT_TOKEN", "test-token")
    }

    pub fn config_file(&mut self, path: &Path) -> &mut Self {
        self.env("AUTOPILOT_CONFIG", &path.display().to_string())
    }

    fn command(&self) -> Command {
        let mut command = Command::new(BINARY);
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .env_remove("RUST_LOG")
            .stdin(Stdio::null());
        command
    }

    /// Start without waiting, with stdout and stderr piped
    pub fn spawn(&self) -> Result<std::process::Child> {
        self.command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn autopilot")
    }

    /// Execute command and capture its output
    pub fn execute(&self) -> Result<CommandResult> {
        let output = self.command().output().context("Failed to execute command")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// Captured command output
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// Last non-empty stdout line with ANSI colour codes removed
    pub fn last_line(&self) -> String {
        let line = self.stdout.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
        strip_ansi(line)
    }
}

/// Remove `ESC [ ... m` sequences
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// autopilot!(dir, "config", "get", "git.remote").assert_success()?;
/// autopilot!(dir, "push", "-m", "msg").connected().assert_failure()?;
/// ```
#[macro_export]
macro_rules! autopilot {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::AutopilotCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[32m✓ done\x1b[39m"), "✓ done");
        assert_eq!(strip_ansi("plain"), "plain");
    }
}

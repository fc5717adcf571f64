//! User configuration file
//!
//! `<config_dir>/autopilot/config.toml`, or the path in `AUTOPILOT_CONFIG`.
//! A missing file means defaults; missing keys take their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use watcher::{IgnoreConfig, ObserverConfig};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "AUTOPILOT_CONFIG";

/// Every key accepted by `config get` / `config set`
pub const KEYS: &[&str] = &[
    "watch.debounce_secs",
    "watch.stability_threshold_ms",
    "watch.poll_interval_ms",
    "watch.use_gitignore",
    "watch.use_autopilotignore",
    "watch.additional_ignores",
    "git.remote",
    "git.default_branch",
    "git.auto_message_prefix",
    "github.api_url",
    "log.directory",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    pub debounce_secs: u64,
    pub stability_threshold_ms: u64,
    pub poll_interval_ms: u64,
    pub use_gitignore: bool,
    pub use_autopilotignore: bool,
    pub additional_ignores: Vec<String>,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            debounce_secs: watcher::debounce::DEFAULT_QUIET_WINDOW.as_secs(),
            stability_threshold_ms: 1000,
            poll_interval_ms: 100,
            use_gitignore: true,
            use_autopilotignore: true,
            additional_ignores: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    pub remote: String,
    pub default_branch: String,
    pub auto_message_prefix: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            remote: gitops::DEFAULT_REMOTE.to_string(),
            default_branch: "main".to_string(),
            auto_message_prefix: watcher::debounce::DEFAULT_MESSAGE_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    pub api_url: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: github::DEFAULT_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Directory for daily log files; empty disables file logging
    pub directory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub watch: WatchSettings,
    pub git: GitSettings,
    pub github: GitHubSettings,
    pub log: LogSettings,
}

impl SystemConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=3600).contains(&self.watch.debounce_secs) {
            anyhow::bail!(
                "watch.debounce_secs must be between 1 and 3600 (got {})",
                self.watch.debounce_secs
            );
        }
        if self.watch.stability_threshold_ms > 60_000 {
            anyhow::bail!(
                "watch.stability_threshold_ms must be between 0 and 60000 (got {})",
                self.watch.stability_threshold_ms
            );
        }
        if !(10..=10_000).contains(&self.watch.poll_interval_ms) {
            anyhow::bail!(
                "watch.poll_interval_ms must be between 10 and 10000 (got {})",
                self.watch.poll_interval_ms
            );
        }
        for (key, value) in [
            ("git.remote", &self.git.remote),
            ("git.default_branch", &self.git.default_branch),
            ("git.auto_message_prefix", &self.git.auto_message_prefix),
            ("github.api_url", &self.github.api_url),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} must not be empty", key);
            }
        }
        if !self.github.api_url.starts_with("http://") && !self.github.api_url.starts_with("https://") {
            anyhow::bail!("github.api_url must be an http(s) URL (got {})", self.github.api_url);
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.watch.debounce_secs)
    }

    pub fn ignore_config(&self) -> IgnoreConfig {
        IgnoreConfig {
            use_gitignore: self.watch.use_gitignore,
            use_autopilotignore: self.watch.use_autopilotignore,
            additional_patterns: self.watch.additional_ignores.clone(),
        }
    }

    pub fn observer_config(&self) -> ObserverConfig {
        ObserverConfig {
            stability_threshold: Duration::from_millis(self.watch.stability_threshold_ms),
            poll_interval: Duration::from_millis(self.watch.poll_interval_ms),
            ..ObserverConfig::default()
        }
    }

    pub fn log_directory(&self) -> Option<PathBuf> {
        let dir = self.log.directory.trim();
        (!dir.is_empty()).then(|| PathBuf::from(dir))
    }

    /// Current value of `key` rendered for display
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "watch.debounce_secs" => self.watch.debounce_secs.to_string(),
            "watch.stability_threshold_ms" => self.watch.stability_threshold_ms.to_string(),
            "watch.poll_interval_ms" => self.watch.poll_interval_ms.to_string(),
            "watch.use_gitignore" => self.watch.use_gitignore.to_string(),
            "watch.use_autopilotignore" => self.watch.use_autopilotignore.to_string(),
            "watch.additional_ignores" => self.watch.additional_ignores.join(","),
            "git.remote" => self.git.remote.clone(),
            "git.default_branch" => self.git.default_branch.clone(),
            "git.auto_message_prefix" => self.git.auto_message_prefix.clone(),
            "github.api_url" => self.github.api_url.clone(),
            "log.directory" => self.log.directory.clone(),
            _ => anyhow::bail!(
                "Unknown config key: {}. Use 'autopilot config list' to see available keys.",
                key
            ),
        };
        Ok(value)
    }

    /// Parse and assign `value` to `key`; on error `self` is left unchanged
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut next = self.clone();
        next.assign(key, value)?;
        next.validate().context("Invalid configuration value")?;
        *self = next;
        Ok(())
    }

    fn assign(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "watch.debounce_secs" => {
                self.watch.debounce_secs = value.parse().context("Invalid value: must be a positive integer")?;
            }
            "watch.stability_threshold_ms" => {
                self.watch.stability_threshold_ms = value
                    .parse()
                    .context("Invalid value: must be a non-negative integer")?;
            }
            "watch.poll_interval_ms" => {
                self.watch.poll_interval_ms = value.parse().context("Invalid value: must be a positive integer")?;
            }
            "watch.use_gitignore" => {
                self.watch.use_gitignore = value.parse().context("Invalid value: must be 'true' or 'false'")?;
            }
            "watch.use_autopilotignore" => {
                self.watch.use_autopilotignore =
                    value.parse().context("Invalid value: must be 'true' or 'false'")?;
            }
            "watch.additional_ignores" => {
                self.watch.additional_ignores = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "git.remote" => self.git.remote = value.to_string(),
            "git.default_branch" => self.git.default_branch = value.to_string(),
            "git.auto_message_prefix" => self.git.auto_message_prefix = value.to_string(),
            "github.api_url" => self.github.api_url = value.to_string(),
            "log.directory" => self.log.directory = value.to_string(),
            _ => anyhow::bail!(
                "Unknown config key: {}. Use 'autopilot config list' to see available keys.",
                key
            ),
        }
        Ok(())
    }
}

/// Location of the config file, if one can be determined
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("autopilot").join("config.toml"))
}

/// Load the config file, falling back to defaults when it does not exist
pub fn load() -> Result<SystemConfig> {
    match config_file_path() {
        Some(path) => load_from(&path),
        None => Ok(SystemConfig::default()),
    }
}

pub fn load_from(path: &Path) -> Result<SystemConfig> {
    let config = read_from(path)?;
    config
        .validate()
        .with_context(|| format!("Invalid config file {}", path.display()))?;

    Ok(config)
}

/// Load without range checks, so `config set` can repair a bad value
pub fn load_unchecked() -> Result<SystemConfig> {
    match config_file_path() {
        Some(path) => read_from(&path),
        None => Ok(SystemConfig::default()),
    }
}

/// Parse the file; a missing file means defaults
pub fn read_from(path: &Path) -> Result<SystemConfig> {
    if !path.exists() {
        return Ok(SystemConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path.display()))
}

pub fn save(config: &SystemConfig) -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;
    save_to(&path, config)
}

pub fn save_to(path: &Path, config: &SystemConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }
    let serialized = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, serialized).with_context(|| format!("Failed to write config file {}", path.display()))?;
    Ok(())
}

/// Write the documented example config if no file exists yet
pub fn init_if_missing() -> Result<PathBuf> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }
        std::fs::write(&path, example_config())
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
    }
    Ok(path)
}

pub fn example_config() -> &'static str {
    r#"# Autopilot configuration

[watch]
# Quiet period after the last change before pushing (1-3600)
debounce_secs = 15
# How long a file must stay unchanged before it counts (0-60000, 0 disables)
stability_threshold_ms = 1000
# How often settling files are re-checked (10-10000)
poll_interval_ms = 100
use_gitignore = true
use_autopilotignore = true
# Extra gitignore-style patterns
additional_ignores = []

[git]
remote = "origin"
default_branch = "main"
auto_message_prefix = "Auto-commit"

[github]
api_url = "https://api.github.com"

[log]
# Directory for daily log files; empty disables file logging
directory = ""
"#
}

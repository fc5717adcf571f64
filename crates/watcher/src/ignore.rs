//! Ignore pattern management for watch mode
//!
//! Supports multiple sources of ignore patterns:
//! 1. Built-in patterns (hidden files, dependency/build dirs, editor temp files - always active)
//! 2. .autopilotignore patterns (tool-specific, optional)
//! 3. .gitignore patterns (optional, enabled by default)
//! 4. Config-based patterns (additional gitignore-style lines)

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::error::WatchError;

/// Directory names that never trigger a push
const BUILTIN_DIRS: &[&str] = &["node_modules", "dist", "build", "coverage"];

/// Name of the tool-specific ignore file
pub const AUTOPILOT_IGNORE_FILE: &str = ".autopilotignore";

/// Ignore rule manager
///
/// Combines multiple sources of ignore patterns with proper precedence:
/// 1. Built-in patterns (highest priority - always enforced)
/// 2. .autopilotignore patterns (a whitelist here overrides .gitignore)
/// 3. .gitignore patterns
/// 4. Additional config patterns
#[derive(Clone)]
pub struct IgnoreRules {
    /// Watched root directory
    repo_root: PathBuf,

    /// Gitignore patterns (optional)
    gitignore: Option<Gitignore>,

    /// Autopilot-specific ignore patterns (optional)
    autopilotignore: Option<Gitignore>,

    /// Patterns from configuration
    extra: Option<Gitignore>,

    /// Configuration
    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Load ignore rules for the watched root
    pub fn load(repo_root: &Path, config: IgnoreConfig) -> Result<Self, WatchError> {
        let mut rules = Self {
            repo_root: repo_root.to_path_buf(),
            gitignore: None,
            autopilotignore: None,
            extra: None,
            config,
        };

        rules.extra = rules.build_extra()?;
        rules.reload_ignore_files()?;
        Ok(rules)
    }

    /// Reload ignore files from disk
    ///
    /// Called by the observer whenever .gitignore or .autopilotignore changes
    pub fn reload_ignore_files(&mut self) -> Result<(), WatchError> {
        self.gitignore = if self.config.use_gitignore {
            self.build_file_matcher(".gitignore")?
        } else {
            None
        };

        self.autopilotignore = if self.config.use_autopilotignore {
            self.build_file_matcher(AUTOPILOT_IGNORE_FILE)?
        } else {
            None
        };

        Ok(())
    }

    fn build_file_matcher(&self, file_name: &str) -> Result<Option<Gitignore>, WatchError> {
        let path = self.repo_root.join(file_name);
        if !path.exists() {
            return Ok(None);
        }

        let mut builder = GitignoreBuilder::new(&self.repo_root);
        if let Some(source) = builder.add(&path) {
            // Partial parse errors still leave the valid lines usable
            tracing::warn!(file = %path.display(), error = %source, "ignoring malformed ignore lines");
        }
        let matcher = builder
            .build()
            .map_err(|source| WatchError::Ignore { path, source })?;
        Ok(Some(matcher))
    }

    fn build_extra(&self) -> Result<Option<Gitignore>, WatchError> {
        if self.config.additional_patterns.is_empty() {
            return Ok(None);
        }

        let mut builder = GitignoreBuilder::new(&self.repo_root);
        for pattern in &self.config.additional_patterns {
            builder
                .add_line(None, pattern)
                .map_err(|source| WatchError::Ignore {
                    path: PathBuf::from("<config>"),
                    source,
                })?;
        }
        let matcher = builder.build().map_err(|source| WatchError::Ignore {
            path: PathBuf::from("<config>"),
            source,
        })?;
        Ok(Some(matcher))
    }

    /// Check if path should be ignored
    ///
    /// Accepts paths relative to the root or absolute paths under it. Paths
    /// outside the root are never ignored.
    pub fn should_ignore(&self, path: &Path) -> bool {
        let Some(rel) = self.relative(path) else {
            return false;
        };
        if rel.as_os_str().is_empty() {
            return false;
        }

        // 1. Built-in patterns (highest priority - always enforced)
        if is_builtin_ignored(rel) {
            return true;
        }

        let is_dir = self.repo_root.join(rel).is_dir();

        // 2. .autopilotignore (a whitelist entry wins over .gitignore)
        if let Some(ref matcher) = self.autopilotignore {
            match matcher.matched_path_or_any_parents(rel, is_dir) {
                Match::Ignore(_) => return true,
                Match::Whitelist(_) => return false,
                Match::None => {}
            }
        }

        // 3. .gitignore
        if let Some(ref matcher) = self.gitignore {
            if matcher.matched_path_or_any_parents(rel, is_dir).is_ignore() {
                return true;
            }
        }

        // 4. Additional config patterns
        if let Some(ref matcher) = self.extra {
            if matcher.matched_path_or_any_parents(rel, is_dir).is_ignore() {
                return true;
            }
        }

        false
    }

    /// Whether `path` is one of the ignore files this rule set reads
    pub fn is_ignore_file(&self, path: &Path) -> bool {
        match self.relative(path) {
            Some(rel) => rel == Path::new(".gitignore") || rel == Path::new(AUTOPILOT_IGNORE_FILE),
            None => false,
        }
    }

    fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        if path.is_absolute() {
            path.strip_prefix(&self.repo_root).ok()
        } else {
            Some(path)
        }
    }

    /// Get number of active ignore sources
    pub fn active_sources(&self) -> usize {
        let mut count = 1; // Built-in always active
        if self.gitignore.is_some() {
            count += 1;
        }
        if self.autopilotignore.is_some() {
            count += 1;
        }
        if self.extra.is_some() {
            count += 1;
        }
        count
    }
}

/// Check if a root-relative path matches the built-in patterns
///
/// These are always enforced regardless of configuration
fn is_builtin_ignored(rel: &Path) -> bool {
    for component in rel.components() {
        let Component::Normal(name) = component else {
            continue;
        };
        let name = name.to_string_lossy();

        // Hidden files and directories (.git, .next, .cache, .DS_Store, ...)
        if name.starts_with('.') {
            return true;
        }

        if BUILTIN_DIRS.contains(&name.as_ref()) {
            return true;
        }
    }

    rel.file_name()
        .map(|name| matches_editor_temp(&name.to_string_lossy()))
        .unwrap_or(false)
}

/// Check if a file name is an editor temporary or OS metadata file
fn matches_editor_temp(filename: &str) -> bool {
    // Vim swap files (.swp, .swo, .swn, .swm)
    if filename.ends_with(".swp")
        || filename.ends_with(".swo")
        || filename.ends_with(".swn")
        || filename.ends_with(".swm")
    {
        return true;
    }

    // Vim/Emacs backup files (~)
    if filename.ends_with('~') {
        return true;
    }

    // Emacs auto-save files (#*#)
    if filename.len() > 1 && filename.starts_with('#') && filename.ends_with('#') {
        return true;
    }

    // Windows system files
    filename == "Thumbs.db" || filename == "desktop.ini"
}

/// Ignore configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Use .gitignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Use .autopilotignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_autopilotignore: bool,

    /// Additional gitignore-style patterns from config
    #[serde(default)]
    pub additional_patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            use_autopilotignore: true,
            additional_patterns: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}

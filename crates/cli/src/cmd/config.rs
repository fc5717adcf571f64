//! Configuration management command
//!
//! View and edit the user configuration file.

use crate::system_config::{self, KEYS};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let config = system_config::load()?;
    let config_path = system_config::config_file_path().context("Could not determine config file path")?;

    println!("{}", "Autopilot Configuration".bold());
    println!("{}: {}", "Location".dimmed(), config_path.display().dimmed());
    if !config_path.exists() {
        println!("{}", "(file does not exist, showing defaults)".dimmed());
    }

    let mut section = "";
    for key in KEYS {
        let (table, field) = key.split_once('.').unwrap_or(("", key));
        if table != section {
            println!("\n{}", format!("[{}]", table).yellow());
            section = table;
        }
        let value = config.get(key)?;
        if value.is_empty() {
            println!("  {} = {}", field.cyan(), "(empty)".dimmed());
        } else {
            println!("  {} = {}", field.cyan(), value);
        }
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  watch.debounce_secs: 1-3600");
    println!("  watch.stability_threshold_ms: 0-60000");
    println!("  watch.poll_interval_ms: 10-10000");

    Ok(())
}

/// Print a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = system_config::load()?;
    println!("{}", config.get(key)?);
    Ok(())
}

/// Set a configuration value and save the file
///
/// The file is read without range checks; the result is validated as a whole
/// before saving, so this also repairs an out-of-range value.
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load_unchecked()?;
    config.set(key, value)?;
    system_config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    if key.starts_with("watch.") {
        println!("{}", "Note: a running watch session keeps its settings until restarted".yellow());
    }

    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = system_config::config_file_path().context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    print!("{}", system_config::example_config());
    Ok(())
}

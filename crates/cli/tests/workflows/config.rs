use crate::autopilot;
use crate::common::TestRepo;
use anyhow::Result;

#[test]
fn test_path_honours_env_override() -> Result<()> {
    let repo = TestRepo::plain()?;
    let config = repo.config_path();

    let result = autopilot!(repo.path(), "config", "path")
        .config_file(&config)
        .assert_success()?;
    assert!(result.contains_stdout(&config.display().to_string()));
    assert!(result.contains_stdout("--create"));
    assert!(!config.exists());

    let result = autopilot!(repo.path(), "config", "path", "--create")
        .config_file(&config)
        .assert_success()?;
    assert!(result.contains_stdout("Created config file"));
    assert!(config.exists());

    // The generated file loads back as the defaults
    let result = autopilot!(repo.path(), "config", "get", "watch.debounce_secs")
        .config_file(&config)
        .assert_success()?;
    assert_eq!(result.last_line(), "15");
    Ok(())
}

#[test]
fn test_set_then_get() -> Result<()> {
    let repo = TestRepo::plain()?;
    let config = repo.config_path();

    autopilot!(repo.path(), "config", "set", "watch.debounce_secs", "30")
        .config_file(&config)
        .assert_success()?;
    autopilot!(repo.path(), "config", "set", "git.auto_message_prefix", "WIP")
        .config_file(&config)
        .assert_success()?;

    let result = autopilot!(repo.path(), "config", "get", "watch.debounce_secs")
        .config_file(&config)
        .assert_success()?;
    assert_eq!(result.last_line(), "30");

    let result = autopilot!(repo.path(), "config", "list")
        .config_file(&config)
        .assert_success()?;
    assert!(result.contains_stdout("WIP"));
    assert!(result.contains_stdout("[git]"));
    Ok(())
}

#[test]
fn test_out_of_range_value_rejected() -> Result<()> {
    let repo = TestRepo::plain()?;
    let config = repo.config_path();

    let result = autopilot!(repo.path(), "config", "set", "watch.debounce_secs", "0")
        .config_file(&config)
        .assert_failure()?;
    assert!(result.contains_stderr("between 1 and 3600"), "{}", result.stderr);
    assert!(!config.exists());

    let result = autopilot!(repo.path(), "config", "set", "watch.use_gitignore", "maybe")
        .config_file(&config)
        .assert_failure()?;
    assert!(result.contains_stderr("true"));
    Ok(())
}

#[test]
fn test_unknown_key() -> Result<()> {
    let repo = TestRepo::plain()?;
    let result = autopilot!(repo.path(), "config", "get", "watch.colour")
        .config_file(&repo.config_path())
        .assert_failure()?;
    assert!(result.contains_stderr("Unknown config key"));
    Ok(())
}

#[test]
fn test_broken_file_reported() -> Result<()> {
    let repo = TestRepo::plain()?;
    let config = repo.config_path();
    std::fs::write(&config, "[watch]\ndebounce_secs = \"soon\"\n")?;

    let result = autopilot!(repo.path(), "config", "list")
        .config_file(&config)
        .assert_failure()?;
    assert!(result.contains_stderr("Failed to parse config file"), "{}", result.stderr);
    Ok(())
}

#[test]
fn test_set_repairs_out_of_range_file() -> Result<()> {
    let repo = TestRepo::plain()?;
    let config = repo.config_path();
    std::fs::write(&config, "[watch]\ndebounce_secs = 0\n")?;

    let result = autopilot!(repo.path(), "config", "get", "watch.debounce_secs")
        .config_file(&config)
        .assert_failure()?;
    assert!(result.contains_stderr("Invalid config file"), "{}", result.stderr);

    autopilot!(repo.path(), "config", "set", "watch.debounce_secs", "20")
        .config_file(&config)
        .assert_success()?;

    let result = autopilot!(repo.path(), "config", "get", "watch.debounce_secs")
        .config_file(&config)
        .assert_success()?;
    assert_eq!(result.last_line(), "20");
    Ok(())
}

#[test]
fn test_example() -> Result<()> {
    let repo = TestRepo::plain()?;
    let result = autopilot!(repo.path(), "config", "example").assert_success()?;
    for section in ["[watch]", "[git]", "[github]", "[log]"] {
        assert!(result.contains_stdout(section));
    }
    Ok(())
}

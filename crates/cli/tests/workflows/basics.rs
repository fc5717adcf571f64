use crate::autopilot;
use crate::common::TestRepo;
use anyhow::Result;

#[test]
fn test_help_lists_commands() -> Result<()> {
    let repo = TestRepo::plain()?;
    let result = autopilot!(repo.path(), "--help").assert_success()?;

    for command in ["connect", "user", "logout", "init", "push", "watch", "config"] {
        assert!(result.contains_stdout(command), "missing {}: {}", command, result.stdout);
    }
    Ok(())
}

#[test]
fn test_version() -> Result<()> {
    let repo = TestRepo::plain()?;
    let result = autopilot!(repo.path(), "--version").assert_success()?;
    assert!(result.contains_stdout(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn test_user_when_not_connected() -> Result<()> {
    let repo = TestRepo::plain()?;
    let result = autopilot!(repo.path(), "user").assert_success()?;
    assert!(result.contains_stdout("not connected"), "{}", result.stdout);
    assert!(result.contains_stdout("autopilot connect"));
    Ok(())
}

#[test]
fn test_init_requires_connection() -> Result<()> {
    let repo = TestRepo::plain()?;
    let result = autopilot!(repo.path(), "init", "--yes").assert_failure()?;

    assert_eq!(result.exit_code, 1);
    assert!(result.contains_stderr("not connected"), "{}", result.stderr);
    // Nothing was initialised
    assert!(!repo.path().join(".git").exists());
    Ok(())
}

#[test]
fn test_unknown_command_is_usage_error() -> Result<()> {
    let repo = TestRepo::plain()?;
    let result = autopilot!(repo.path(), "teleport").assert_failure()?;
    assert_eq!(result.exit_code, 2);
    Ok(())
}

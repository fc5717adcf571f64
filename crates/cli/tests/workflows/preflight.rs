use crate::autopilot;
use crate::common::{git_available, TestRepo};
use anyhow::Result;

#[test]
fn test_watch_not_connected() -> Result<()> {
    let repo = TestRepo::plain()?;
    let result = autopilot!(repo.path(), "watch")
        .config_file(&repo.config_path())
        .assert_failure()?;

    assert_eq!(result.exit_code, 1);
    assert!(result.contains_stderr("not connected"), "{}", result.stderr);
    assert!(result.contains_stderr("autopilot connect"));
    Ok(())
}

#[test]
fn test_watch_outside_repository() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let repo = TestRepo::plain()?;
    let result = autopilot!(repo.path(), "watch")
        .config_file(&repo.config_path())
        .connected()
        .assert_failure()?;

    assert!(result.contains_stderr("Not a git repository"), "{}", result.stderr);
    assert!(result.contains_stderr("autopilot init"));
    Ok(())
}

#[test]
fn test_watch_without_remote() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let repo = TestRepo::without_remote()?;
    let result = autopilot!(repo.path(), "watch")
        .config_file(&repo.config_path())
        .connected()
        .assert_failure()?;

    assert!(result.contains_stderr("No remote repository configured"), "{}", result.stderr);
    // Never reached the lock
    assert!(!repo.path().join(".git/autopilot/watch.lock").exists());
    Ok(())
}

#[test]
fn test_watch_rejects_debounce_out_of_range() -> Result<()> {
    let repo = TestRepo::plain()?;
    for value in ["0", "3601"] {
        let result = autopilot!(repo.path(), "watch", "--debounce", value)
            .config_file(&repo.config_path())
            .connected()
            .assert_failure()?;
        assert!(result.contains_stderr("Invalid debounce time"), "{}", result.stderr);
    }
    Ok(())
}

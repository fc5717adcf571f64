use crate::autopilot;
use crate::common::{git_available, TestRepo};
use anyhow::Result;

#[test]
fn test_push_not_connected() -> Result<()> {
    let repo = TestRepo::plain()?;
    let result = autopilot!(repo.path(), "push", "-m", "msg")
        .config_file(&repo.config_path())
        .assert_failure()?;
    assert!(result.contains_stderr("not connected"));
    Ok(())
}

#[test]
fn test_push_clean_tree() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let repo = TestRepo::with_remote()?;
    let result = autopilot!(repo.path(), "push", "-m", "msg")
        .config_file(&repo.config_path())
        .connected()
        .assert_success()?;

    assert!(result.contains_stdout("No changes to commit"), "{}", result.stdout);
    assert_eq!(repo.remote_head_subject()?, "Initial commit");
    Ok(())
}

#[test]
fn test_push_changes() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let repo = TestRepo::with_remote()?;
    for i in 0..7 {
        repo.write(&format!("notes/{}.txt", i), "hello\n")?;
    }

    let result = autopilot!(repo.path(), "push", "-m", "Add notes")
        .config_file(&repo.config_path())
        .connected()
        .assert_success()?;

    assert!(result.contains_stdout("Successfully pushed"), "{}", result.stdout);
    assert_eq!(repo.remote_head_subject()?, "Add notes");
    Ok(())
}

#[test]
fn test_push_without_remote() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let repo = TestRepo::without_remote()?;
    repo.write("new.txt", "data\n")?;

    let result = autopilot!(repo.path(), "push", "-m", "msg")
        .config_file(&repo.config_path())
        .connected()
        .assert_failure()?;

    assert!(result.contains_stdout("Found 1 change(s)"), "{}", result.stdout);
    assert!(result.contains_stderr("No remote repository configured"), "{}", result.stderr);
    Ok(())
}

use crate::autopilot;
use crate::common::cli::strip_ansi;
use crate::common::{git_available, TestRepo};
use anyhow::Result;
use std::path::Path;
use std::time::{Duration, Instant};

fn wait_for(path: &Path, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if path.exists() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

#[cfg(unix)]
fn terminate(child: &std::process::Child) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM)?;
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_watch_pushes_and_stops_on_sigterm() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let repo = TestRepo::with_remote()?;
    std::fs::write(
        repo.config_path(),
        "[watch]\ndebounce_secs = 1\nstability_threshold_ms = 100\n\n[git]\nauto_message_prefix = \"Autosave\"\n",
    )?;

    let child = autopilot!(repo.path(), "watch")
        .config_file(&repo.config_path())
        .connected()
        .spawn()?;

    let lock = repo.path().join(".git/autopilot/watch.lock");
    if !wait_for(&lock, Duration::from_secs(10)) {
        let output = child.wait_with_output()?;
        anyhow::bail!("watch never started: {}", String::from_utf8_lossy(&output.stderr));
    }
    // Let the observer register before touching files
    std::thread::sleep(Duration::from_millis(500));

    repo.write("src/main.txt", "first draft\n")?;

    let deadline = Instant::now() + Duration::from_secs(15);
    while Instant::now() < deadline && !repo.remote_head_subject()?.starts_with("Autosave") {
        std::thread::sleep(Duration::from_millis(100));
    }

    terminate(&child)?;
    let output = child.wait_with_output()?;
    let stdout = strip_ansi(&String::from_utf8_lossy(&output.stdout));

    assert!(output.status.success(), "stdout: {}\nstderr: {}", stdout, String::from_utf8_lossy(&output.stderr));
    assert!(repo.remote_head_subject()?.starts_with("Autosave"), "{}", stdout);
    assert!(stdout.contains("Changes pushed successfully"), "{}", stdout);
    assert!(stdout.contains("Watch mode stopped"), "{}", stdout);
    assert!(!lock.exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_second_watch_refused() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let repo = TestRepo::with_remote()?;

    let first = autopilot!(repo.path(), "watch")
        .config_file(&repo.config_path())
        .connected()
        .spawn()?;

    let lock = repo.path().join(".git/autopilot/watch.lock");
    if !wait_for(&lock, Duration::from_secs(10)) {
        let output = first.wait_with_output()?;
        anyhow::bail!("watch never started: {}", String::from_utf8_lossy(&output.stderr));
    }
    // Lock content is written right after the file is created
    std::thread::sleep(Duration::from_millis(200));

    let second = autopilot!(repo.path(), "watch")
        .config_file(&repo.config_path())
        .connected()
        .execute();

    terminate(&first)?;
    let output = first.wait_with_output()?;
    assert!(output.status.success());

    let second = second?;
    assert!(!second.success());
    assert!(second.contains_stderr("already running"), "{}", second.stderr);
    Ok(())
}

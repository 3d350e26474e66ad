//! End-to-end tests running the `gwatch` binary against real repositories

mod common;

use common::{
    commit_count, head_commit_time, head_file, head_parent_count, wait_for, GwatchCommand,
    GwatchProcess,
};
use git2::Repository;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

/// Time for the watcher to subscribe the tree after spawning
const STARTUP: Duration = Duration::from_millis(1500);

#[cfg(target_os = "linux")]
fn lock_files(lock_dir: &Path) -> usize {
    fs::read_dir(lock_dir.join("gwatch").join("locks"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[test]
fn test_timeout_out_of_range_is_rejected() {
    let temp_dir = TempDir::new().unwrap();

    for bad in ["0", "100001"] {
        let result = GwatchCommand::new(temp_dir.path())
            .args(&["-r", temp_dir.path().to_str().unwrap(), "-t", bad])
            .assert_failure()
            .unwrap();

        assert!(
            result.contains_stderr("Timeout value must be between 1s and 100000s"),
            "stderr: {}",
            result.stderr
        );
    }
}

#[test]
fn test_new_file_is_committed_as_root_commit() {
    let lock_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    Repository::init(repo_dir.path()).unwrap();

    let repo_arg = repo_dir.path().to_str().unwrap();
    let _gwatch = GwatchProcess::spawn(lock_dir.path(), &["-r", repo_arg, "-t", "1"]).unwrap();
    std::thread::sleep(STARTUP);

    fs::write(repo_dir.path().join("notes.txt"), "hello").unwrap();

    assert!(wait_for(Duration::from_secs(10), || commit_count(repo_dir.path()) == 1));
    assert_eq!(head_parent_count(repo_dir.path()), Some(0));

    // No further changes, no further commits
    std::thread::sleep(Duration::from_secs(3));
    assert_eq!(commit_count(repo_dir.path()), 1);
}

#[test]
fn test_rapid_writes_produce_one_commit() {
    let lock_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    Repository::init(repo_dir.path()).unwrap();

    let repo_arg = repo_dir.path().to_str().unwrap();
    let _gwatch = GwatchProcess::spawn(lock_dir.path(), &["-r", repo_arg, "-t", "1"]).unwrap();
    std::thread::sleep(STARTUP);

    let file = repo_dir.path().join("draft.txt");
    let mut last_write = SystemTime::now();
    for i in 0..15 {
        fs::write(&file, format!("revision {i}\n")).unwrap();
        last_write = SystemTime::now();
        std::thread::sleep(Duration::from_millis(200));
    }
    let last_write_secs = last_write.duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;

    assert!(wait_for(Duration::from_secs(10), || commit_count(repo_dir.path()) >= 1));
    std::thread::sleep(Duration::from_secs(3));
    assert_eq!(commit_count(repo_dir.path()), 1);

    // Committed once the writes stopped, not while they were landing
    assert_eq!(
        head_file(repo_dir.path(), "draft.txt").as_deref(),
        Some(&b"revision 14\n"[..])
    );
    let committed_at = head_commit_time(repo_dir.path()).unwrap();
    assert!(
        committed_at >= last_write_secs && committed_at <= last_write_secs + 3,
        "committed at {committed_at}, last write at {last_write_secs}"
    );
}

#[test]
fn test_missing_root_is_picked_up_when_created() {
    let lock_dir = TempDir::new().unwrap();
    let parent = TempDir::new().unwrap();
    let repo_path = parent.path().join("later");

    let mut gwatch = GwatchProcess::spawn(
        lock_dir.path(),
        &["-r", repo_path.to_str().unwrap(), "-t", "1"],
    )
    .unwrap();
    std::thread::sleep(STARTUP);
    assert!(gwatch.is_running());

    Repository::init(&repo_path).unwrap();
    fs::write(repo_path.join("first.txt"), "appeared").unwrap();

    assert!(wait_for(Duration::from_secs(10), || commit_count(&repo_path) >= 1));
    assert!(gwatch.is_running());
}

// Lock directory follows XDG_RUNTIME_DIR only on Linux
#[cfg(target_os = "linux")]
#[test]
fn test_second_instance_on_same_repo_fails() {
    let lock_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    Repository::init(repo_dir.path()).unwrap();

    let repo_arg = repo_dir.path().to_str().unwrap();
    let _first = GwatchProcess::spawn(lock_dir.path(), &["-r", repo_arg]).unwrap();
    assert!(wait_for(Duration::from_secs(5), || lock_files(lock_dir.path()) == 1));

    let result = GwatchCommand::new(lock_dir.path())
        .args(&["-r", repo_arg])
        .assert_failure()
        .unwrap();

    assert!(
        result.contains_stderr("Another gwatch instance"),
        "stderr: {}",
        result.stderr
    );
}

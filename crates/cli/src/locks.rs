//! Single-instance lock per watched repository
//!
//! The lock file lives in a per-user directory and is named after a hash of
//! the repository's absolute path, so two watchers never commit into the
//! same tree. The flock is the lock; the JSON body only identifies the
//! owner so a lock left behind by a dead process can be reclaimed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Held for the life of the watcher; removes its file on drop
pub struct InstanceLock {
    path: PathBuf,
    // Closing this descriptor releases the flock
    _file: File,
}

#[derive(Debug, Serialize, Deserialize)]
struct Owner {
    pid: u32,
    started_at: u64,
    repo: PathBuf,
}

/// Who holds a lock we failed to take
#[derive(Debug, PartialEq, Eq)]
enum Holder {
    /// Locked but the owner has not written its record yet
    Starting,
    Alive(u32),
    /// Recorded owner is gone, or the record is garbage
    Gone,
}

impl InstanceLock {
    /// Take the lock for `repo` inside `lock_dir`.
    ///
    /// Fails when another live gwatch process watches the same repository.
    pub fn acquire(lock_dir: &Path, repo: &Path) -> Result<Self> {
        std::fs::create_dir_all(lock_dir).with_context(|| {
            format!("Failed to create lock directory {}", lock_dir.display())
        })?;

        let repo = std::path::absolute(repo)
            .with_context(|| format!("Cannot resolve {}", repo.display()))?;
        let path = lock_dir.join(lock_file_name(&repo));

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;

        if !try_flock_exclusive(&file)? {
            match inspect_holder(&mut file) {
                Holder::Gone => {
                    tracing::warn!("Removing stale lock {}", path.display());
                    drop(file);
                    std::fs::remove_file(&path)?;
                    return Self::acquire(lock_dir, &repo);
                }
                Holder::Alive(pid) => anyhow::bail!(
                    "Another gwatch instance (pid {}) is already watching {}",
                    pid,
                    repo.display()
                ),
                Holder::Starting => anyhow::bail!(
                    "Another gwatch instance is already watching {}",
                    repo.display()
                ),
            }
        }

        write_owner(&mut file, &repo)?;
        tracing::debug!("Acquired lock {}", path.display());

        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop the lock now and report a failure to remove its file
    pub fn release(self) -> Result<()> {
        std::fs::remove_file(&self.path).context("Failed to remove lock file")
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Per-user directory holding the lock files
pub fn default_lock_dir() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("gwatch")
        .join("locks")
}

/// `<first 16 hex chars of blake3(path)>.lock`
pub fn lock_file_name(repo: &Path) -> String {
    let hash = blake3::hash(repo.as_os_str().as_encoded_bytes());
    format!("{}.lock", &hash.to_hex()[..16])
}

fn inspect_holder(file: &mut File) -> Holder {
    let mut body = String::new();
    if file.seek(SeekFrom::Start(0)).is_err() || file.read_to_string(&mut body).is_err() {
        return Holder::Gone;
    }

    // The winner truncates and writes after taking the flock, so an empty
    // body under a held flock is a watcher still starting up
    if body.trim().is_empty() {
        return Holder::Starting;
    }

    match serde_json::from_str::<Owner>(&body) {
        Ok(owner) if is_process_alive(owner.pid) => Holder::Alive(owner.pid),
        _ => Holder::Gone,
    }
}

fn write_owner(file: &mut File, repo: &Path) -> Result<()> {
    let owner = Owner {
        pid: std::process::id(),
        started_at: unix_millis(),
        repo: repo.to_path_buf(),
    };
    let body = serde_json::to_vec(&owner).context("Failed to serialize lock owner")?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&body)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(()) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e).context("flock failed"),
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> Result<bool> {
    Ok(true)
}

#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(target_os = "macos")]
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Null signal: existence check only; EPERM still means it exists
    !matches!(
        kill(Pid::from_raw(pid as i32), None),
        Err(nix::errno::Errno::ESRCH)
    )
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn is_process_alive(_pid: u32) -> bool {
    true
}

fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

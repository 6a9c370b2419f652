//! Single-instance lock.
//!
//! The lock is a file created with exclusive-create semantics and holding
//! the owner's PID. A lock naming a dead (or unparseable) PID is stale and is
//! reclaimed with a single retry.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use tracing::{debug, info, warn};

use crate::error::{ServerError, ServerResult};

/// An acquired instance lock.
///
/// Released by [`InstanceLock::release`] or on drop.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    held: bool,
}

impl InstanceLock {
    /// Acquires the lock at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyRunning`] when a live process holds the
    /// lock, or an IO error if the lock file cannot be written.
    pub fn acquire(path: impl Into<PathBuf>) -> ServerResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let file = match Self::try_create(&path)? {
            Some(file) => file,
            None => {
                Self::reclaim_if_stale(&path)?;
                match Self::try_create(&path)? {
                    Some(file) => file,
                    None => {
                        let pid = read_holder(&path).unwrap_or_default();
                        return Err(ServerError::already_running(path.to_string_lossy(), pid));
                    }
                }
            }
        };

        let pid = process::id();
        let mut lock = Self { path, held: true };
        if let Err(e) = write_pid(file, pid) {
            lock.release();
            return Err(e.into());
        }

        info!(path = %lock.path.display(), pid, "Acquired instance lock");
        Ok(lock)
    }

    /// Returns the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true until the lock has been released.
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Releases the lock and removes the lock file.
    ///
    /// Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        self.held = false;

        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Released instance lock"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove lock file"
            ),
        }
    }

    /// Attempts the exclusive create. `Ok(None)` means the file exists.
    fn try_create(path: &Path) -> ServerResult<Option<File>> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the lock file if its holder is gone.
    fn reclaim_if_stale(path: &Path) -> ServerResult<()> {
        match read_holder(path) {
            Some(pid) if is_process_running(pid) => {
                Err(ServerError::already_running(path.to_string_lossy(), pid))
            }
            holder => {
                warn!(
                    path = %path.display(),
                    pid = ?holder,
                    "Removing stale lock file"
                );
                match fs::remove_file(path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(e.into()),
                }
            }
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn write_pid(mut file: File, pid: u32) -> io::Result<()> {
    writeln!(file, "{}", pid)?;
    file.sync_all()
}

/// Reads the PID recorded in a lock file.
///
/// Returns `None` if the file is missing or does not hold a valid PID.
pub fn read_holder(path: &Path) -> Option<u32> {
    fs::read_to_string(path)
        .ok()
        .and_then(|contents| contents.trim().parse::<u32>().ok())
        .filter(|pid| *pid != 0)
}

/// Checks if a process with the given PID is running.
#[cfg(unix)]
pub fn is_process_running(pid: u32) -> bool {
    // 0 and negative values address process groups, never a single holder.
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // Signal 0 probes for existence; EPERM means it exists under another user.
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Checks if a process with the given PID is running (non-Unix).
#[cfg(not(unix))]
pub fn is_process_running(_pid: u32) -> bool {
    // No reliable check; treat the holder as alive.
    true
}

/// Returns the default lock file path.
///
/// Uses `$XDG_RUNTIME_DIR/onair.lock` if available,
/// otherwise falls back to `/tmp/onair-$UID.lock`.
pub fn default_lock_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(runtime_dir).join("onair.lock")
    } else {
        #[cfg(unix)]
        let uid = unsafe { libc::getuid() };
        #[cfg(not(unix))]
        let uid = 0;
        std::env::temp_dir().join(format!("onair-{}.lock", uid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_writes_pid_and_drop_removes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("onair.lock");

        {
            let lock = InstanceLock::acquire(&path).unwrap();
            assert!(lock.is_held());
            assert_eq!(read_holder(&path), Some(process::id()));
        }

        assert!(!path.exists());
    }

    #[test]
    fn live_holder_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("onair.lock");

        let _first = InstanceLock::acquire(&path).unwrap();
        let second = InstanceLock::acquire(&path);
        match second {
            Err(ServerError::AlreadyRunning { pid, .. }) => assert_eq!(pid, process::id()),
            other => panic!("expected AlreadyRunning, got {other:?}"),
        }
        // The holder's lock file survives the failed attempt.
        assert_eq!(read_holder(&path), Some(process::id()));
    }

    #[test]
    fn stale_lock_is_reclaimed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("onair.lock");

        fs::write(&path, "999999999\n").unwrap();

        let lock = InstanceLock::acquire(&path).unwrap();
        assert_eq!(read_holder(&path), Some(process::id()));
        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn garbage_lock_is_reclaimed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("onair.lock");

        fs::write(&path, "not-a-pid\n").unwrap();

        let _lock = InstanceLock::acquire(&path).unwrap();
        assert_eq!(read_holder(&path), Some(process::id()));
    }

    #[test]
    fn release_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("onair.lock");

        let mut lock = InstanceLock::acquire(&path).unwrap();
        lock.release();
        lock.release();
        assert!(!lock.is_held());
        assert!(!path.exists());
        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn release_does_not_touch_other_holders_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("onair.lock");

        let mut lock = InstanceLock::acquire(&path).unwrap();
        lock.release();
        // Another instance now owns the path.
        fs::write(&path, "1\n").unwrap();
        lock.release();
        assert!(path.exists());
    }

    #[test]
    fn creates_missing_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run").join("onair.lock");
        let _lock = InstanceLock::acquire(&path).unwrap();
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn process_liveness() {
        assert!(is_process_running(process::id()));
        assert!(!is_process_running(0));
        assert!(!is_process_running(u32::MAX));
        assert!(!is_process_running(999_999_999));
    }

    #[test]
    fn default_lock_path_format() {
        let path = default_lock_path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("onair"));
        assert!(name.ends_with(".lock"));
    }
}

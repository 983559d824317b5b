//! Exclusive lock around a store's load-mutate-save cycle.
//!
//! Threads of one process are serialized by a mutex. In `LockMode::File` the
//! holder additionally takes a blocking advisory lock on an empty marker file,
//! which serializes other processes on the same machine. There is no timeout:
//! a holder that never releases blocks every later caller.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

use crate::types::config::LockMode;
use crate::types::errors::StoreError;

/// Named exclusive lock resource.
pub struct StoreLock {
    path: PathBuf,
    mode: LockMode,
    local: Mutex<()>,
}

/// Held ownership of a `StoreLock`; released on drop.
pub struct StoreLockGuard<'a> {
    // Field order matters: the file lock is released before the mutex.
    _file: Option<File>,
    _local: MutexGuard<'a, ()>,
}

impl StoreLock {
    pub fn new<P: Into<PathBuf>>(path: P, mode: LockMode) -> Self {
        Self {
            path: path.into(),
            mode,
            local: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Blocks until the lock is owned by the caller.
    ///
    /// # Errors
    /// Returns `StoreError::Lock` if the marker file cannot be opened or locked.
    pub fn acquire(&self) -> Result<StoreLockGuard<'_>, StoreError> {
        // A panic inside another holder leaves no partial state behind: the
        // data lives on disk and every write is atomic.
        let local = self.local.lock().unwrap_or_else(PoisonError::into_inner);
        let file = match self.mode {
            LockMode::Process => None,
            LockMode::File => Some(lock_marker(&self.path)?),
        };
        tracing::debug!(path = %self.path.display(), mode = ?self.mode, "store lock acquired");
        Ok(StoreLockGuard {
            _file: file,
            _local: local,
        })
    }

    /// Runs `f` while holding the lock.
    pub fn with_lock<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> Result<T, StoreError>,
    {
        let _guard = self.acquire()?;
        f()
    }
}

fn lock_marker(path: &Path) -> Result<File, StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::Lock(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|e| StoreError::Lock(format!("Failed to open {}: {}", path.display(), e)))?;
    flock_exclusive(&file).map_err(|e| StoreError::Lock(format!("Failed to lock {}: {}", path.display(), e)))?;
    Ok(file)
}

#[cfg(unix)]
fn flock_exclusive(file: &File) -> std::io::Result<()> {
    loop {
        // SAFETY: the descriptor is owned by `file` and stays open for the call.
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if result == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(not(unix))]
fn flock_exclusive(_file: &File) -> std::io::Result<()> {
    // No advisory locking on this platform; the in-process mutex still applies.
    Ok(())
}

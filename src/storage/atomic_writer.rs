//! Atomic replacement of the records file.
//!
//! Content is staged in a temporary file next to the target, synced, and then
//! renamed over the target in one step, so a reader only ever observes the old
//! file or the new one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::types::errors::StoreError;
use crate::types::record::Record;

/// Serializes a record collection the way it is stored on disk.
pub fn serialize_records(records: &[Record]) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(records)
        .map_err(|e| StoreError::Serialization(format!("Failed to serialize records: {}", e)))
}

/// Parses an on-disk record collection.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<Record>, StoreError> {
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Serialization(format!("Failed to parse records: {}", e)))
}

/// Reads and parses a records file. `Ok(None)` means the file does not exist.
pub fn read_records(path: &Path) -> Result<Option<Vec<Record>>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => parse_records(&bytes).map(Some),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::Io(format!("Failed to read {}: {}", path.display(), e))),
    }
}

/// Writes whole files by temp-file-then-rename.
pub struct AtomicWriter {
    target: PathBuf,
}

/// A fully written and synced temporary file that has not replaced the target
/// yet. Dropping it discards the temporary file and leaves the target as it was.
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl AtomicWriter {
    pub fn new<P: Into<PathBuf>>(target: P) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Serializes `records` and atomically replaces the target with them.
    ///
    /// # Errors
    /// Returns `StoreError` if serialization, the temporary write, the sync or
    /// the rename fails. The target is untouched in every error case.
    pub fn write(&self, records: &[Record]) -> Result<(), StoreError> {
        let bytes = serialize_records(records)?;
        self.write_bytes(&bytes)
    }

    /// Atomically replaces the target with `bytes`.
    pub fn write_bytes(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.stage(bytes)?.commit()
    }

    /// Writes `bytes` to a synced temporary file in the target's directory
    /// without touching the target.
    pub fn stage(&self, bytes: &[u8]) -> Result<StagedWrite, StoreError> {
        let dir = parent_dir(&self.target);
        fs::create_dir_all(dir)
            .map_err(|e| StoreError::Io(format!("Failed to create {}: {}", dir.display(), e)))?;

        let mut temp = tempfile::Builder::new()
            .prefix(&temp_prefix(&self.target))
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| StoreError::Io(format!("Failed to create temp file: {}", e)))?;

        temp.write_all(bytes)
            .and_then(|_| temp.flush())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| StoreError::Io(format!("Failed to write temp file: {}", e)))?;

        Ok(StagedWrite {
            temp,
            target: self.target.clone(),
        })
    }

    /// Removes temporary files left behind by a process that died between
    /// staging and renaming. Returns how many were removed.
    pub fn sweep_stale_temps(&self) -> usize {
        let dir = parent_dir(&self.target);
        let prefix = temp_prefix(&self.target);
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&prefix) && name.ends_with(".tmp") && fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::warn!(dir = %dir.display(), removed, "removed stale temp files from an interrupted write");
        }
        removed
    }
}

impl StagedWrite {
    /// Renames the staged file over the target and syncs the directory entry.
    pub fn commit(self) -> Result<(), StoreError> {
        let dir = parent_dir(&self.target).to_path_buf();
        self.temp
            .persist(&self.target)
            .map_err(|e| StoreError::Io(format!("Failed to replace {}: {}", self.target.display(), e.error)))?;
        sync_dir(&dir)
    }

    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn temp_prefix(target: &Path) -> String {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "records".to_string());
    format!(".{}.", name)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), StoreError> {
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| StoreError::Io(format!("Failed to sync {}: {}", dir.display(), e)))
}

// Directory handles cannot be synced here; the rename itself is still atomic.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), StoreError> {
    Ok(())
}

//! Single-generation backup of the records file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::storage::atomic_writer::{parse_records, read_records, AtomicWriter};
use crate::types::errors::StoreError;
use crate::types::record::{Record, SaveIntent};

/// Keeps one prior committed generation next to the records file and restores
/// it when a read or a commit looks like data loss.
pub struct BackupGuard {
    target: PathBuf,
    backup: PathBuf,
}

impl BackupGuard {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(target: P, backup: Q) -> Self {
        Self {
            target: target.into(),
            backup: backup.into(),
        }
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Copies the current committed file into the backup slot, replacing the
    /// previous generation. The target itself is left in place, so it stays
    /// valid until the new content is renamed over it.
    ///
    /// A target that does not parse is not copied: it would overwrite a good
    /// generation with a bad one.
    pub fn before_save(&self) -> Result<(), StoreError> {
        let bytes = match fs::read(&self.target) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StoreError::Io(format!(
                    "Failed to read {} for backup: {}",
                    self.target.display(),
                    e
                )))
            }
        };
        if let Err(e) = parse_records(&bytes) {
            tracing::warn!(error = %e, "current records file is unreadable; keeping previous backup");
            return Ok(());
        }
        AtomicWriter::new(&self.backup).write_bytes(&bytes)
    }

    /// Validates a finished commit.
    ///
    /// An empty commit whose intent does not allow emptiness is treated as a
    /// bug: the backup is restored over the target and returned. An allowed
    /// empty commit purges the backup so a later read cannot resurrect it.
    pub fn restore_if_needed(&self, committed: Vec<Record>, intent: SaveIntent) -> Result<Vec<Record>, StoreError> {
        if !committed.is_empty() {
            return Ok(committed);
        }
        if intent.allows_empty() {
            self.purge()?;
            return Ok(committed);
        }
        match self.read_backup() {
            Some(records) if !records.is_empty() => {
                tracing::warn!(
                    ?intent,
                    restored = records.len(),
                    "empty commit was not allowed; restoring backup"
                );
                AtomicWriter::new(&self.target).write(&records)?;
                Ok(records)
            }
            _ => {
                tracing::warn!(?intent, "empty commit was not allowed but no usable backup exists");
                Ok(committed)
            }
        }
    }

    /// Read-time recovery: promotes the backup over a missing, unreadable or
    /// empty records file. Falls back to an empty collection.
    pub fn restore_on_read_failure(&self) -> Vec<Record> {
        let records = match self.read_backup() {
            Some(records) if !records.is_empty() => records,
            _ => {
                tracing::debug!(backup = %self.backup.display(), "no usable backup; store is empty");
                return Vec::new();
            }
        };
        tracing::warn!(restored = records.len(), "promoting backup over records file");
        if let Err(e) = AtomicWriter::new(&self.target).write(&records) {
            // The records are still served; the next successful save rewrites the file.
            tracing::warn!(error = %e, "failed to promote backup");
        }
        records
    }

    /// Deletes the backup generation.
    pub fn purge(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.backup) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(format!(
                "Failed to remove {}: {}",
                self.backup.display(),
                e
            ))),
        }
    }

    fn read_backup(&self) -> Option<Vec<Record>> {
        match read_records(&self.backup) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "backup is unreadable");
                None
            }
        }
    }
}

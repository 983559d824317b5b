//! Record store façade: lock, backup guard and atomic writer combined.
//!
//! Every mutation is a whole-collection transaction: load everything,
//! transform in memory, write everything back.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::atomic_writer::{read_records, AtomicWriter};
use crate::storage::backup::BackupGuard;
use crate::storage::lock::StoreLock;
use crate::types::config::StoreConfig;
use crate::types::errors::StoreError;
use crate::types::record::{Record, SaveIntent};

/// Durable, single-file record collection.
pub struct RecordStore {
    path: PathBuf,
    writer: AtomicWriter,
    guard: BackupGuard,
    lock: StoreLock,
}

impl RecordStore {
    /// Opens the store described by `config`, creating the data directory.
    /// The records file itself is created lazily by the first save.
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the data directory cannot be created.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        fs::create_dir_all(&config.data_dir).map_err(|e| {
            StoreError::Io(format!("Failed to create {}: {}", config.data_dir.display(), e))
        })?;
        let path = config.records_path();
        let store = Self {
            writer: AtomicWriter::new(&path),
            guard: BackupGuard::new(&path, config.backup_path()),
            lock: StoreLock::new(config.lock_path(), config.lock_mode),
            path,
        };
        store.lock.with_lock(|| {
            store.writer.sweep_stale_temps();
            Ok(())
        })?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        self.guard.backup_path()
    }

    /// Returns the committed collection, recovering from the backup if the
    /// records file is missing, unreadable or empty.
    pub fn load(&self) -> Result<Vec<Record>, StoreError> {
        self.lock.with_lock(|| Ok(self.load_unlocked()))
    }

    /// Commits `records` as the new collection and returns what was actually
    /// committed, which is the restored backup when an unexpected empty
    /// commit was overridden.
    ///
    /// # Errors
    /// Returns `StoreError` if the write fails; the previous file is intact.
    pub fn save(&self, records: Vec<Record>, intent: SaveIntent) -> Result<Vec<Record>, StoreError> {
        self.lock.with_lock(|| self.save_unlocked(records, intent))
    }

    /// Runs one load-mutate-save cycle under a single lock acquisition.
    ///
    /// If `mutate` fails nothing is written. Returns the closure's value and
    /// the committed collection.
    pub fn transact<T, F>(&self, intent: SaveIntent, mutate: F) -> Result<(T, Vec<Record>), StoreError>
    where
        F: FnOnce(&mut Vec<Record>) -> Result<T, StoreError>,
    {
        self.lock.with_lock(|| {
            let mut records = self.load_unlocked();
            let out = mutate(&mut records)?;
            let committed = self.save_unlocked(records, intent)?;
            Ok((out, committed))
        })
    }

    fn load_unlocked(&self) -> Vec<Record> {
        match read_records(&self.path) {
            Ok(Some(records)) if !records.is_empty() => records,
            Ok(Some(_)) => self.guard.restore_on_read_failure(),
            Ok(None) => {
                tracing::debug!(path = %self.path.display(), "records file missing");
                self.guard.restore_on_read_failure()
            }
            Err(e) => {
                tracing::warn!(error = %e, "records file unreadable; attempting recovery");
                self.guard.restore_on_read_failure()
            }
        }
    }

    fn save_unlocked(&self, records: Vec<Record>, intent: SaveIntent) -> Result<Vec<Record>, StoreError> {
        check_unique_ids(&records)?;
        self.guard.before_save()?;
        self.writer.write(&records)?;
        let committed = self.guard.restore_if_needed(records, intent)?;
        tracing::debug!(records = committed.len(), ?intent, "store committed");
        Ok(committed)
    }
}

fn check_unique_ids(records: &[Record]) -> Result<(), StoreError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if record.id == 0 {
            return Err(StoreError::InvalidInput("record id must be positive".to_string()));
        }
        if !seen.insert(record.id) {
            return Err(StoreError::InvalidInput(format!("duplicate record id {}", record.id)));
        }
    }
    Ok(())
}

//! Keeps the search mirror in step with the record store.
//!
//! Per-record pushes are best-effort: a failing mirror is logged and the
//! caller's store operation stands. A full rebuild repairs any drift.

use std::sync::Arc;

use crate::services::search_mirror::SearchMirror;
use crate::types::errors::MirrorError;
use crate::types::record::Record;
use crate::types::search::SearchCriteria;

/// One delta to apply to the mirror.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOp {
    Upsert(Record),
    Delete(u64),
    RebuildAll(Vec<Record>),
}

/// Sync component over an injected `SearchMirror`.
pub struct MirrorSync {
    mirror: Arc<dyn SearchMirror>,
    page_size: usize,
}

impl MirrorSync {
    pub fn new(mirror: Arc<dyn SearchMirror>, page_size: usize) -> Self {
        Self {
            mirror,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn mirror(&self) -> &Arc<dyn SearchMirror> {
        &self.mirror
    }

    /// Pushes a changed record. Failures are logged, never returned.
    pub fn upsert(&self, record: &Record) {
        if let Err(e) = self.mirror.upsert(record) {
            tracing::warn!(id = record.id, error = %e, "search mirror upsert failed");
        }
    }

    /// Drops a deleted record. Failures are logged, never returned.
    pub fn delete(&self, id: u64) {
        if let Err(e) = self.mirror.delete(id) {
            tracing::warn!(id, error = %e, "search mirror delete failed");
        }
    }

    /// Clears the mirror and reinserts `records`.
    pub fn rebuild_all(&self, records: &[Record]) -> Result<(), MirrorError> {
        self.mirror.rebuild_all(records)?;
        tracing::info!(documents = records.len(), "search mirror rebuilt");
        Ok(())
    }

    /// Applies a queued delta; a failed rebuild is logged like any other push.
    pub fn apply(&self, op: SyncOp) {
        match op {
            SyncOp::Upsert(record) => self.upsert(&record),
            SyncOp::Delete(id) => self.delete(id),
            SyncOp::RebuildAll(records) => {
                if let Err(e) = self.rebuild_all(&records) {
                    tracing::warn!(error = %e, "search mirror rebuild failed");
                }
            }
        }
    }

    /// Rebuilds when the mirror's document count differs from the store's
    /// record count. Returns whether a rebuild happened. Drifted values with
    /// an equal count are left as they are; `rebuild_all` repairs them.
    pub fn reconcile(&self, records: &[Record]) -> Result<bool, MirrorError> {
        let indexed = self.mirror.count()?;
        if indexed == records.len() {
            tracing::debug!(documents = indexed, "search mirror in sync");
            return Ok(false);
        }
        tracing::info!(
            indexed,
            stored = records.len(),
            "search mirror count differs from store; rebuilding"
        );
        self.rebuild_all(records)?;
        Ok(true)
    }

    /// Ordered ids for normalized `criteria`, capped at the page size.
    pub fn search(&self, criteria: &SearchCriteria) -> Result<Vec<u64>, MirrorError> {
        self.mirror.search(criteria, self.page_size)
    }
}

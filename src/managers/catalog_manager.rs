//! Catalog Manager for linkshelf.
//!
//! Implements `CatalogManagerTrait`: the bookmark mutations and queries,
//! each mutation a single locked load-mutate-save transaction on the record
//! store followed by a best-effort push to the search mirror.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};

use crate::services::mirror_sync::{MirrorSync, SyncOp};
use crate::services::sync_worker::SyncSender;
use crate::storage::RecordStore;
use crate::types::config::StoreConfig;
use crate::types::errors::StoreError;
use crate::types::page::PageMetadata;
use crate::types::record::{next_id, Record, RecordInput, SaveIntent};
use crate::types::search::SearchCriteria;

/// Trait defining catalog operations.
pub trait CatalogManagerTrait {
    fn add(&self, input: &RecordInput, page: PageMetadata) -> Result<Record, StoreError>;
    fn edit(&self, id: u64, input: &RecordInput, page: PageMetadata) -> Result<Record, StoreError>;
    fn like(&self, id: u64) -> Result<u64, StoreError>;
    fn unlike(&self, id: u64) -> Result<u64, StoreError>;
    fn delete(&self, id: u64) -> Result<(), StoreError>;
    /// Removes every record with zero likes. Returns how many were removed.
    fn remove_unliked(&self) -> Result<usize, StoreError>;
    /// Removes every record.
    fn clear(&self) -> Result<usize, StoreError>;
    fn get(&self, id: u64) -> Result<Record, StoreError>;
    fn list(&self) -> Result<Vec<Record>, StoreError>;
    fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Record>, StoreError>;
}

/// Catalog over a record store and its search mirror.
pub struct CatalogManager {
    store: RecordStore,
    sync: Arc<MirrorSync>,
    queue: Option<SyncSender>,
    config: StoreConfig,
}

impl CatalogManager {
    /// Creates a catalog that pushes mirror deltas inline.
    pub fn new(store: RecordStore, sync: Arc<MirrorSync>, config: StoreConfig) -> Self {
        Self {
            store,
            sync,
            queue: None,
            config,
        }
    }

    /// Routes mirror deltas through a background sync worker.
    pub fn with_queue(mut self, queue: SyncSender) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Startup check: rebuilds the mirror when its document count differs from
    /// the store's. Mirror failures are logged. Returns whether a rebuild ran.
    ///
    /// Stale field values with matching counts are not detected, e.g. two
    /// concurrent likes whose deltas reach the mirror out of order. Use
    /// `rebuild_mirror` (`mirror.rebuild` over RPC) to repair those.
    pub fn reconcile(&self) -> Result<bool, StoreError> {
        let records = self.store.load()?;
        match self.sync.reconcile(&records) {
            Ok(rebuilt) => Ok(rebuilt),
            Err(e) => {
                tracing::warn!(error = %e, "search mirror reconciliation failed");
                Ok(false)
            }
        }
    }

    /// Clears and refills the mirror from the store, synchronously.
    pub fn rebuild_mirror(&self) -> Result<usize, StoreError> {
        let records = self.store.load()?;
        if let Err(e) = self.sync.rebuild_all(&records) {
            tracing::warn!(error = %e, "search mirror rebuild failed");
        }
        Ok(records.len())
    }

    /// Today's date on the configured calendar, `YYYY-MM-DD`.
    fn today(&self) -> String {
        let offset = FixedOffset::east_opt(self.config.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix());
        Utc::now().with_timezone(&offset).format("%Y-%m-%d").to_string()
    }

    fn push(&self, op: SyncOp) {
        if let Some(queue) = &self.queue {
            if queue.submit(op.clone()) {
                return;
            }
            tracing::debug!("sync worker stopped; applying mirror delta inline");
        }
        self.sync.apply(op);
    }

    fn find_mut(records: &mut [Record], id: u64) -> Result<&mut Record, StoreError> {
        records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    /// Store-side search used when the mirror cannot answer.
    fn search_in_memory(&self, records: Vec<Record>, criteria: &SearchCriteria) -> Vec<Record> {
        let mut hits: Vec<(usize, Record)> = records
            .into_iter()
            .filter(|r| criteria.matches(r))
            .map(|r| (criteria.relevance(&r), r))
            .collect();
        hits.sort_by(|(ra, a), (rb, b)| {
            rb.cmp(ra)
                .then(b.rating.total_cmp(&a.rating))
                .then(a.id.cmp(&b.id))
        });
        hits.into_iter()
            .take(self.sync.page_size())
            .map(|(_, r)| r)
            .collect()
    }
}

impl CatalogManagerTrait for CatalogManager {
    /// Appends a new record with the next id.
    fn add(&self, input: &RecordInput, page: PageMetadata) -> Result<Record, StoreError> {
        let input = input.normalize(&self.config)?;
        let created_date = self.today();
        let (record, _) = self.store.transact(SaveIntent::Append, |records| {
            let record = Record {
                id: next_id(records)?,
                url: input.url,
                title: page.title,
                comment: input.comment,
                rating: input.rating,
                likes: 0,
                tags: input.tags,
                author: input.author,
                created_date,
                thumbnail: page.thumbnail,
                fetch_failed: page.fetch_failed,
            };
            records.push(record.clone());
            Ok(record)
        })?;
        tracing::debug!(id = record.id, "record added");
        self.push(SyncOp::Upsert(record.clone()));
        Ok(record)
    }

    /// Replaces the editable fields of a record. `id`, `created_date`,
    /// `likes` and `author` are kept.
    fn edit(&self, id: u64, input: &RecordInput, page: PageMetadata) -> Result<Record, StoreError> {
        let input = input.normalize(&self.config)?;
        let (record, _) = self.store.transact(SaveIntent::Update, |records| {
            let record = Self::find_mut(records, id)?;
            record.url = input.url;
            record.title = page.title;
            record.thumbnail = page.thumbnail;
            record.fetch_failed = page.fetch_failed;
            record.comment = input.comment;
            record.rating = input.rating;
            record.tags = input.tags;
            Ok(record.clone())
        })?;
        self.push(SyncOp::Upsert(record.clone()));
        Ok(record)
    }

    fn like(&self, id: u64) -> Result<u64, StoreError> {
        let (record, _) = self.store.transact(SaveIntent::Update, |records| {
            let record = Self::find_mut(records, id)?;
            record.likes += 1;
            Ok(record.clone())
        })?;
        let likes = record.likes;
        self.push(SyncOp::Upsert(record));
        Ok(likes)
    }

    /// Takes back a like; never goes below zero.
    fn unlike(&self, id: u64) -> Result<u64, StoreError> {
        let (record, _) = self.store.transact(SaveIntent::Update, |records| {
            let record = Self::find_mut(records, id)?;
            record.likes = record.likes.saturating_sub(1);
            Ok(record.clone())
        })?;
        let likes = record.likes;
        self.push(SyncOp::Upsert(record));
        Ok(likes)
    }

    fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.store.transact(SaveIntent::DeleteOne, |records| {
            let before = records.len();
            records.retain(|r| r.id != id);
            if records.len() == before {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })?;
        self.push(SyncOp::Delete(id));
        Ok(())
    }

    /// A cleanup that would leave the catalog empty is refused by the backup
    /// guard, so the reported count reflects what was actually committed.
    fn remove_unliked(&self) -> Result<usize, StoreError> {
        let (before, committed) = self.store.transact(SaveIntent::Cleanup, |records| {
            let before = records.len();
            records.retain(|r| r.likes > 0);
            Ok(before)
        })?;
        let removed = before.saturating_sub(committed.len());
        tracing::info!(removed, remaining = committed.len(), "removed unliked records");
        self.push(SyncOp::RebuildAll(committed));
        Ok(removed)
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let (removed, committed) = self.store.transact(SaveIntent::DeleteAll, |records| {
            let removed = records.len();
            records.clear();
            Ok(removed)
        })?;
        tracing::info!(removed, "catalog cleared");
        self.push(SyncOp::RebuildAll(committed));
        Ok(removed)
    }

    fn get(&self, id: u64) -> Result<Record, StoreError> {
        self.store
            .load()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self) -> Result<Vec<Record>, StoreError> {
        self.store.load()
    }

    /// Asks the mirror for ordered ids and resolves them against the store.
    /// Ids the store no longer has are skipped. If the mirror fails, the same
    /// criteria are evaluated over the store directly.
    fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Record>, StoreError> {
        let criteria = criteria
            .normalized()
            .map_err(|e| StoreError::InvalidInput(e.to_string()))?;
        let records = self.store.load()?;
        match self.sync.search(&criteria) {
            Ok(ids) => {
                let mut by_id: HashMap<u64, Record> =
                    records.into_iter().map(|r| (r.id, r)).collect();
                Ok(ids.into_iter().filter_map(|id| by_id.remove(&id)).collect())
            }
            Err(e) => {
                tracing::warn!(error = %e, "search mirror query failed; searching the store");
                Ok(self.search_in_memory(records, &criteria))
            }
        }
    }
}

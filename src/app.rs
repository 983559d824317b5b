//! App Core for linkshelf.
//!
//! Central struct holding the catalog, the search mirror sync worker and the
//! page fetcher, managing application lifecycle.

use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::database::connection::Database;
use crate::managers::catalog_manager::CatalogManager;
use crate::services::mirror_sync::MirrorSync;
use crate::services::page_fetcher::PageFetcher;
use crate::services::search_mirror::SqliteSearchMirror;
use crate::services::sync_worker::SyncHandle;
use crate::storage::RecordStore;
use crate::types::config::StoreConfig;
use crate::types::page::PageMetadata;

/// Central application struct.
///
/// Requests are served synchronously; the owned runtime drives page fetches
/// and the background mirror sync worker.
pub struct App {
    pub config: StoreConfig,
    pub catalog: CatalogManager,
    fetcher: Arc<dyn PageFetcher>,
    runtime: Runtime,
    sync_handle: Option<SyncHandle>,
}

impl App {
    /// Creates a new App with the default page fetcher: HTTP when the
    /// `network` feature is enabled, offline otherwise.
    pub fn new(config: StoreConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let fetcher = default_fetcher(&config)?;
        Self::with_fetcher(config, fetcher)
    }

    /// Creates a new App using `fetcher` for page metadata.
    pub fn with_fetcher(
        config: StoreConfig,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;
        let store = RecordStore::open(&config)?;

        let db = Database::open(config.mirror_path())
            .map_err(|e| format!("search mirror init failed: {}", e))?;
        let mirror = Arc::new(SqliteSearchMirror::new(db));
        let sync = Arc::new(MirrorSync::new(mirror, config.effective_page_size()));

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let sync_handle = {
            let _guard = runtime.enter();
            SyncHandle::spawn(sync.clone())
        };

        let catalog = CatalogManager::new(store, sync, config.clone()).with_queue(sync_handle.sender());

        Ok(Self {
            config,
            catalog,
            fetcher,
            runtime,
            sync_handle: Some(sync_handle),
        })
    }

    /// Startup sequence: reconcile the search mirror with the store.
    pub fn startup(&mut self) {
        match self.catalog.reconcile() {
            Ok(true) => tracing::info!("search mirror rebuilt at startup"),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "startup reconciliation skipped"),
        }
    }

    /// Fetches metadata for `url`. An empty url skips fetching.
    pub fn fetch_page(&self, url: &str) -> PageMetadata {
        let url = url.trim();
        if url.is_empty() {
            return PageMetadata::default();
        }
        self.runtime.block_on(self.fetcher.fetch(url))
    }

    /// Shutdown sequence: drain queued mirror deltas and stop the worker.
    /// Later mutations push to the mirror inline.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.sync_handle.take() {
            let applied = self.runtime.block_on(handle.shutdown());
            tracing::info!(applied, "search mirror sync worker drained");
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(feature = "network")]
fn default_fetcher(config: &StoreConfig) -> Result<Arc<dyn PageFetcher>, Box<dyn std::error::Error>> {
    use crate::services::page_fetcher::HttpPageFetcher;
    Ok(Arc::new(HttpPageFetcher::new(config.fetch_timeout_secs)?))
}

#[cfg(not(feature = "network"))]
fn default_fetcher(_config: &StoreConfig) -> Result<Arc<dyn PageFetcher>, Box<dyn std::error::Error>> {
    use crate::services::page_fetcher::StaticPageFetcher;
    Ok(Arc::new(StaticPageFetcher::new()))
}

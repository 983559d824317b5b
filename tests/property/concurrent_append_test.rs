//! Property-based tests for concurrent appends to one record store.
//!
//! Concurrent writers each run a full load-mutate-save cycle. Whatever the
//! interleaving, every append must survive and ids must stay unique and
//! sequential.

use std::sync::{Arc, Barrier};
use std::thread;

use linkshelf::database::Database;
use linkshelf::managers::catalog_manager::{CatalogManager, CatalogManagerTrait};
use linkshelf::services::mirror_sync::MirrorSync;
use linkshelf::services::search_mirror::{SearchMirror, SqliteSearchMirror};
use linkshelf::storage::RecordStore;
use linkshelf::types::config::{LockMode, StoreConfig};
use linkshelf::types::page::PageMetadata;
use linkshelf::types::record::{next_id, Record, RecordInput, SaveIntent};
use proptest::prelude::*;
use tempfile::TempDir;

fn record(id: u64, writer: usize) -> Record {
    Record {
        id,
        url: format!("https://writer{}.example/{}", writer, id),
        title: String::new(),
        comment: String::new(),
        rating: 5.0,
        likes: 0,
        tags: Vec::new(),
        author: format!("writer{}", writer),
        created_date: "2025-01-01".to_string(),
        thumbnail: None,
        fetch_failed: false,
    }
}

fn assert_sequential(records: &[Record], expected: usize) -> Result<(), TestCaseError> {
    prop_assert_eq!(records.len(), expected);
    let mut ids: Vec<u64> = records.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    let want: Vec<u64> = (1..=expected as u64).collect();
    prop_assert_eq!(ids, want);
    Ok(())
}

// **Property: no lost update across independently opened stores**
//
// *For any* number of writers, each holding its own handle on the same data
// directory (as separate processes would), N appends yield exactly N records
// with ids 1..=N.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn independent_handles_never_lose_appends(
        writers in 2usize..6,
        per_writer in 1usize..5,
    ) {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let config = StoreConfig::with_data_dir(tmp.path());
        let barrier = Arc::new(Barrier::new(writers));

        let handles: Vec<_> = (0..writers)
            .map(|w| {
                let config = config.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let store = RecordStore::open(&config).expect("open failed");
                    barrier.wait();
                    for _ in 0..per_writer {
                        store
                            .transact(SaveIntent::Append, |records| {
                                let id = next_id(records)?;
                                records.push(record(id, w));
                                Ok(())
                            })
                            .expect("append failed");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("writer panicked");
        }

        let store = RecordStore::open(&config).expect("open failed");
        assert_sequential(&store.load().expect("load failed"), writers * per_writer)?;
    }
}

// **Property: no lost update through a shared catalog**
//
// *For any* number of threads sharing one in-process catalog, N adds yield
// N records and the mirror indexes all of them.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn shared_catalog_never_loses_adds(
        threads in 2usize..6,
        per_thread in 1usize..5,
    ) {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let mut config = StoreConfig::with_data_dir(tmp.path());
        config.lock_mode = LockMode::Process;
        let store = RecordStore::open(&config).expect("open failed");
        let mirror = Arc::new(SqliteSearchMirror::new(
            Database::open_in_memory().expect("open_in_memory failed"),
        ));
        let sync = Arc::new(MirrorSync::new(mirror.clone(), 500));
        let catalog = Arc::new(CatalogManager::new(store, sync, config));

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let catalog = catalog.clone();
                thread::spawn(move || {
                    for i in 0..per_thread {
                        let input = RecordInput {
                            url: format!("https://t{}.example/{}", t, i),
                            ..Default::default()
                        };
                        catalog.add(&input, PageMetadata::default()).expect("add failed");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread panicked");
        }

        let total = threads * per_thread;
        assert_sequential(&catalog.list().expect("list failed"), total)?;
        prop_assert_eq!(mirror.count().expect("count failed"), total);
    }
}

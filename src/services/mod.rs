// linkshelf services
// Services provide the supporting machinery: config loading, the search mirror
// and its sync path, and page metadata fetching.

pub mod config_loader;
pub mod mirror_sync;
pub mod page_fetcher;
pub mod search_mirror;
pub mod sync_worker;

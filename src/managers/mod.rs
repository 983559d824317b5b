// linkshelf state managers
// Managers handle stateful operations over the record store.

pub mod catalog_manager;

// linkshelf storage layer
// Atomic whole-file writes, the exclusive lock, the backup guard, and the
// record store façade that combines them.

pub mod atomic_writer;
pub mod backup;
pub mod lock;
pub mod store;

pub use store::RecordStore;

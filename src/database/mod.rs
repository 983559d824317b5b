//! linkshelf search index database.
//!
//! Provides SQLite connection management and the schema of the full-text
//! search mirror.
//!
//! # Usage
//!
//! ```no_run
//! use linkshelf::database::Database;
//!
//! // Open a persistent index
//! let db = Database::open("search.db").expect("failed to open database");
//!
//! // Or use an in-memory index for testing
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//!
//! // Access the underlying connection for queries
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;

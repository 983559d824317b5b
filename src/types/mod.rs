// linkshelf shared type definitions
// Each submodule defines types used across the crate.

pub mod config;
pub mod errors;
pub mod page;
pub mod record;
pub mod search;

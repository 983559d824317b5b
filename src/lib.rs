//! linkshelf: a durable bookmark catalog with a full-text search mirror.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod rpc_handler;
pub mod services;
pub mod storage;
pub mod types;

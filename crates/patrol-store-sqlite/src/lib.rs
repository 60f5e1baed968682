//! SQLite backend for the patrol scheduling engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every patrol mutation runs in a single
//! `BEGIN IMMEDIATE` transaction, which takes the database write lock before
//! the conflict read, so check-then-write is serialised across connections.

mod encode;
mod schema;
mod store;
mod tx;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, StoreOptions};

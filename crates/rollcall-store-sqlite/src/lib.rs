//! SQLite backend for the Rollcall store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. The schema carries the two
//! invariants the rest of the system relies on: the unique
//! (`student_key`, `scan_day`) pair on attendance and the at-most-one-open
//! shift per supervisor.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

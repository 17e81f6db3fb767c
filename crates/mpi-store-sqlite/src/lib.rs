//! SQLite backend for the Master Patient Index.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every write operation executes
//! inside one transaction; the uniqueness invariants are enforced by the
//! schema itself, with application-level pre-checks layered on top for
//! precise errors.

mod encode;
mod fetch;
mod merge;
mod resolve;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;

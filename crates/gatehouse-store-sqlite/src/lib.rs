//! SQLite backend for Gatehouse validation history.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Implements the read side the status
//! reader needs plus the write paths pipeline steps use to record packages,
//! validation sets, validator runs, and issues.

mod encode;
mod input;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use input::{NewPackage, NewValidation, NewValidationSet};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;

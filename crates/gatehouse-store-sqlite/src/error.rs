//! Error type for `gatehouse-store-sqlite`.

use gatehouse_core::package::PackageKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A text column held a value no enum variant maps to.
  #[error("unknown {column} value: {value:?}")]
  UnknownValue { column: &'static str, value: String },

  #[error("package not found: {0}")]
  PackageNotFound(PackageKey),

  #[error("validation set not found: {0}")]
  ValidationSetNotFound(i64),

  #[error("package validation not found: {0}")]
  ValidationNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

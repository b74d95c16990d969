//! Error types for `gatehouse-core`.

use thiserror::Error;

/// A boxed collaborator error, kept intact so callers can downcast to the
/// backend's own error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// A required collaborator was not supplied when building a service.
  #[error("missing required dependency: {0}")]
  MissingDependency(&'static str),

  #[error("validation initiator error: {0}")]
  Initiator(#[source] BoxError),

  #[error("package status store error: {0}")]
  StatusStore(#[source] BoxError),

  #[error("validation set store error: {0}")]
  ValidationSetStore(#[source] BoxError),

  #[error("configuration error: {0}")]
  Config(#[from] ::config::ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

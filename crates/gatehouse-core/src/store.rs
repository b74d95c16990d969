//! Collaborator traits consumed by [`ValidationStatusReader`](crate::ValidationStatusReader).
//!
//! Storage backends (e.g. `gatehouse-store-sqlite`) implement the store
//! traits; the validation initiator is provided by the orchestration layer
//! that actually schedules validators.
//!
//! All methods return `Send` futures so implementations can be used from
//! multi-threaded async runtimes.

use std::future::Future;

use crate::{
  package::{Package, PackageKey, PackageStatus, ValidatingType},
  validation::ValidationSet,
};

/// Starts (or restarts) validation of a package.
///
/// Idempotency and at-most-one-in-flight guarantees, if any, belong to the
/// implementation.
pub trait ValidationInitiator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Kick off a new validation set for `package` and return the status the
  /// package should move to.
  fn begin<'a>(
    &'a self,
    package: &'a Package,
  ) -> impl Future<Output = Result<PackageStatus, Self::Error>> + Send + 'a;
}

/// Writes package status changes.
pub trait PackageStatusStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Move `package` to `status`.
  ///
  /// With `commit == false` the change is only staged; it becomes durable
  /// when the caller's unit of work is committed.
  fn apply_status<'a>(
    &'a self,
    package: &'a Package,
    status: PackageStatus,
    commit: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Read access to persisted validation history.
pub trait ValidationSetStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every validation set recorded for the package, with runs and issues
  /// loaded. Order is unspecified.
  fn validation_sets(
    &self,
    package_key: PackageKey,
    validating_type: ValidatingType,
  ) -> impl Future<Output = Result<Vec<ValidationSet>, Self::Error>> + Send + '_;
}

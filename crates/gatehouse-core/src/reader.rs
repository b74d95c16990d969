//! [`ValidationStatusReader`] — starts validation and reports on its state.
//!
//! The reader never writes validation history. It reconstructs what
//! happened from whatever the validators have already persisted, so every
//! read is repeatable and safe to call from a request path.

use std::sync::Arc;

use crate::{
  Error, Result,
  clock::{Clock, SystemClock},
  config::ValidationConfig,
  issue::{self, ValidationIssue},
  package::{Package, PackageStatus},
  store::{PackageStatusStore, ValidationInitiator, ValidationSetStore},
  telemetry::ValidationTelemetry,
  validation::latest_terminal_set,
};

// ─── Reader ──────────────────────────────────────────────────────────────────

pub struct ValidationStatusReader<I, P, V> {
  initiator:    I,
  status_store: P,
  sets:         V,
  telemetry:    Arc<dyn ValidationTelemetry>,
  config:       Arc<ValidationConfig>,
  clock:        Arc<dyn Clock>,
}

impl<I, P, V> ValidationStatusReader<I, P, V>
where
  I: ValidationInitiator,
  P: PackageStatusStore,
  V: ValidationSetStore,
{
  pub fn builder() -> ValidationStatusReaderBuilder<I, P, V> {
    ValidationStatusReaderBuilder::new()
  }

  /// Begin validating `package` and stage the resulting status.
  ///
  /// The status change is applied without committing; it lands when the
  /// caller commits its own unit of work.
  #[tracing::instrument(skip_all, fields(package_key = %package.key, package_id = %package.id))]
  pub async fn start_validation(&self, package: &Package) -> Result<PackageStatus> {
    let status = self
      .initiator
      .begin(package)
      .await
      .map_err(|e| Error::Initiator(Box::new(e)))?;

    self
      .status_store
      .apply_status(package, status, false)
      .await
      .map_err(|e| Error::StatusStore(Box::new(e)))?;

    tracing::info!(%status, "validation started");
    Ok(status)
  }

  /// Start a fresh validation set without touching the package status.
  #[tracing::instrument(skip_all, fields(package_key = %package.key, package_id = %package.id))]
  pub async fn revalidate(&self, package: &Package) -> Result<()> {
    self
      .initiator
      .begin(package)
      .await
      .map_err(|e| Error::Initiator(Box::new(e)))?;

    self.telemetry.record_revalidation(package);
    tracing::info!("revalidation started");
    Ok(())
  }

  /// Whether the package is still validating after the expected duration
  /// has elapsed since it was created. Always `false` for other statuses.
  pub fn is_validating_too_long(&self, package: &Package) -> bool {
    if package.status != PackageStatus::Validating {
      return false;
    }
    let elapsed = self.clock.now() - package.created_at;
    elapsed >= self.config.expected_validation_duration()
  }

  /// The deduplicated issues from the package's latest finished validation
  /// set.
  ///
  /// Empty unless the package failed validation. A failed package always
  /// yields at least one issue: the generic unknown issue stands in when no
  /// finished set or no recorded issue can be found.
  #[tracing::instrument(skip_all, fields(package_key = %package.key, package_id = %package.id))]
  pub async fn latest_validation_issues(
    &self,
    package: &Package,
  ) -> Result<Vec<ValidationIssue>> {
    if package.status != PackageStatus::FailedValidation {
      return Ok(Vec::new());
    }

    let sets = self
      .sets
      .validation_sets(package.key, package.validating_type)
      .await
      .map_err(|e| Error::ValidationSetStore(Box::new(e)))?;

    let mut issues: Vec<ValidationIssue> = match latest_terminal_set(&sets) {
      Some(set) => {
        tracing::debug!(
          set_key = set.key,
          tracking_id = %set.tracking_id,
          "selected latest terminal validation set"
        );
        set.issues_in_order().into_iter().map(|i| i.decode()).collect()
      }
      None => {
        tracing::warn!(
          set_count = sets.len(),
          "failed package has no terminal validation set"
        );
        Vec::new()
      }
    };

    if issues.is_empty() {
      issues.push(ValidationIssue::unknown());
    }

    Ok(issue::dedupe(issues))
  }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Collects the reader's collaborators. [`build`](Self::build) fails if any
/// required one is missing; the clock defaults to [`SystemClock`].
pub struct ValidationStatusReaderBuilder<I, P, V> {
  initiator:    Option<I>,
  status_store: Option<P>,
  sets:         Option<V>,
  telemetry:    Option<Arc<dyn ValidationTelemetry>>,
  config:       Option<Arc<ValidationConfig>>,
  clock:        Option<Arc<dyn Clock>>,
}

impl<I, P, V> Default for ValidationStatusReaderBuilder<I, P, V> {
  fn default() -> Self {
    Self {
      initiator:    None,
      status_store: None,
      sets:         None,
      telemetry:    None,
      config:       None,
      clock:        None,
    }
  }
}

impl<I, P, V> ValidationStatusReaderBuilder<I, P, V>
where
  I: ValidationInitiator,
  P: PackageStatusStore,
  V: ValidationSetStore,
{
  pub fn new() -> Self { Self::default() }

  pub fn initiator(mut self, initiator: I) -> Self {
    self.initiator = Some(initiator);
    self
  }

  pub fn status_store(mut self, store: P) -> Self {
    self.status_store = Some(store);
    self
  }

  pub fn validation_sets(mut self, store: V) -> Self {
    self.sets = Some(store);
    self
  }

  pub fn telemetry(mut self, telemetry: Arc<dyn ValidationTelemetry>) -> Self {
    self.telemetry = Some(telemetry);
    self
  }

  pub fn config(mut self, config: Arc<ValidationConfig>) -> Self {
    self.config = Some(config);
    self
  }

  pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = Some(clock);
    self
  }

  pub fn build(self) -> Result<ValidationStatusReader<I, P, V>> {
    Ok(ValidationStatusReader {
      initiator:    self.initiator.ok_or(Error::MissingDependency("initiator"))?,
      status_store: self
        .status_store
        .ok_or(Error::MissingDependency("status store"))?,
      sets:         self
        .sets
        .ok_or(Error::MissingDependency("validation set store"))?,
      telemetry:    self.telemetry.ok_or(Error::MissingDependency("telemetry"))?,
      config:       self.config.ok_or(Error::MissingDependency("config"))?,
      clock:        self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
    })
  }
}

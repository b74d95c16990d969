//! Fire-and-forget telemetry hooks.

use crate::package::Package;

/// Receives operational events. Implementations must not block or fail the
/// caller; delivery is best-effort.
pub trait ValidationTelemetry: Send + Sync {
  fn record_revalidation(&self, package: &Package);
}

/// Emits telemetry as structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl ValidationTelemetry for TracingTelemetry {
  fn record_revalidation(&self, package: &Package) {
    tracing::info!(
      target: "gatehouse::telemetry",
      package_key = %package.key,
      package_id = %package.id,
      version = %package.version,
      validating_type = package.validating_type.as_str(),
      "package revalidation requested"
    );
  }
}

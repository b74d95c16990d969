//! Package — the artifact under validation.
//!
//! Packages are owned by the wider gallery; this crate only reads them and
//! hands new status values to a [`PackageStatusStore`](crate::store::PackageStatusStore).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Integer primary key of a package record.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PackageKey(pub i64);

impl fmt::Display for PackageKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Lifecycle status of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
  Available,
  Deleted,
  Validating,
  FailedValidation,
}

impl PackageStatus {
  /// The text stored in the `status` column; matches the serde names above.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Available => "available",
      Self::Deleted => "deleted",
      Self::Validating => "validating",
      Self::FailedValidation => "failed_validation",
    }
  }
}

impl fmt::Display for PackageStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The kind of artifact a validation set was run against.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ValidatingType {
  #[default]
  Package,
  SymbolPackage,
}

impl ValidatingType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Package => "package",
      Self::SymbolPackage => "symbol_package",
    }
  }
}

/// A package (or symbols package) as seen by the validation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
  pub key:             PackageKey,
  /// Package identifier, e.g. `Newtonsoft.Json`.
  pub id:              String,
  /// Normalized version string, e.g. `13.0.3`.
  pub version:         String,
  pub validating_type: ValidatingType,
  pub status:          PackageStatus,
  /// Upload time; validation duration is measured from here.
  pub created_at:      DateTime<Utc>,
}

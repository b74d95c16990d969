//! Inputs to the [`SqliteStore`](crate::SqliteStore) write paths.

use chrono::{DateTime, Utc};
use gatehouse_core::{
  package::{PackageKey, PackageStatus, ValidatingType},
  validation::ValidationStatus,
};
use uuid::Uuid;

/// Input to [`SqliteStore::add_package`](crate::SqliteStore::add_package).
#[derive(Debug, Clone)]
pub struct NewPackage {
  pub id:              String,
  pub version:         String,
  pub validating_type: ValidatingType,
  pub status:          PackageStatus,
  pub created_at:      DateTime<Utc>,
}

impl NewPackage {
  /// A freshly uploaded package: validating, created now.
  pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      id:              id.into(),
      version:         version.into(),
      validating_type: ValidatingType::Package,
      status:          PackageStatus::Validating,
      created_at:      Utc::now(),
    }
  }
}

/// Input to [`SqliteStore::add_validation_set`](crate::SqliteStore::add_validation_set).
#[derive(Debug, Clone)]
pub struct NewValidationSet {
  pub package_key:     PackageKey,
  pub validating_type: ValidatingType,
  pub tracking_id:     Uuid,
  /// Also used as the initial `updated` time.
  pub created:         DateTime<Utc>,
}

impl NewValidationSet {
  pub fn new(package_key: PackageKey, validating_type: ValidatingType) -> Self {
    Self {
      package_key,
      validating_type,
      tracking_id: Uuid::new_v4(),
      created: Utc::now(),
    }
  }
}

/// Input to [`SqliteStore::add_validation`](crate::SqliteStore::add_validation).
#[derive(Debug, Clone)]
pub struct NewValidation {
  pub validation_set_key: i64,
  pub validator:          String,
  pub status:             ValidationStatus,
  pub at:                 DateTime<Utc>,
}

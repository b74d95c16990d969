//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Enums are stored as their
//! snake_case names. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use gatehouse_core::{
  package::{Package, PackageKey, PackageStatus, ValidatingType},
  validation::{PackageValidation, PersistedIssue, ValidationSet, ValidationStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ────────────────────────────────────────────────────────────────────

fn unknown(column: &'static str, value: &str) -> Error {
  Error::UnknownValue { column, value: value.to_owned() }
}

pub fn decode_package_status(s: &str) -> Result<PackageStatus> {
  match s {
    "available" => Ok(PackageStatus::Available),
    "deleted" => Ok(PackageStatus::Deleted),
    "validating" => Ok(PackageStatus::Validating),
    "failed_validation" => Ok(PackageStatus::FailedValidation),
    other => Err(unknown("status", other)),
  }
}

pub fn decode_validating_type(s: &str) -> Result<ValidatingType> {
  match s {
    "package" => Ok(ValidatingType::Package),
    "symbol_package" => Ok(ValidatingType::SymbolPackage),
    other => Err(unknown("validating_type", other)),
  }
}

pub fn decode_validation_status(s: &str) -> Result<ValidationStatus> {
  match s {
    "not_started" => Ok(ValidationStatus::NotStarted),
    "incomplete" => Ok(ValidationStatus::Incomplete),
    "succeeded" => Ok(ValidationStatus::Succeeded),
    "failed" => Ok(ValidationStatus::Failed),
    other => Err(unknown("validation status", other)),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `packages` row.
pub struct RawPackage {
  pub package_key:     i64,
  pub package_id:      String,
  pub version:         String,
  pub validating_type: String,
  pub status:          String,
  pub created_at:      String,
}

impl RawPackage {
  pub fn into_package(self) -> Result<Package> {
    Ok(Package {
      key:             PackageKey(self.package_key),
      id:              self.package_id,
      version:         self.version,
      validating_type: decode_validating_type(&self.validating_type)?,
      status:          decode_package_status(&self.status)?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `validation_sets` row.
pub struct RawValidationSet {
  pub set_key:         i64,
  pub tracking_id:     String,
  pub package_key:     i64,
  pub validating_type: String,
  pub created:         String,
  pub updated:         String,
}

impl RawValidationSet {
  /// Decode the row; runs are attached afterwards.
  pub fn into_set(self) -> Result<ValidationSet> {
    Ok(ValidationSet {
      key:             self.set_key,
      tracking_id:     decode_uuid(&self.tracking_id)?,
      package_key:     PackageKey(self.package_key),
      validating_type: decode_validating_type(&self.validating_type)?,
      created:         decode_dt(&self.created)?,
      updated:         decode_dt(&self.updated)?,
      validations:     Vec::new(),
    })
  }
}

/// Raw values read directly from a `package_validations` row.
pub struct RawValidation {
  pub validation_key:   String,
  pub set_key:          i64,
  pub validator:        String,
  pub status:           String,
  pub status_timestamp: String,
  pub started:          Option<String>,
}

impl RawValidation {
  /// Decode the row; issues are attached afterwards.
  pub fn into_validation(self) -> Result<PackageValidation> {
    Ok(PackageValidation {
      key:                decode_uuid(&self.validation_key)?,
      validation_set_key: self.set_key,
      validator:          self.validator,
      status:             decode_validation_status(&self.status)?,
      status_timestamp:   decode_dt(&self.status_timestamp)?,
      started:            self.started.as_deref().map(decode_dt).transpose()?,
      issues:             Vec::new(),
    })
  }
}

/// Raw values read directly from a `validation_issues` row.
pub struct RawIssue {
  pub issue_key:      i64,
  pub validation_key: String,
  pub issue_code:     i32,
  pub data:           Option<String>,
}

impl RawIssue {
  /// Decode the row, returning the owning validation's key alongside it.
  pub fn into_issue(self) -> Result<(Uuid, PersistedIssue)> {
    Ok((decode_uuid(&self.validation_key)?, PersistedIssue {
      key:  self.issue_key,
      code: self.issue_code,
      data: self.data,
    }))
  }
}

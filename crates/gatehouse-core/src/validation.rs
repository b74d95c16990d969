//! Validation history — sets, validator runs, and the issues they recorded.
//!
//! A validation set is one attempt at validating a package; each validator
//! taking part records a [`PackageValidation`] in it. Whether a set is
//! finished is never stored: it is derived from the statuses of its runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  issue::ValidationIssue,
  package::{PackageKey, ValidatingType},
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// The state of a single validator's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
  NotStarted,
  Incomplete,
  Succeeded,
  Failed,
}

impl ValidationStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::NotStarted => "not_started",
      Self::Incomplete => "incomplete",
      Self::Succeeded => "succeeded",
      Self::Failed => "failed",
    }
  }
}

// ─── Persisted issue ─────────────────────────────────────────────────────────

/// An issue exactly as a validator stored it: an integer code plus an opaque
/// payload. Decode with [`PersistedIssue::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedIssue {
  /// Insertion-order key assigned by the store.
  pub key:  i64,
  pub code: i32,
  pub data: Option<String>,
}

impl PersistedIssue {
  pub fn decode(&self) -> ValidationIssue {
    ValidationIssue::from_parts(self.code, self.data.as_deref())
  }
}

// ─── Validator run ───────────────────────────────────────────────────────────

/// One validator's outcome within a [`ValidationSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageValidation {
  pub key:                Uuid,
  pub validation_set_key: i64,
  /// Name of the validator, e.g. `PackageSigningValidator`.
  pub validator:          String,
  pub status:             ValidationStatus,
  pub status_timestamp:   DateTime<Utc>,
  pub started:            Option<DateTime<Utc>>,
  pub issues:             Vec<PersistedIssue>,
}

// ─── Validation set ──────────────────────────────────────────────────────────

/// One full attempt at validating a package, with its runs and their issues
/// already loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSet {
  pub key:             i64,
  pub tracking_id:     Uuid,
  pub package_key:     PackageKey,
  pub validating_type: ValidatingType,
  pub created:         DateTime<Utc>,
  pub updated:         DateTime<Utc>,
  pub validations:     Vec<PackageValidation>,
}

impl ValidationSet {
  /// `true` when every run succeeded. A set with no runs counts as
  /// succeeded.
  pub fn is_succeeded(&self) -> bool {
    self
      .validations
      .iter()
      .all(|v| v.status == ValidationStatus::Succeeded)
  }

  /// `true` when at least one run failed.
  pub fn is_failed(&self) -> bool {
    self
      .validations
      .iter()
      .any(|v| v.status == ValidationStatus::Failed)
  }

  /// A set is terminal once its outcome can no longer change.
  pub fn is_terminal(&self) -> bool { self.is_succeeded() || self.is_failed() }

  /// Every issue recorded by every run, in insertion order.
  pub fn issues_in_order(&self) -> Vec<&PersistedIssue> {
    let mut issues: Vec<&PersistedIssue> = self
      .validations
      .iter()
      .flat_map(|v| v.issues.iter())
      .collect();
    issues.sort_by_key(|i| i.key);
    issues
  }
}

/// Pick the most recently updated terminal set.
///
/// Ties on `updated` go to the set with the higher key, i.e. the one
/// inserted last.
pub fn latest_terminal_set(sets: &[ValidationSet]) -> Option<&ValidationSet> {
  sets
    .iter()
    .filter(|s| s.is_terminal())
    .max_by_key(|s| (s.updated, s.key))
}

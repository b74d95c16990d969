//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use gatehouse_core::{
  ValidationStatusReader,
  config::ValidationConfig,
  issue::{ClientSigningFailure, IssueCode, SymbolAssembly, ValidationIssue},
  package::{Package, PackageKey, PackageStatus, ValidatingType},
  store::{PackageStatusStore, ValidationInitiator, ValidationSetStore},
  telemetry::TracingTelemetry,
  validation::{ValidationSet, ValidationStatus},
};
use uuid::Uuid;

use crate::{NewPackage, NewValidation, NewValidationSet, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn ts(secs: i64) -> DateTime<Utc> { Utc.timestamp_opt(secs, 0).unwrap() }

async fn package(s: &SqliteStore, status: PackageStatus) -> Package {
  let mut input = NewPackage::new("Contoso.Widgets", "1.0.0");
  input.status = status;
  input.created_at = ts(1_000);
  s.add_package(input).await.unwrap()
}

async fn open_set(s: &SqliteStore, package: &Package, created: i64) -> ValidationSet {
  let mut input = NewValidationSet::new(package.key, package.validating_type);
  input.created = ts(created);
  s.add_validation_set(input).await.unwrap()
}

fn run(set: &ValidationSet, validator: &str, status: ValidationStatus, at: i64) -> NewValidation {
  NewValidation {
    validation_set_key: set.key,
    validator:          validator.into(),
    status,
    at:                 ts(at),
  }
}

// ─── Packages ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_package() {
  let s = store().await;
  let added = package(&s, PackageStatus::Validating).await;

  let fetched = s.get_package(added.key).await.unwrap().unwrap();
  assert_eq!(fetched, added);
  assert_eq!(fetched.created_at, ts(1_000));
}

#[tokio::test]
async fn get_package_missing_returns_none() {
  let s = store().await;
  assert!(s.get_package(PackageKey(404)).await.unwrap().is_none());
}

// ─── Status unit of work ─────────────────────────────────────────────────────

#[tokio::test]
async fn uncommitted_status_is_staged_until_commit() {
  let s = store().await;
  let pkg = package(&s, PackageStatus::Available).await;

  s.apply_status(&pkg, PackageStatus::Validating, false)
    .await
    .unwrap();
  assert_eq!(s.pending_changes(), 1);
  let before = s.get_package(pkg.key).await.unwrap().unwrap();
  assert_eq!(before.status, PackageStatus::Available);

  assert_eq!(s.commit().await.unwrap(), 1);
  assert_eq!(s.pending_changes(), 0);
  let after = s.get_package(pkg.key).await.unwrap().unwrap();
  assert_eq!(after.status, PackageStatus::Validating);
}

#[tokio::test]
async fn committing_apply_flushes_earlier_staged_changes() {
  let s = store().await;
  let first = package(&s, PackageStatus::Available).await;
  let mut other = NewPackage::new("Contoso.Gadgets", "2.0.0");
  other.status = PackageStatus::Available;
  let second = s.add_package(other).await.unwrap();

  s.apply_status(&first, PackageStatus::Validating, false)
    .await
    .unwrap();
  s.apply_status(&second, PackageStatus::FailedValidation, true)
    .await
    .unwrap();

  assert_eq!(s.pending_changes(), 0);
  let first = s.get_package(first.key).await.unwrap().unwrap();
  let second = s.get_package(second.key).await.unwrap().unwrap();
  assert_eq!(first.status, PackageStatus::Validating);
  assert_eq!(second.status, PackageStatus::FailedValidation);
}

#[tokio::test]
async fn rollback_discards_staged_changes() {
  let s = store().await;
  let pkg = package(&s, PackageStatus::Available).await;

  s.apply_status(&pkg, PackageStatus::Deleted, false)
    .await
    .unwrap();
  assert_eq!(s.rollback(), 1);
  assert_eq!(s.commit().await.unwrap(), 0);

  let fetched = s.get_package(pkg.key).await.unwrap().unwrap();
  assert_eq!(fetched.status, PackageStatus::Available);
}

#[tokio::test]
async fn commit_with_unknown_package_rolls_back_everything() {
  let s = store().await;
  let pkg = package(&s, PackageStatus::Available).await;
  let mut ghost = pkg.clone();
  ghost.key = PackageKey(9_999);

  s.apply_status(&pkg, PackageStatus::Validating, false)
    .await
    .unwrap();
  let err = s
    .apply_status(&ghost, PackageStatus::Validating, true)
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::PackageNotFound(PackageKey(9_999))));

  let fetched = s.get_package(pkg.key).await.unwrap().unwrap();
  assert_eq!(fetched.status, PackageStatus::Available);
  assert_eq!(s.pending_changes(), 0);
}

// ─── Validation history ──────────────────────────────────────────────────────

#[tokio::test]
async fn validation_set_for_missing_package_errors() {
  let s = store().await;
  let err = s
    .add_validation_set(NewValidationSet::new(PackageKey(1), ValidatingType::Package))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::PackageNotFound(_)));
}

#[tokio::test]
async fn validation_for_missing_set_errors() {
  let s = store().await;
  let err = s
    .add_validation(NewValidation {
      validation_set_key: 77,
      validator:          "PackageSigningValidator".into(),
      status:             ValidationStatus::NotStarted,
      at:                 ts(0),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::ValidationSetNotFound(77)));
}

#[tokio::test]
async fn issue_for_missing_validation_errors() {
  let s = store().await;
  let err = s
    .record_issue(Uuid::new_v4(), &ValidationIssue::PackageIsZip64)
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::ValidationNotFound(_)));
}

#[tokio::test]
async fn validation_sets_load_runs_and_issues() {
  let s = store().await;
  let pkg = package(&s, PackageStatus::FailedValidation).await;
  let set = open_set(&s, &pkg, 100).await;

  let signing = s
    .add_validation(run(&set, "PackageSigningValidator", ValidationStatus::Incomplete, 110))
    .await
    .unwrap();
  let scan = s
    .add_validation(run(&set, "ScanAndSign", ValidationStatus::Succeeded, 120))
    .await
    .unwrap();

  let failure = ValidationIssue::ClientSigningVerificationFailure(ClientSigningFailure {
    client_code:    "NU3008".into(),
    client_message: "integrity check failed".into(),
  });
  s.record_issue(signing.key, &failure).await.unwrap();
  s.record_issue(signing.key, &ValidationIssue::PackageIsZip64)
    .await
    .unwrap();
  s.update_validation_status(signing.key, ValidationStatus::Failed, ts(130))
    .await
    .unwrap();

  let sets = s
    .validation_sets(pkg.key, ValidatingType::Package)
    .await
    .unwrap();
  assert_eq!(sets.len(), 1);
  let loaded = &sets[0];
  assert_eq!(loaded.tracking_id, set.tracking_id);
  assert_eq!(loaded.updated, ts(130));
  assert!(loaded.is_failed());
  assert_eq!(loaded.validations.len(), 2);

  let signing_run = loaded
    .validations
    .iter()
    .find(|v| v.key == signing.key)
    .unwrap();
  assert_eq!(signing_run.status, ValidationStatus::Failed);
  assert_eq!(signing_run.started, Some(ts(110)));
  assert_eq!(signing_run.status_timestamp, ts(130));
  let decoded: Vec<_> = signing_run.issues.iter().map(|i| i.decode()).collect();
  assert_eq!(decoded, vec![failure, ValidationIssue::PackageIsZip64]);

  let scan_run = loaded.validations.iter().find(|v| v.key == scan.key).unwrap();
  assert!(scan_run.issues.is_empty());
}

#[tokio::test]
async fn not_started_runs_get_start_time_on_first_update() {
  let s = store().await;
  let pkg = package(&s, PackageStatus::Validating).await;
  let set = open_set(&s, &pkg, 100).await;

  let v = s
    .add_validation(run(&set, "PackageSigningValidator", ValidationStatus::NotStarted, 100))
    .await
    .unwrap();
  assert_eq!(v.started, None);

  s.update_validation_status(v.key, ValidationStatus::Incomplete, ts(150))
    .await
    .unwrap();
  s.update_validation_status(v.key, ValidationStatus::Succeeded, ts(200))
    .await
    .unwrap();

  let sets = s
    .validation_sets(pkg.key, ValidatingType::Package)
    .await
    .unwrap();
  let loaded = &sets[0].validations[0];
  assert_eq!(loaded.started, Some(ts(150)));
  assert_eq!(loaded.status, ValidationStatus::Succeeded);
}

#[tokio::test]
async fn validation_sets_are_scoped_by_package_and_type() {
  let s = store().await;
  let pkg = package(&s, PackageStatus::FailedValidation).await;
  let mut symbols_input = NewPackage::new("Contoso.Widgets", "1.0.0");
  symbols_input.validating_type = ValidatingType::SymbolPackage;
  let symbols = s.add_package(symbols_input).await.unwrap();

  open_set(&s, &pkg, 100).await;
  open_set(&s, &pkg, 200).await;
  open_set(&s, &symbols, 300).await;

  let package_sets = s
    .validation_sets(pkg.key, ValidatingType::Package)
    .await
    .unwrap();
  assert_eq!(package_sets.len(), 2);

  let symbol_sets = s
    .validation_sets(symbols.key, ValidatingType::SymbolPackage)
    .await
    .unwrap();
  assert_eq!(symbol_sets.len(), 1);

  let mismatched = s
    .validation_sets(pkg.key, ValidatingType::SymbolPackage)
    .await
    .unwrap();
  assert!(mismatched.is_empty());
}

#[tokio::test]
async fn raw_issues_keep_insertion_keys() {
  let s = store().await;
  let pkg = package(&s, PackageStatus::FailedValidation).await;
  let set = open_set(&s, &pkg, 100).await;
  let v = s
    .add_validation(run(&set, "SymbolsValidator", ValidationStatus::Failed, 100))
    .await
    .unwrap();

  let first = s.record_raw_issue(v.key, 9_000, Some("{}".into())).await.unwrap();
  let second = s
    .record_raw_issue(v.key, IssueCode::PackageIsZip64.as_i32(), None)
    .await
    .unwrap();
  assert!(first.key < second.key);

  let sets = s
    .validation_sets(pkg.key, ValidatingType::Package)
    .await
    .unwrap();
  let issues = &sets[0].validations[0].issues;
  assert_eq!(issues, &vec![first, second]);
  assert_eq!(issues[0].decode().code(), IssueCode::Unknown);
}

// ─── End to end with the reader ──────────────────────────────────────────────

/// Marks the package as validating; stands in for the orchestrator.
#[derive(Clone)]
struct ImmediateInitiator;

#[derive(Debug, thiserror::Error)]
#[error("never fails")]
struct Never;

impl ValidationInitiator for ImmediateInitiator {
  type Error = Never;

  async fn begin(&self, _package: &Package) -> Result<PackageStatus, Never> {
    Ok(PackageStatus::Validating)
  }
}

fn reader(s: &SqliteStore) -> ValidationStatusReader<ImmediateInitiator, SqliteStore, SqliteStore> {
  ValidationStatusReader::builder()
    .initiator(ImmediateInitiator)
    .status_store(s.clone())
    .validation_sets(s.clone())
    .telemetry(Arc::new(TracingTelemetry))
    .config(Arc::new(ValidationConfig::default()))
    .build()
    .unwrap()
}

#[tokio::test]
async fn start_validation_defers_to_callers_commit() {
  let s = store().await;
  let pkg = package(&s, PackageStatus::Available).await;
  let reader = reader(&s);

  let status = reader.start_validation(&pkg).await.unwrap();
  assert_eq!(status, PackageStatus::Validating);
  assert_eq!(
    s.get_package(pkg.key).await.unwrap().unwrap().status,
    PackageStatus::Available
  );

  s.commit().await.unwrap();
  assert_eq!(
    s.get_package(pkg.key).await.unwrap().unwrap().status,
    PackageStatus::Validating
  );
}

#[tokio::test]
async fn reader_reports_latest_terminal_set_from_sqlite() {
  let s = store().await;
  let pkg = package(&s, PackageStatus::FailedValidation).await;

  // Older set: succeeded.
  let old = open_set(&s, &pkg, 100).await;
  s.add_validation(run(&old, "PackageSigningValidator", ValidationStatus::Succeeded, 110))
    .await
    .unwrap();

  // Newer set: one validator failed with two issues, one duplicated.
  let failed = open_set(&s, &pkg, 200).await;
  let v = s
    .add_validation(run(&failed, "SymbolsValidator", ValidationStatus::Incomplete, 210))
    .await
    .unwrap();
  let pdb = ValidationIssue::SymbolPdbIsNotPortable(SymbolAssembly {
    assembly_file_name: "Widgets.dll".into(),
  });
  s.record_issue(v.key, &pdb).await.unwrap();
  s.record_raw_issue(v.key, pdb.code().as_i32(), Some("{ \"f\" : \"Widgets.dll\" }".into()))
    .await
    .unwrap();
  s.record_issue(v.key, &ValidationIssue::SymbolMatchingAssemblyNotFound)
    .await
    .unwrap();
  s.update_validation_status(v.key, ValidationStatus::Failed, ts(220))
    .await
    .unwrap();

  // Newest set: still running.
  let running = open_set(&s, &pkg, 300).await;
  let r = s
    .add_validation(run(&running, "PackageSigningValidator", ValidationStatus::Incomplete, 310))
    .await
    .unwrap();
  s.record_issue(r.key, &ValidationIssue::PackageIsZip64)
    .await
    .unwrap();

  let reader = reader(&s);
  let issues = reader.latest_validation_issues(&pkg).await.unwrap();
  assert_eq!(issues, vec![pdb, ValidationIssue::SymbolMatchingAssemblyNotFound]);

  let again = reader.latest_validation_issues(&pkg).await.unwrap();
  assert_eq!(issues, again);
}

#[tokio::test]
async fn reader_flags_packages_created_long_ago() {
  let s = store().await;
  let mut input = NewPackage::new("Contoso.Slow", "0.1.0");
  input.created_at = Utc::now() - TimeDelta::hours(2);
  let slow = s.add_package(input).await.unwrap();
  let fresh = s
    .add_package(NewPackage::new("Contoso.Fast", "0.1.0"))
    .await
    .unwrap();

  let reader = reader(&s);
  assert!(reader.is_validating_too_long(&slow));
  assert!(!reader.is_validating_too_long(&fresh));
}

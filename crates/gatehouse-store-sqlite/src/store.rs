//! [`SqliteStore`] — the SQLite implementation of the Gatehouse store traits.

use std::{
  collections::HashMap,
  path::Path,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use gatehouse_core::{
  issue::ValidationIssue,
  package::{Package, PackageKey, PackageStatus, ValidatingType},
  store::{PackageStatusStore, ValidationSetStore},
  validation::{PackageValidation, PersistedIssue, ValidationSet, ValidationStatus},
};

use crate::{
  encode::{
    RawIssue, RawPackage, RawValidation, RawValidationSet, encode_dt, encode_uuid,
  },
  input::{NewPackage, NewValidation, NewValidationSet},
  schema::SCHEMA,
  Error, Result,
};

/// A status change applied with `commit == false`, waiting for [`SqliteStore::commit`].
#[derive(Debug, Clone, Copy)]
struct StagedStatus {
  package_key: PackageKey,
  status:      PackageStatus,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Gatehouse validation history backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection and the staged-change queue are
/// reference-counted, so clones share one unit of work.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  staged: Arc<Mutex<Vec<StagedStatus>>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, staged: Arc::default() })
  }

  fn staged(&self) -> MutexGuard<'_, Vec<StagedStatus>> {
    self.staged.lock().unwrap_or_else(PoisonError::into_inner)
  }

  // ── Unit of work ──────────────────────────────────────────────────────────

  /// Number of status changes staged but not yet committed.
  pub fn pending_changes(&self) -> usize { self.staged().len() }

  /// Write every staged status change in one transaction and return how many
  /// were applied.
  ///
  /// The queue is emptied even on failure; a failed commit rolls back every
  /// change in it.
  pub async fn commit(&self) -> Result<usize> {
    let changes = std::mem::take(&mut *self.staged());
    if changes.is_empty() {
      return Ok(0);
    }
    let count = changes.len();
    let rows: Vec<(i64, &'static str)> = changes
      .iter()
      .map(|c| (c.package_key.0, c.status.as_str()))
      .collect();

    let missing: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (key, status) in &rows {
          let updated = tx.execute(
            "UPDATE packages SET status = ?1 WHERE package_key = ?2",
            rusqlite::params![status, key],
          )?;
          if updated == 0 {
            // Dropping `tx` rolls back.
            return Ok(Some(*key));
          }
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    if let Some(key) = missing {
      return Err(Error::PackageNotFound(PackageKey(key)));
    }

    tracing::info!(count, "committed package status changes");
    Ok(count)
  }

  /// Drop every staged status change and return how many were discarded.
  pub fn rollback(&self) -> usize {
    let dropped = std::mem::take(&mut *self.staged()).len();
    if dropped > 0 {
      tracing::info!(dropped, "discarded staged package status changes");
    }
    dropped
  }

  // ── Packages ──────────────────────────────────────────────────────────────

  /// Persist a new package and return it with its assigned key.
  pub async fn add_package(&self, input: NewPackage) -> Result<Package> {
    let id_str      = input.id.clone();
    let version_str = input.version.clone();
    let type_str    = input.validating_type.as_str();
    let status_str  = input.status.as_str();
    let created_str = encode_dt(input.created_at);

    let key = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO packages
             (package_id, version, validating_type, status, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, version_str, type_str, status_str, created_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Package {
      key:             PackageKey(key),
      id:              input.id,
      version:         input.version,
      validating_type: input.validating_type,
      status:          input.status,
      created_at:      input.created_at,
    })
  }

  /// Retrieve a package by key. Returns `None` if not found.
  ///
  /// Staged status changes are not visible until committed.
  pub async fn get_package(&self, key: PackageKey) -> Result<Option<Package>> {
    let raw: Option<RawPackage> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT package_key, package_id, version, validating_type,
                      status, created_at
               FROM packages WHERE package_key = ?1",
              rusqlite::params![key.0],
              |row| {
                Ok(RawPackage {
                  package_key:     row.get(0)?,
                  package_id:      row.get(1)?,
                  version:         row.get(2)?,
                  validating_type: row.get(3)?,
                  status:          row.get(4)?,
                  created_at:      row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPackage::into_package).transpose()
  }

  // ── Validation history — writes ───────────────────────────────────────────

  /// Open a new, empty validation set for a package.
  pub async fn add_validation_set(&self, input: NewValidationSet) -> Result<ValidationSet> {
    let package_key = input.package_key.0;
    let tracking    = encode_uuid(input.tracking_id);
    let type_str    = input.validating_type.as_str();
    let created_str = encode_dt(input.created);

    let key: Option<i64> = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM packages WHERE package_key = ?1",
            rusqlite::params![package_key],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }

        conn.execute(
          "INSERT INTO validation_sets
             (tracking_id, package_key, validating_type, created, updated)
           VALUES (?1, ?2, ?3, ?4, ?4)",
          rusqlite::params![tracking, package_key, type_str, created_str],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?;

    let key = key.ok_or(Error::PackageNotFound(input.package_key))?;
    tracing::debug!(set_key = key, tracking_id = %input.tracking_id, "validation set opened");

    Ok(ValidationSet {
      key,
      tracking_id:     input.tracking_id,
      package_key:     input.package_key,
      validating_type: input.validating_type,
      created:         input.created,
      updated:         input.created,
      validations:     Vec::new(),
    })
  }

  /// Add a validator run to a set. The set's `updated` time moves to
  /// `input.at`.
  pub async fn add_validation(&self, input: NewValidation) -> Result<PackageValidation> {
    let validation = PackageValidation {
      key:                Uuid::new_v4(),
      validation_set_key: input.validation_set_key,
      validator:          input.validator,
      status:             input.status,
      status_timestamp:   input.at,
      started:            started_at(input.status, input.at),
      issues:             Vec::new(),
    };

    let key_str     = encode_uuid(validation.key);
    let set_key     = validation.validation_set_key;
    let validator   = validation.validator.clone();
    let status_str  = validation.status.as_str();
    let at_str      = encode_dt(input.at);
    let started_str = validation.started.map(encode_dt);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let touched = tx.execute(
          "UPDATE validation_sets SET updated = ?1 WHERE set_key = ?2",
          rusqlite::params![at_str, set_key],
        )?;
        if touched == 0 {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO package_validations
             (validation_key, set_key, validator, status, status_timestamp, started)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![key_str, set_key, validator, status_str, at_str, started_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::ValidationSetNotFound(set_key));
    }
    Ok(validation)
  }

  /// Record a validator's new status. Sets `started` on the first move out
  /// of `NotStarted` and moves the owning set's `updated` time to `at`.
  pub async fn update_validation_status(
    &self,
    validation_key: Uuid,
    status:         ValidationStatus,
    at:             DateTime<Utc>,
  ) -> Result<()> {
    let key_str     = encode_uuid(validation_key);
    let status_str  = status.as_str();
    let at_str      = encode_dt(at);
    let started_str = started_at(status, at).map(encode_dt);

    let updated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE package_validations
           SET status = ?1, status_timestamp = ?2, started = COALESCE(started, ?3)
           WHERE validation_key = ?4",
          rusqlite::params![status_str, at_str, started_str, key_str],
        )?;
        if changed == 0 {
          return Ok(false);
        }
        tx.execute(
          "UPDATE validation_sets SET updated = ?1
           WHERE set_key = (
             SELECT set_key FROM package_validations WHERE validation_key = ?2
           )",
          rusqlite::params![at_str, key_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !updated {
      return Err(Error::ValidationNotFound(validation_key));
    }
    tracing::debug!(%validation_key, status = status.as_str(), "validation status updated");
    Ok(())
  }

  /// Append a typed issue to a validator run.
  pub async fn record_issue(
    &self,
    validation_key: Uuid,
    issue: &ValidationIssue,
  ) -> Result<PersistedIssue> {
    self
      .record_raw_issue(validation_key, issue.code().as_i32(), issue.persisted_data())
      .await
  }

  /// Append an issue exactly as given. The code and payload are not
  /// validated; readers decode unrecognized pairs to the unknown issue.
  pub async fn record_raw_issue(
    &self,
    validation_key: Uuid,
    code: i32,
    data: Option<String>,
  ) -> Result<PersistedIssue> {
    let key_str  = encode_uuid(validation_key);
    let data_col = data.clone();

    let key: Option<i64> = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM package_validations WHERE validation_key = ?1",
            rusqlite::params![key_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }

        conn.execute(
          "INSERT INTO validation_issues (validation_key, issue_code, data)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![key_str, code, data_col],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?;

    let key = key.ok_or(Error::ValidationNotFound(validation_key))?;
    Ok(PersistedIssue { key, code, data })
  }
}

/// Runs that have left `NotStarted` get a start time.
fn started_at(status: ValidationStatus, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
  (status != ValidationStatus::NotStarted).then_some(at)
}

// ─── ValidationSetStore impl ─────────────────────────────────────────────────

impl ValidationSetStore for SqliteStore {
  type Error = Error;

  async fn validation_sets(
    &self,
    package_key:     PackageKey,
    validating_type: ValidatingType,
  ) -> Result<Vec<ValidationSet>> {
    let type_str = validating_type.as_str();

    let (raw_sets, raw_validations, raw_issues) = self
      .conn
      .call(move |conn| {
        // One read transaction so the three queries see the same snapshot.
        let tx = conn.transaction()?;

        let sets = {
          let mut stmt = tx.prepare(
            "SELECT set_key, tracking_id, package_key, validating_type,
                    created, updated
             FROM validation_sets
             WHERE package_key = ?1 AND validating_type = ?2
             ORDER BY set_key",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![package_key.0, type_str], |row| {
              Ok(RawValidationSet {
                set_key:         row.get(0)?,
                tracking_id:     row.get(1)?,
                package_key:     row.get(2)?,
                validating_type: row.get(3)?,
                created:         row.get(4)?,
                updated:         row.get(5)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };

        let validations = {
          let mut stmt = tx.prepare(
            "SELECT v.validation_key, v.set_key, v.validator, v.status,
                    v.status_timestamp, v.started
             FROM package_validations v
             JOIN validation_sets s ON s.set_key = v.set_key
             WHERE s.package_key = ?1 AND s.validating_type = ?2
             ORDER BY v.set_key, v.validator",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![package_key.0, type_str], |row| {
              Ok(RawValidation {
                validation_key:   row.get(0)?,
                set_key:          row.get(1)?,
                validator:        row.get(2)?,
                status:           row.get(3)?,
                status_timestamp: row.get(4)?,
                started:          row.get(5)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };

        let issues = {
          let mut stmt = tx.prepare(
            "SELECT i.issue_key, i.validation_key, i.issue_code, i.data
             FROM validation_issues i
             JOIN package_validations v ON v.validation_key = i.validation_key
             JOIN validation_sets     s ON s.set_key        = v.set_key
             WHERE s.package_key = ?1 AND s.validating_type = ?2
             ORDER BY i.issue_key",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![package_key.0, type_str], |row| {
              Ok(RawIssue {
                issue_key:      row.get(0)?,
                validation_key: row.get(1)?,
                issue_code:     row.get(2)?,
                data:           row.get(3)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };

        tx.commit()?;
        Ok((sets, validations, issues))
      })
      .await?;

    let mut validations: Vec<PackageValidation> = raw_validations
      .into_iter()
      .map(RawValidation::into_validation)
      .collect::<Result<_>>()?;
    let validation_index: HashMap<Uuid, usize> = validations
      .iter()
      .enumerate()
      .map(|(i, v)| (v.key, i))
      .collect();
    for raw in raw_issues {
      let (validation_key, issue) = raw.into_issue()?;
      if let Some(&i) = validation_index.get(&validation_key) {
        validations[i].issues.push(issue);
      }
    }

    let mut sets: Vec<ValidationSet> = raw_sets
      .into_iter()
      .map(RawValidationSet::into_set)
      .collect::<Result<_>>()?;
    let set_index: HashMap<i64, usize> =
      sets.iter().enumerate().map(|(i, s)| (s.key, i)).collect();
    for validation in validations {
      if let Some(&i) = set_index.get(&validation.validation_set_key) {
        sets[i].validations.push(validation);
      }
    }

    Ok(sets)
  }
}

// ─── PackageStatusStore impl ─────────────────────────────────────────────────

impl PackageStatusStore for SqliteStore {
  type Error = Error;

  async fn apply_status(
    &self,
    package: &Package,
    status:  PackageStatus,
    commit:  bool,
  ) -> Result<()> {
    self.staged().push(StagedStatus { package_key: package.key, status });
    tracing::info!(package_key = %package.key, %status, commit, "package status change staged");

    if commit {
      self.commit().await?;
    }
    Ok(())
  }
}

//! SQL schema for the Gatehouse SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS packages (
    package_key     INTEGER PRIMARY KEY AUTOINCREMENT,
    package_id      TEXT NOT NULL,
    version         TEXT NOT NULL,   -- normalized version
    validating_type TEXT NOT NULL,   -- 'package' | 'symbol_package'
    status          TEXT NOT NULL,
    created_at      TEXT NOT NULL,   -- RFC 3339 UTC
    UNIQUE (package_id, version, validating_type)
);

-- One row per validation attempt. AUTOINCREMENT keeps keys monotonic.
CREATE TABLE IF NOT EXISTS validation_sets (
    set_key         INTEGER PRIMARY KEY AUTOINCREMENT,
    tracking_id     TEXT NOT NULL UNIQUE,
    package_key     INTEGER NOT NULL REFERENCES packages(package_key),
    validating_type TEXT NOT NULL,
    created         TEXT NOT NULL,
    updated         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS package_validations (
    validation_key   TEXT PRIMARY KEY,
    set_key          INTEGER NOT NULL REFERENCES validation_sets(set_key),
    validator        TEXT NOT NULL,
    status           TEXT NOT NULL,
    status_timestamp TEXT NOT NULL,
    started          TEXT,
    UNIQUE (set_key, validator)
);

-- Append-only. issue_key order is the order validators reported issues in.
CREATE TABLE IF NOT EXISTS validation_issues (
    issue_key      INTEGER PRIMARY KEY AUTOINCREMENT,
    validation_key TEXT NOT NULL REFERENCES package_validations(validation_key),
    issue_code     INTEGER NOT NULL,
    data           TEXT
);

CREATE INDEX IF NOT EXISTS validation_sets_package_idx
    ON validation_sets(package_key, validating_type);
CREATE INDEX IF NOT EXISTS package_validations_set_idx
    ON package_validations(set_key);
CREATE INDEX IF NOT EXISTS validation_issues_validation_idx
    ON validation_issues(validation_key);

PRAGMA user_version = 1;
";

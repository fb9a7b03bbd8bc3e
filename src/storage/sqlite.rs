//! SQLite database layer

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use crate::error::{Result, SqlmError};
use crate::storage::migrations;

/// Busy timeout used when the caller does not pick one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// SQLite database wrapper for the managed SQL worklist
pub struct Database {
    conn: Connection,
    schema_version: u32,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("schema_version", &self.schema_version)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open database at the given path, waiting up to `busy_timeout` for
    /// another writer to release its lock.
    pub fn open_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database (tests, dry runs).
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::configure_pragmas(&conn)?;
        let schema_version = migrations::run_migrations(&conn)?;

        Ok(Self {
            conn,
            schema_version,
        })
    }

    /// Get a reference to the connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Current schema version after migrations.
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Begin a write transaction that takes the writer lock up front, so two
    /// concurrent batches queue on the busy timeout instead of deadlocking on
    /// a lock upgrade.
    pub(crate) fn write_transaction(&mut self) -> rusqlite::Result<Transaction<'_>> {
        self.conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
    }

    /// Register a project by name, returning its id. Idempotent.
    pub fn ensure_project(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SqlmError::ValidationFailed(
                "project name must not be empty".to_string(),
            ));
        }
        self.conn.execute(
            "INSERT INTO projects (name, created_at) VALUES (?1, ?2)
             ON CONFLICT(name) DO NOTHING",
            params![name, format_ts(&Utc::now())],
        )?;
        let id = self
            .conn
            .query_row("SELECT id FROM projects WHERE name = ?", [name], |row| {
                row.get(0)
            })?;
        Ok(id)
    }

    /// Look up a project id by name.
    pub fn project_id(&self, name: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM projects WHERE name = ? AND deleted_at IS NULL",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Look up a project id by name, failing when it is not registered.
    pub fn require_project(&self, name: &str) -> Result<i64> {
        self.project_id(name)?
            .ok_or_else(|| SqlmError::ProjectNotFound(name.to_string()))
    }

    /// Register a user by login name, returning its id. Idempotent.
    pub fn ensure_user(&self, login_name: &str) -> Result<i64> {
        let login_name = login_name.trim();
        if login_name.is_empty() {
            return Err(SqlmError::ValidationFailed(
                "login name must not be empty".to_string(),
            ));
        }
        self.conn.execute(
            "INSERT INTO users (login_name, created_at) VALUES (?1, ?2)
             ON CONFLICT(login_name) DO NOTHING",
            params![login_name, format_ts(&Utc::now())],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM users WHERE login_name = ?",
            [login_name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Register an audit plan under a project. Re-registering the same name
    /// updates its instance and revives it if it was deleted.
    pub fn create_audit_plan(
        &self,
        project_id: i64,
        name: &str,
        instance_name: &str,
    ) -> Result<i64> {
        let id = self.conn.query_row(
            "INSERT INTO audit_plans (project_id, name, instance_name, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(project_id, name) DO UPDATE SET
                instance_name=excluded.instance_name,
                deleted_at=NULL
             RETURNING id",
            params![project_id, name, instance_name, format_ts(&Utc::now())],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Soft-delete an audit plan by name. Items it reported keep their
    /// reference. Returns false when no live plan has that name.
    pub fn delete_audit_plan(&self, project_id: i64, name: &str) -> Result<bool> {
        let count = self.conn.execute(
            "UPDATE audit_plans SET deleted_at = ?1
             WHERE project_id = ?2 AND name = ?3 AND deleted_at IS NULL",
            params![format_ts(&Utc::now()), project_id, name],
        )?;
        Ok(count > 0)
    }

    /// Register an audit record by its external id, returning the row id.
    pub fn create_sql_audit_record(&self, project_id: i64, audit_record_id: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sql_audit_records (project_id, audit_record_id, created_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(audit_record_id) DO NOTHING",
            params![project_id, audit_record_id, format_ts(&Utc::now())],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM sql_audit_records WHERE audit_record_id = ?",
            [audit_record_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }
}

/// Years whose RFC 3339 form is four digits wide.
pub const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 0..=9_999;

/// Whether `ts` keeps the fixed-width text form [`format_ts`] relies on.
#[must_use]
pub fn is_storable_ts(ts: &DateTime<Utc>) -> bool {
    STORABLE_YEARS.contains(&ts.year())
}

/// Fixed-width RFC 3339 so lexical order in SQLite equals time order.
/// Callers reject times outside [`STORABLE_YEARS`] first.
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn ts_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

pub(crate) fn json_from_row<T: serde::de::DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

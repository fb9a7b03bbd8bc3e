//! Managed SQL worklist types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use super::key::DedupKey;
use super::summary::SqlManageSummary;
use crate::error::{Result, SqlmError};
use crate::storage::sqlite::{is_storable_ts, STORABLE_YEARS};

/// Which producer reported an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlManageSource {
    /// Periodic audit-plan scan
    AuditPlan,
    /// On-demand SQL audit record
    SqlAuditRecord,
}

impl SqlManageSource {
    pub const ALL: [Self; 2] = [Self::AuditPlan, Self::SqlAuditRecord];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuditPlan => "audit_plan",
            Self::SqlAuditRecord => "sql_audit_record",
        }
    }
}

impl fmt::Display for SqlManageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SqlManageSource {
    type Err = SqlmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audit_plan" | "audit-plan" | "auditplan" => Ok(Self::AuditPlan),
            "sql_audit_record" | "sql-audit-record" | "audit_record" | "auditrecord" => {
                Ok(Self::SqlAuditRecord)
            }
            other => Err(SqlmError::QueryParse(format!(
                "unknown source '{other}': expected audit_plan or sql_audit_record"
            ))),
        }
    }
}

/// Human workflow state of a managed item.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SqlManageStatus {
    #[default]
    Unhandled,
    Solved,
    Ignored,
}

impl SqlManageStatus {
    pub const ALL: [Self; 3] = [Self::Unhandled, Self::Solved, Self::Ignored];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unhandled => "unhandled",
            Self::Solved => "solved",
            Self::Ignored => "ignored",
        }
    }
}

impl fmt::Display for SqlManageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SqlManageStatus {
    type Err = SqlmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unhandled" => Ok(Self::Unhandled),
            "solved" => Ok(Self::Solved),
            "ignored" => Ok(Self::Ignored),
            other => Err(SqlmError::QueryParse(format!(
                "unknown status '{other}': expected unhandled, solved or ignored"
            ))),
        }
    }
}

macro_rules! text_enum_sql {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let raw = value.as_str()?;
                raw.parse().map_err(|err| FromSqlError::Other(Box::new(err)))
            }
        }
    };
}

text_enum_sql!(SqlManageSource);
text_enum_sql!(SqlManageStatus);

/// One rule hit produced by the auditor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResult {
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub rule_name: String,
}

/// A single raw occurrence reported by a producer.
///
/// Submitting the same occurrence twice counts it twice; producers that
/// retry must de-duplicate before calling the merge engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFinding {
    pub project_id: i64,
    pub fingerprint: String,
    pub sql_text: String,
    pub source: SqlManageSource,
    #[serde(default)]
    pub audit_level: String,
    #[serde(default)]
    pub audit_results: Vec<AuditResult>,
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub instance_name: String,
    #[serde(default)]
    pub schema_name: String,
    #[serde(default)]
    pub audit_plan_id: Option<i64>,
    #[serde(default)]
    pub sql_audit_record_id: Option<i64>,
}

impl RawFinding {
    /// Identity of the managed item this finding merges into.
    #[must_use]
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::build(
            self.project_id,
            &self.fingerprint,
            self.source,
            &self.instance_name,
            &self.schema_name,
        )
    }

    /// Reject findings that can never produce a valid item.
    pub fn validate(&self) -> Result<()> {
        if self.project_id <= 0 {
            return Err(SqlmError::ValidationFailed(format!(
                "project_id must be positive, got {}",
                self.project_id
            )));
        }
        if self.fingerprint.trim().is_empty() {
            return Err(SqlmError::ValidationFailed(
                "fingerprint must not be empty".to_string(),
            ));
        }
        if !is_storable_ts(&self.observed_at) {
            return Err(SqlmError::ValidationFailed(format!(
                "observed_at year {} is outside {}..={}",
                self.observed_at.year(),
                STORABLE_YEARS.start(),
                STORABLE_YEARS.end()
            )));
        }
        Ok(())
    }
}

/// The persisted aggregate: one row per dedup key within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedSqlItem {
    pub id: i64,
    pub fingerprint: String,
    pub sql_text: String,
    pub source: SqlManageSource,
    pub dedup_key: DedupKey,
    pub audit_level: String,
    pub audit_results: Vec<AuditResult>,
    pub fp_count: u64,
    pub first_appear_at: DateTime<Utc>,
    pub last_receive_at: DateTime<Utc>,
    pub instance_name: String,
    pub schema_name: String,
    pub status: SqlManageStatus,
    pub remark: String,
    pub assignee_ids: Vec<i64>,
    pub project_id: i64,
    pub audit_plan_id: Option<i64>,
    pub sql_audit_record_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read model served to consumers: item fields plus joined display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlManageView {
    pub id: i64,
    pub fingerprint: String,
    pub sql_text: String,
    pub source: SqlManageSource,
    pub audit_level: String,
    pub audit_results: Vec<AuditResult>,
    pub fp_count: u64,
    pub first_appear_at: DateTime<Utc>,
    pub last_receive_at: DateTime<Utc>,
    pub instance_name: String,
    pub schema_name: String,
    pub status: SqlManageStatus,
    pub remark: String,
    /// Assignee login names, sorted.
    pub assignees: Vec<String>,
    pub audit_plan_name: Option<String>,
    /// External id of the originating audit record.
    pub audit_record_id: Option<String>,
}

/// One page of the worklist with counts over the whole filtered set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlManageList {
    pub items: Vec<SqlManageView>,
    #[serde(flatten)]
    pub summary: SqlManageSummary,
}

//! Worklist filters
//!
//! A filter is a set of optional predicates combined with AND. Absent
//! predicates impose no constraint. The query engine folds over
//! [`SqlManageFilter::predicates`], so every filter has exactly one SQL
//! rendering and one in-memory rendering ([`Predicate::matches`]).

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use super::types::{SqlManageSource, SqlManageStatus, SqlManageView};
use crate::error::{Result, SqlmError};
use crate::storage::sqlite::{format_ts, is_storable_ts};

pub const PARAM_FINGERPRINT: &str = "fuzzy_search_sql_fingerprint";
pub const PARAM_ASSIGNEE: &str = "filter_assignee";
pub const PARAM_INSTANCE_NAME: &str = "filter_instance_name";
pub const PARAM_SOURCE: &str = "filter_source";
pub const PARAM_AUDIT_LEVEL: &str = "filter_audit_level";
pub const PARAM_LAST_SEEN_FROM: &str = "filter_last_audit_start_time_from";
pub const PARAM_LAST_SEEN_TO: &str = "filter_last_audit_start_time_to";
pub const PARAM_STATUS: &str = "filter_status";

/// Filters for listing the managed worklist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlManageFilter {
    /// Case-sensitive substring of the fingerprint
    pub fingerprint_contains: Option<String>,
    /// Login name that must be among the assignees
    pub assignee: Option<String>,
    pub instance_name: Option<String>,
    pub source: Option<SqlManageSource>,
    pub audit_level: Option<String>,
    /// Inclusive lower bound on `last_receive_at`
    pub last_seen_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `last_receive_at`
    pub last_seen_to: Option<DateTime<Utc>>,
    pub status: Option<SqlManageStatus>,
}

impl SqlManageFilter {
    /// Create new empty filters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fingerprint(mut self, needle: impl Into<String>) -> Self {
        self.fingerprint_contains = Some(needle.into());
        self
    }

    pub fn with_assignee(mut self, login_name: impl Into<String>) -> Self {
        self.assignee = Some(login_name.into());
        self
    }

    pub fn with_instance_name(mut self, instance_name: impl Into<String>) -> Self {
        self.instance_name = Some(instance_name.into());
        self
    }

    pub fn with_source(mut self, source: SqlManageSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_audit_level(mut self, audit_level: impl Into<String>) -> Self {
        self.audit_level = Some(audit_level.into());
        self
    }

    /// Stored times carry microsecond precision; bounds are truncated to match.
    pub fn with_last_seen_from(mut self, from: DateTime<Utc>) -> Self {
        self.last_seen_from = Some(from.trunc_subsecs(6));
        self
    }

    pub fn with_last_seen_to(mut self, to: DateTime<Utc>) -> Self {
        self.last_seen_to = Some(to.trunc_subsecs(6));
        self
    }

    pub fn with_status(mut self, status: SqlManageStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Build filters from request parameters.
    ///
    /// Empty values are treated as absent. Unknown names and unparseable
    /// values are rejected so a typo never silently widens the result set.
    pub fn from_params<'a, I>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filter = Self::new();
        for (name, value) in params {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            filter = match name {
                PARAM_FINGERPRINT => filter.with_fingerprint(value),
                PARAM_ASSIGNEE => filter.with_assignee(value),
                PARAM_INSTANCE_NAME => filter.with_instance_name(value),
                PARAM_SOURCE => filter.with_source(value.parse()?),
                PARAM_AUDIT_LEVEL => filter.with_audit_level(value),
                PARAM_LAST_SEEN_FROM => filter.with_last_seen_from(parse_time(name, value)?),
                PARAM_LAST_SEEN_TO => filter.with_last_seen_to(parse_time(name, value)?),
                PARAM_STATUS => filter.with_status(value.parse()?),
                other => {
                    return Err(SqlmError::QueryParse(format!("unknown filter '{other}'")));
                }
            };
        }
        filter.validate()?;
        Ok(filter)
    }

    /// Check time bounds are storable and form a non-empty range.
    pub fn validate(&self) -> Result<()> {
        for (name, bound) in [
            (PARAM_LAST_SEEN_FROM, self.last_seen_from),
            (PARAM_LAST_SEEN_TO, self.last_seen_to),
        ] {
            if let Some(ts) = bound {
                if !is_storable_ts(&ts) {
                    return Err(SqlmError::ValidationFailed(format!(
                        "{name}: year must have four digits"
                    )));
                }
            }
        }
        if let (Some(from), Some(to)) = (self.last_seen_from, self.last_seen_to) {
            if from > to {
                return Err(SqlmError::ValidationFailed(format!(
                    "last-seen range is empty: {} is after {}",
                    format_ts(&from),
                    format_ts(&to)
                )));
            }
        }
        Ok(())
    }

    /// Check if any filters are set
    pub fn is_empty(&self) -> bool {
        self.predicates().is_empty()
    }

    /// The present predicates, in a fixed order.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(needle) = &self.fingerprint_contains {
            predicates.push(Predicate::FingerprintContains(needle.clone()));
        }
        if let Some(login) = &self.assignee {
            predicates.push(Predicate::Assignee(login.clone()));
        }
        if let Some(instance) = &self.instance_name {
            predicates.push(Predicate::InstanceName(instance.clone()));
        }
        if let Some(source) = self.source {
            predicates.push(Predicate::Source(source));
        }
        if let Some(level) = &self.audit_level {
            predicates.push(Predicate::AuditLevel(level.clone()));
        }
        if let Some(from) = self.last_seen_from {
            predicates.push(Predicate::LastSeenFrom(from));
        }
        if let Some(to) = self.last_seen_to {
            predicates.push(Predicate::LastSeenTo(to));
        }
        if let Some(status) = self.status {
            predicates.push(Predicate::Status(status));
        }
        predicates
    }

    /// Check if a view passes all filters
    pub fn matches(&self, view: &SqlManageView) -> bool {
        self.predicates().iter().all(|p| p.matches(view))
    }
}

/// A single worklist constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    FingerprintContains(String),
    Assignee(String),
    InstanceName(String),
    Source(SqlManageSource),
    AuditLevel(String),
    LastSeenFrom(DateTime<Utc>),
    LastSeenTo(DateTime<Utc>),
    Status(SqlManageStatus),
}

impl Predicate {
    /// Request parameter name this predicate is read from.
    pub const fn param_name(&self) -> &'static str {
        match self {
            Self::FingerprintContains(_) => PARAM_FINGERPRINT,
            Self::Assignee(_) => PARAM_ASSIGNEE,
            Self::InstanceName(_) => PARAM_INSTANCE_NAME,
            Self::Source(_) => PARAM_SOURCE,
            Self::AuditLevel(_) => PARAM_AUDIT_LEVEL,
            Self::LastSeenFrom(_) => PARAM_LAST_SEEN_FROM,
            Self::LastSeenTo(_) => PARAM_LAST_SEEN_TO,
            Self::Status(_) => PARAM_STATUS,
        }
    }

    /// SQL condition over alias `sm`, bound to placeholder `?{idx}`.
    pub(crate) fn clause(&self, idx: usize) -> String {
        match self {
            // instr is case-sensitive, unlike LIKE
            Self::FingerprintContains(_) => format!("instr(sm.sql_fingerprint, ?{idx}) > 0"),
            Self::Assignee(_) => format!(
                "EXISTS (SELECT 1 FROM sql_manage_assignees fa \
                 JOIN users fu ON fu.id = fa.user_id \
                 WHERE fa.sql_manage_id = sm.id AND fu.login_name = ?{idx})"
            ),
            Self::InstanceName(_) => format!("sm.instance_name = ?{idx}"),
            Self::Source(_) => format!("sm.source = ?{idx}"),
            Self::AuditLevel(_) => format!("sm.audit_level = ?{idx}"),
            Self::LastSeenFrom(_) => format!("sm.last_receive_at >= ?{idx}"),
            Self::LastSeenTo(_) => format!("sm.last_receive_at <= ?{idx}"),
            Self::Status(_) => format!("sm.status = ?{idx}"),
        }
    }

    pub(crate) fn value(&self) -> Value {
        match self {
            Self::FingerprintContains(text)
            | Self::Assignee(text)
            | Self::InstanceName(text)
            | Self::AuditLevel(text) => Value::Text(text.clone()),
            Self::Source(source) => Value::Text(source.as_str().to_string()),
            Self::LastSeenFrom(ts) | Self::LastSeenTo(ts) => Value::Text(format_ts(ts)),
            Self::Status(status) => Value::Text(status.as_str().to_string()),
        }
    }

    /// Evaluate against an already-loaded view.
    pub fn matches(&self, view: &SqlManageView) -> bool {
        match self {
            Self::FingerprintContains(needle) => view.fingerprint.contains(needle.as_str()),
            Self::Assignee(login) => view.assignees.iter().any(|a| a == login),
            Self::InstanceName(instance) => view.instance_name == *instance,
            Self::Source(source) => view.source == *source,
            Self::AuditLevel(level) => view.audit_level == *level,
            Self::LastSeenFrom(from) => view.last_receive_at >= *from,
            Self::LastSeenTo(to) => view.last_receive_at <= *to,
            Self::Status(status) => view.status == *status,
        }
    }
}

/// Parse a filter time: RFC 3339, or `YYYY-MM-DD HH:MM:SS` taken as UTC.
pub fn parse_time(name: &str, value: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            SqlmError::QueryParse(format!(
                "{name}: '{value}' is not RFC 3339 or YYYY-MM-DD HH:MM:SS"
            ))
        })
}

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    page_index: u32,
    page_size: u32,
}

impl Pagination {
    pub fn new(page_index: u32, page_size: u32) -> Result<Self> {
        if page_index == 0 {
            return Err(SqlmError::ValidationFailed(
                "page_index starts at 1".to_string(),
            ));
        }
        if page_size == 0 {
            return Err(SqlmError::ValidationFailed(
                "page_size must be positive".to_string(),
            ));
        }
        Ok(Self {
            page_index,
            page_size,
        })
    }

    /// Reject page sizes above a configured ceiling.
    pub fn within(self, max_page_size: u32) -> Result<Self> {
        if self.page_size > max_page_size {
            return Err(SqlmError::ValidationFailed(format!(
                "page_size {} exceeds maximum {max_page_size}",
                self.page_size
            )));
        }
        Ok(self)
    }

    pub const fn page_index(&self) -> u32 {
        self.page_index
    }

    pub const fn limit(&self) -> u32 {
        self.page_size
    }

    pub const fn offset(&self) -> u64 {
        (self.page_index as u64 - 1) * self.page_size as u64
    }
}

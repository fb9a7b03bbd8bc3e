//! Worklist summary counts.

use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use super::query::WhereClause;
use super::types::{SqlManageStatus, SqlManageView};
use crate::error::{Result, ResultExt};

/// Counts over a filtered worklist, independent of pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlManageSummary {
    /// Items matching the filters
    pub total: u64,
    /// Items with audit findings that are not solved yet
    pub bad: u64,
    pub solved: u64,
}

impl SqlManageSummary {
    /// Share of the filtered set that still needs attention, in `[0, 1]`.
    #[must_use]
    pub fn bad_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.bad as f64 / self.total as f64
        }
    }
}

/// An item is bad while it carries any audit level and is not solved.
#[must_use]
pub fn is_bad(audit_level: &str, status: SqlManageStatus) -> bool {
    !audit_level.is_empty() && status != SqlManageStatus::Solved
}

/// Count already-loaded views.
pub fn tally<'a, I>(views: I) -> SqlManageSummary
where
    I: IntoIterator<Item = &'a SqlManageView>,
{
    views
        .into_iter()
        .fold(SqlManageSummary::default(), |mut acc, view| {
            acc.total += 1;
            if is_bad(&view.audit_level, view.status) {
                acc.bad += 1;
            }
            if view.status == SqlManageStatus::Solved {
                acc.solved += 1;
            }
            acc
        })
}

/// Count the rows selected by `filter` in the store.
pub(crate) fn compute(conn: &Connection, filter: &WhereClause) -> Result<SqlManageSummary> {
    let sql = format!(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN sm.audit_level != ''
                    AND sm.status != 'solved' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN sm.status = 'solved' THEN 1 ELSE 0 END), 0)
         FROM sql_manages sm
         JOIN projects p ON p.id = sm.project_id
         WHERE {}",
        filter.sql
    );
    let (total, bad, solved): (i64, i64, i64) = conn
        .query_row(&sql, params_from_iter(filter.params.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .read_context("query sql manage summary")?;

    Ok(SqlManageSummary {
        total: total as u64,
        bad: bad as u64,
        solved: solved as u64,
    })
}

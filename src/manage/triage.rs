//! Human workflow operations on managed items.
//!
//! These are the only writers of `status`, `remark` and assignees.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::types::SqlManageStatus;
use crate::error::{Result, ResultExt, SqlmError};
use crate::storage::sqlite::{format_ts, Database};

/// Fields to change on a set of items. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlManageUpdate {
    pub status: Option<SqlManageStatus>,
    pub remark: Option<String>,
    /// Replaces the whole assignee list; `Some(vec![])` clears it.
    pub assignees: Option<Vec<String>>,
}

impl SqlManageUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.remark.is_none() && self.assignees.is_none()
    }
}

/// Apply `update` to every id, all or nothing.
///
/// Ids must name live items of the project; an unknown assignee login
/// aborts the whole update. Returns the number of distinct items updated.
pub fn update_items(
    db: &mut Database,
    project_name: &str,
    ids: &[i64],
    update: &SqlManageUpdate,
) -> Result<usize> {
    if ids.is_empty() || update.is_empty() {
        return Ok(0);
    }
    let project_id = db.require_project(project_name)?;
    let now = format_ts(&Utc::now());
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let tx = db
        .write_transaction()
        .write_context("update sql manages: begin transaction")?;

    let user_ids = match &update.assignees {
        Some(logins) => {
            let mut resolved = Vec::with_capacity(logins.len());
            for login in logins {
                let id: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM users WHERE login_name = ?1 AND deleted_at IS NULL",
                        [login],
                        |row| row.get(0),
                    )
                    .optional()
                    .with_write_context(|| format!("read user {login}"))?;
                resolved.push(id.ok_or_else(|| SqlmError::UserNotFound(login.clone()))?);
            }
            resolved.sort_unstable();
            resolved.dedup();
            Some(resolved)
        }
        None => None,
    };

    for &id in &ids {
        let changed = tx
            .execute(
                "UPDATE sql_manages SET
                    status = COALESCE(?1, status),
                    remark = COALESCE(?2, remark),
                    updated_at = ?3
                 WHERE id = ?4 AND project_id = ?5 AND deleted_at IS NULL",
                params![update.status, update.remark, now, id, project_id],
            )
            .with_write_context(|| format!("update sql manage {id}"))?;
        if changed == 0 {
            return Err(SqlmError::ItemNotFound(id));
        }

        if let Some(user_ids) = &user_ids {
            tx.execute(
                "DELETE FROM sql_manage_assignees WHERE sql_manage_id = ?1",
                [id],
            )
            .with_write_context(|| format!("update sql manage {id}: clear assignees"))?;
            for user_id in user_ids {
                tx.execute(
                    "INSERT INTO sql_manage_assignees (sql_manage_id, user_id) VALUES (?1, ?2)",
                    params![id, user_id],
                )
                .with_write_context(|| format!("update sql manage {id}: assign user {user_id}"))?;
            }
        }
    }
    tx.commit().write_context("update sql manages: commit")?;

    info!(project = project_name, count = ids.len(), "updated sql manage items");
    Ok(ids.len())
}

/// Hide items from every read. Already-deleted or foreign ids are skipped.
pub fn soft_delete(db: &mut Database, project_name: &str, ids: &[i64]) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let project_id = db.require_project(project_name)?;
    let now = format_ts(&Utc::now());

    let tx = db
        .write_transaction()
        .write_context("delete sql manages: begin transaction")?;
    let mut deleted = 0;
    {
        let mut stmt = tx
            .prepare_cached(
                "UPDATE sql_manages SET deleted_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND project_id = ?3 AND deleted_at IS NULL",
            )
            .write_context("delete sql manages: prepare")?;
        for &id in ids {
            deleted += stmt
                .execute(params![now, id, project_id])
                .with_write_context(|| format!("delete sql manage {id}"))?;
        }
    }
    tx.commit().write_context("delete sql manages: commit")?;

    info!(project = project_name, deleted, "soft-deleted sql manage items");
    Ok(deleted)
}

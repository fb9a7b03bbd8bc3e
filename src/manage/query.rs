//! Worklist reads
//!
//! [`query`] renders the present filter predicates into one parameterized
//! conjunction. The page and its summary are read in the same read
//! transaction, so counts always describe the snapshot the page came from.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::debug;

use super::filter::{Pagination, SqlManageFilter};
use super::key::DedupKey;
use super::summary;
use super::types::{ManagedSqlItem, SqlManageList, SqlManageView};
use crate::error::{Result, ResultExt, SqlmError};
use crate::storage::sqlite::{json_from_row, ts_from_row, Database};

const VIEW_SELECT: &str = "
SELECT sm.id, sm.sql_fingerprint, sm.sql_text, sm.source, sm.audit_level,
       sm.audit_results, sm.fp_count, sm.first_appear_at, sm.last_receive_at,
       sm.instance_name, sm.schema_name, sm.status, sm.remark,
       json_group_array(u.login_name) FILTER (WHERE u.login_name IS NOT NULL),
       ap.name, sar.audit_record_id
FROM sql_manages sm
JOIN projects p ON p.id = sm.project_id
LEFT JOIN audit_plans ap ON ap.id = sm.audit_plan_id
LEFT JOIN sql_audit_records sar ON sar.id = sm.sql_audit_record_id
LEFT JOIN sql_manage_assignees sma ON sma.sql_manage_id = sm.id
LEFT JOIN users u ON u.id = sma.user_id";

const ITEM_SELECT: &str = "
SELECT sm.id, sm.sql_fingerprint, sm.sql_text, sm.source, sm.dedup_key,
       sm.audit_level, sm.audit_results, sm.fp_count, sm.first_appear_at,
       sm.last_receive_at, sm.instance_name, sm.schema_name, sm.status,
       sm.remark,
       json_group_array(sma.user_id) FILTER (WHERE sma.user_id IS NOT NULL),
       sm.project_id, sm.audit_plan_id, sm.sql_audit_record_id,
       sm.created_at, sm.updated_at
FROM sql_manages sm
LEFT JOIN sql_manage_assignees sma ON sma.sql_manage_id = sm.id";

/// A rendered `WHERE` body over aliases `sm` (items) and `p` (projects).
#[derive(Debug, Clone)]
pub(crate) struct WhereClause {
    pub(crate) sql: String,
    pub(crate) params: Vec<Value>,
}

/// Scope to one project's live items, then AND every present predicate.
pub(crate) fn build_where(project_name: &str, filter: &SqlManageFilter) -> WhereClause {
    let mut clauses = vec![
        "p.name = ?1".to_string(),
        "sm.deleted_at IS NULL".to_string(),
    ];
    let mut params = vec![Value::Text(project_name.to_string())];

    for predicate in filter.predicates() {
        params.push(predicate.value());
        clauses.push(predicate.clause(params.len()));
    }

    WhereClause {
        sql: clauses.join(" AND "),
        params,
    }
}

/// List a project's worklist, newest item first.
///
/// Without `page` every matching row is returned. The summary always
/// covers the whole filtered set. An unknown project yields an empty list.
pub fn query(
    db: &Database,
    project_name: &str,
    filter: &SqlManageFilter,
    page: Option<Pagination>,
) -> Result<SqlManageList> {
    filter.validate()?;

    let clause = build_where(project_name, filter);
    let mut sql = format!(
        "{VIEW_SELECT}\nWHERE {}\nGROUP BY sm.id\nORDER BY sm.id DESC",
        clause.sql
    );
    let mut params = clause.params.clone();
    if let Some(page) = page {
        sql.push_str(&format!(
            "\nLIMIT ?{} OFFSET ?{}",
            params.len() + 1,
            params.len() + 2
        ));
        params.push(Value::Integer(i64::from(page.limit())));
        let offset = i64::try_from(page.offset()).map_err(|_| {
            SqlmError::ValidationFailed(format!(
                "page {} of size {} is past the end of any result",
                page.page_index(),
                page.limit()
            ))
        })?;
        params.push(Value::Integer(offset));
    }
    debug!(project = project_name, predicates = clause.params.len() - 1, sql = %sql, "query sql manages");

    let tx = db
        .conn()
        .unchecked_transaction()
        .read_context("query sql manages: begin read")?;
    let items = {
        let mut stmt = tx.prepare(&sql).read_context("query sql manages: prepare")?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), view_from_row)
            .read_context("query sql manages")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .read_context("query sql manages: read row")?
    };
    let summary = summary::compute(&tx, &clause)?;
    tx.commit().read_context("query sql manages: end read")?;

    Ok(SqlManageList { items, summary })
}

/// Look up the item a dedup key maps to. Soft-deleted items are not returned.
pub fn find_by_dedup_key(
    db: &Database,
    project_id: i64,
    key: &DedupKey,
) -> Result<Option<ManagedSqlItem>> {
    let sql = format!(
        "{ITEM_SELECT}
         WHERE sm.project_id = ?1 AND sm.dedup_key = ?2 AND sm.deleted_at IS NULL
         GROUP BY sm.id"
    );
    db.conn()
        .query_row(&sql, params![project_id, key], item_from_row)
        .optional()
        .with_read_context(|| format!("read sql manage by key {key}"))
}

/// Load one live item by id.
pub fn get_item(db: &Database, id: i64) -> Result<Option<ManagedSqlItem>> {
    let sql = format!(
        "{ITEM_SELECT}
         WHERE sm.id = ?1 AND sm.deleted_at IS NULL
         GROUP BY sm.id"
    );
    db.conn()
        .query_row(&sql, [id], item_from_row)
        .optional()
        .with_read_context(|| format!("read sql manage {id}"))
}

/// Every live item across all projects, oldest first.
pub fn list_all(db: &Database) -> Result<Vec<ManagedSqlItem>> {
    let sql = format!(
        "{ITEM_SELECT}
         WHERE sm.deleted_at IS NULL
         GROUP BY sm.id
         ORDER BY sm.id"
    );
    let mut stmt = db.conn().prepare(&sql).read_context("read all sql manages: prepare")?;
    let rows = stmt
        .query_map([], item_from_row)
        .read_context("read all sql manages")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .read_context("read all sql manages: read row")
}

fn view_from_row(row: &Row<'_>) -> rusqlite::Result<SqlManageView> {
    let mut assignees: Vec<String> = json_from_row(row, 13)?;
    assignees.sort();
    assignees.dedup();

    Ok(SqlManageView {
        id: row.get(0)?,
        fingerprint: row.get(1)?,
        sql_text: row.get(2)?,
        source: row.get(3)?,
        audit_level: row.get(4)?,
        audit_results: json_from_row(row, 5)?,
        fp_count: row.get::<_, i64>(6)? as u64,
        first_appear_at: ts_from_row(row, 7)?,
        last_receive_at: ts_from_row(row, 8)?,
        instance_name: row.get(9)?,
        schema_name: row.get(10)?,
        status: row.get(11)?,
        remark: row.get(12)?,
        assignees,
        audit_plan_name: row.get(14)?,
        audit_record_id: row.get(15)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ManagedSqlItem> {
    let mut assignee_ids: Vec<i64> = json_from_row(row, 14)?;
    assignee_ids.sort_unstable();

    Ok(ManagedSqlItem {
        id: row.get(0)?,
        fingerprint: row.get(1)?,
        sql_text: row.get(2)?,
        source: row.get(3)?,
        dedup_key: row.get(4)?,
        audit_level: row.get(5)?,
        audit_results: json_from_row(row, 6)?,
        fp_count: row.get::<_, i64>(7)? as u64,
        first_appear_at: ts_from_row(row, 8)?,
        last_receive_at: ts_from_row(row, 9)?,
        instance_name: row.get(10)?,
        schema_name: row.get(11)?,
        status: row.get(12)?,
        remark: row.get(13)?,
        assignee_ids,
        project_id: row.get(15)?,
        audit_plan_id: row.get(16)?,
        sql_audit_record_id: row.get(17)?,
        created_at: ts_from_row(row, 18)?,
        updated_at: ts_from_row(row, 19)?,
    })
}

//! Merge-upsert engine
//!
//! Turns a batch of raw findings into managed items. A finding whose dedup
//! key is new creates an item; otherwise it merges into the existing one.
//!
//! ## Field policy on merge
//!
//! | field | rule |
//! |---|---|
//! | `fp_count` | incremented by the batch contribution |
//! | `last_receive_at` | `max(existing, observed)` |
//! | `first_appear_at` | never changes |
//! | `sql_text`, `audit_level`, `audit_results`, plan/record ids | taken from the newest observation |
//! | `status`, `remark`, assignees | never touched |
//!
//! The batch is one immediate transaction: readers see all of it or none
//! of it. The unique index on `(project_id, dedup_key)` makes
//! insert-or-merge atomic under concurrent batches.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::key::DedupKey;
use super::types::{RawFinding, SqlManageStatus};
use crate::error::{Result, ResultExt};
use crate::storage::sqlite::{format_ts, Database};

const UPSERT_SQL: &str = "
INSERT INTO sql_manages (
    created_at, updated_at, sql_fingerprint, dedup_key, sql_text, source,
    audit_level, audit_results, fp_count, first_appear_at, last_receive_at,
    instance_name, schema_name, status, remark, project_id, audit_plan_id,
    sql_audit_record_id
) VALUES (?1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, '', ?14, ?15, ?16)
ON CONFLICT(project_id, dedup_key) DO UPDATE SET
    updated_at = excluded.updated_at,
    sql_text = CASE WHEN excluded.last_receive_at >= sql_manages.last_receive_at
        THEN excluded.sql_text ELSE sql_manages.sql_text END,
    audit_level = CASE WHEN excluded.last_receive_at >= sql_manages.last_receive_at
        THEN excluded.audit_level ELSE sql_manages.audit_level END,
    audit_results = CASE WHEN excluded.last_receive_at >= sql_manages.last_receive_at
        THEN excluded.audit_results ELSE sql_manages.audit_results END,
    audit_plan_id = CASE WHEN excluded.last_receive_at >= sql_manages.last_receive_at
        THEN excluded.audit_plan_id ELSE sql_manages.audit_plan_id END,
    sql_audit_record_id = CASE WHEN excluded.last_receive_at >= sql_manages.last_receive_at
        THEN excluded.sql_audit_record_id ELSE sql_manages.sql_audit_record_id END,
    fp_count = sql_manages.fp_count + excluded.fp_count,
    last_receive_at = MAX(sql_manages.last_receive_at, excluded.last_receive_at)
RETURNING id, fp_count";

/// Outcome of one merge batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Items created by this batch
    pub inserted: usize,
    /// Existing items that absorbed occurrences
    pub merged: usize,
    /// Raw findings accounted for
    pub occurrences: u64,
}

/// Findings sharing a dedup key, folded into one write.
#[derive(Debug)]
struct PendingMerge<'a> {
    key: DedupKey,
    latest: &'a RawFinding,
    count: u64,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

impl<'a> PendingMerge<'a> {
    fn new(key: DedupKey, finding: &'a RawFinding) -> Self {
        Self {
            key,
            latest: finding,
            count: 1,
            first_seen: finding.observed_at,
            last_seen: finding.observed_at,
        }
    }

    fn absorb(&mut self, finding: &'a RawFinding) {
        self.count += 1;
        self.first_seen = self.first_seen.min(finding.observed_at);
        self.last_seen = self.last_seen.max(finding.observed_at);
        // later batch position wins ties
        if finding.observed_at >= self.latest.observed_at {
            self.latest = finding;
        }
    }
}

/// Group findings by dedup key, keeping first-appearance order so new items
/// get ids in batch order.
fn fold_batch(findings: &[RawFinding]) -> Vec<PendingMerge<'_>> {
    let mut slots: HashMap<DedupKey, usize> = HashMap::new();
    let mut pending: Vec<PendingMerge<'_>> = Vec::new();

    for finding in findings {
        let key = finding.dedup_key();
        if let Some(&slot) = slots.get(&key) {
            pending[slot].absorb(finding);
        } else {
            slots.insert(key.clone(), pending.len());
            pending.push(PendingMerge::new(key, finding));
        }
    }

    pending
}

/// Insert or merge a batch of raw findings.
///
/// Every finding is validated before the store is touched. Any store
/// failure rolls the whole batch back and is returned as
/// [`SqlmError::Storage`](crate::error::SqlmError::Storage); nothing is
/// retried here.
pub fn merge_batch(db: &mut Database, findings: &[RawFinding]) -> Result<MergeReport> {
    if findings.is_empty() {
        return Ok(MergeReport::default());
    }
    for finding in findings {
        finding.validate()?;
    }

    let pending = fold_batch(findings);
    let now = format_ts(&Utc::now());
    let mut report = MergeReport {
        occurrences: findings.len() as u64,
        ..MergeReport::default()
    };

    let tx = db
        .write_transaction()
        .write_context("merge batch: begin transaction")?;
    {
        let mut stmt = tx
            .prepare_cached(UPSERT_SQL)
            .write_context("merge batch: prepare upsert")?;

        for merge in &pending {
            let finding = merge.latest;
            let audit_results = serde_json::to_string(&finding.audit_results)?;
            let (id, fp_count): (i64, i64) = stmt
                .query_row(
                    params![
                        now,
                        finding.fingerprint,
                        merge.key,
                        finding.sql_text,
                        finding.source,
                        finding.audit_level,
                        audit_results,
                        merge.count as i64,
                        format_ts(&merge.first_seen),
                        format_ts(&merge.last_seen),
                        finding.instance_name,
                        finding.schema_name,
                        SqlManageStatus::Unhandled,
                        finding.project_id,
                        finding.audit_plan_id,
                        finding.sql_audit_record_id,
                    ],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .with_write_context(|| {
                    format!("merge batch: insert-or-merge sql_manages key {}", merge.key)
                })?;

            // An existing row already holds at least one occurrence, so the
            // stored count equals the contribution only for a fresh insert.
            if fp_count as u64 == merge.count {
                report.inserted += 1;
            } else {
                report.merged += 1;
            }
            debug!(id, key = %merge.key, contribution = merge.count, fp_count, "upserted sql manage item");
        }
    }
    tx.commit().write_context("merge batch: commit")?;

    info!(
        inserted = report.inserted,
        merged = report.merged,
        occurrences = report.occurrences,
        "merged sql manage batch"
    );
    Ok(report)
}

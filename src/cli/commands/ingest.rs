//! sqlm ingest - Merge raw findings into the worklist

use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use tracing::{info, warn};

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::{Result, SqlmError};
use crate::manage::{merge_batch, MergeReport, RawFinding};
use crate::storage::sqlite::Database;

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Findings file (JSON array or one JSON object per line); `-` for stdin
    pub input: PathBuf,

    /// Override merge.max_batch_size
    #[arg(long)]
    pub batch_size: Option<usize>,
}

pub fn run(ctx: &mut AppContext, args: &IngestArgs) -> Result<()> {
    let raw = if args.input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.input)?
    };
    let findings = parse_findings(&raw)?;

    let batch_size = args.batch_size.unwrap_or(ctx.config.merge.max_batch_size);
    if batch_size == 0 {
        return Err(SqlmError::ValidationFailed(
            "batch size must be positive".to_string(),
        ));
    }

    let (total, batches) = ingest_chunks(&mut ctx.db, &findings, batch_size)?;
    info!(batches, occurrences = total.occurrences, "ingest complete");

    if ctx.robot_mode {
        let data = serde_json::json!({ "batches": batches, "report": total });
        emit_robot(&robot_ok(data), ctx.robot_format)
    } else {
        println!(
            "{} {} findings in {batches} batch(es): {} new, {} merged",
            "Ingested".green(),
            total.occurrences,
            total.inserted.to_string().bold(),
            total.merged
        );
        Ok(())
    }
}

/// Merge findings in chunks of `batch_size`, one transaction per chunk.
///
/// Every finding is validated before the first chunk commits. A store
/// failure after some chunks committed comes back as
/// [`SqlmError::IngestIncomplete`] so the caller knows what landed.
pub fn ingest_chunks(
    db: &mut Database,
    findings: &[RawFinding],
    batch_size: usize,
) -> Result<(MergeReport, usize)> {
    for (idx, finding) in findings.iter().enumerate() {
        finding.validate().map_err(|err| match err {
            SqlmError::ValidationFailed(msg) => {
                SqlmError::ValidationFailed(format!("finding {}: {msg}", idx + 1))
            }
            other => other,
        })?;
    }

    let mut total = MergeReport::default();
    let mut batches = 0;
    for chunk in findings.chunks(batch_size) {
        let report = match merge_batch(db, chunk) {
            Ok(report) => report,
            Err(err) if batches == 0 => return Err(err),
            Err(err) => {
                warn!(batches, occurrences = total.occurrences, "ingest stopped midway");
                return Err(SqlmError::IngestIncomplete {
                    committed_batches: batches,
                    committed_occurrences: total.occurrences,
                    source: Box::new(err),
                });
            }
        };
        total.inserted += report.inserted;
        total.merged += report.merged;
        total.occurrences += report.occurrences;
        batches += 1;
    }
    Ok((total, batches))
}

/// Accept a JSON array or JSON lines; blank lines are skipped.
pub fn parse_findings(raw: &str) -> Result<Vec<RawFinding>> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    let mut findings = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let finding = serde_json::from_str(line).map_err(|err| {
            SqlmError::ValidationFailed(format!("line {}: {err}", lineno + 1))
        })?;
        findings.push(finding);
    }
    Ok(findings)
}

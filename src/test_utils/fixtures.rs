use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use crate::manage::{merge_batch, MergeReport, RawFinding, SqlManageSource};
use crate::storage::Database;

/// Parse an RFC 3339 literal; test input only.
pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid RFC 3339 literal")
        .with_timezone(&Utc)
}

/// On-disk worklist database with one registered project.
pub struct WorklistFixture {
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
    pub db: Database,
    pub project_name: String,
    pub project_id: i64,
}

impl WorklistFixture {
    pub fn new() -> Self {
        Self::with_project("payments")
    }

    pub fn with_project(project_name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("sqlm.db");
        let db = Database::open(&db_path).expect("Failed to open database");
        let project_id = db
            .ensure_project(project_name)
            .expect("Failed to register project");

        println!("[FIXTURE] Created worklist database: {:?}", db_path);

        Self {
            temp_dir,
            db_path,
            db,
            project_name: project_name.to_string(),
            project_id,
        }
    }

    /// Start a finding for this fixture's project.
    pub fn finding(&self, fingerprint: &str) -> FindingBuilder {
        FindingBuilder::new(self.project_id, fingerprint)
    }

    pub fn merge(&mut self, findings: &[RawFinding]) -> MergeReport {
        merge_batch(&mut self.db, findings).expect("Failed to merge batch")
    }

    pub fn add_user(&self, login_name: &str) -> i64 {
        self.db.ensure_user(login_name).expect("Failed to register user")
    }
}

impl Default for WorklistFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorklistFixture {
    fn drop(&mut self) {
        println!("[FIXTURE] Cleaning up temp directory: {:?}", self.temp_dir.path());
    }
}

/// Builder for [`RawFinding`] with test-friendly defaults.
#[derive(Debug, Clone)]
pub struct FindingBuilder {
    finding: RawFinding,
}

impl FindingBuilder {
    pub fn new(project_id: i64, fingerprint: &str) -> Self {
        Self {
            finding: RawFinding {
                project_id,
                fingerprint: fingerprint.to_string(),
                sql_text: fingerprint.to_string(),
                source: SqlManageSource::AuditPlan,
                audit_level: String::new(),
                audit_results: Vec::new(),
                observed_at: at("2025-01-01T00:00:00Z"),
                instance_name: "db1".to_string(),
                schema_name: "app".to_string(),
                audit_plan_id: None,
                sql_audit_record_id: None,
            },
        }
    }

    pub fn source(mut self, source: SqlManageSource) -> Self {
        self.finding.source = source;
        self
    }

    pub fn level(mut self, audit_level: &str) -> Self {
        self.finding.audit_level = audit_level.to_string();
        self
    }

    pub fn sql_text(mut self, sql_text: &str) -> Self {
        self.finding.sql_text = sql_text.to_string();
        self
    }

    pub fn observed(mut self, rfc3339: &str) -> Self {
        self.finding.observed_at = at(rfc3339);
        self
    }

    pub fn instance(mut self, instance_name: &str) -> Self {
        self.finding.instance_name = instance_name.to_string();
        self
    }

    pub fn schema(mut self, schema_name: &str) -> Self {
        self.finding.schema_name = schema_name.to_string();
        self
    }

    pub fn audit_plan(mut self, audit_plan_id: i64) -> Self {
        self.finding.audit_plan_id = Some(audit_plan_id);
        self
    }

    pub fn audit_record(mut self, sql_audit_record_id: i64) -> Self {
        self.finding.sql_audit_record_id = Some(sql_audit_record_id);
        self
    }

    pub fn build(self) -> RawFinding {
        self.finding
    }
}

use sqlm::manage::{find_by_dedup_key, list_all, query, SqlManageFilter, SqlManageSource, SqlManageStatus};
use sqlm::storage::Database;
use sqlm::test_utils::{at, TestLogger, WorklistFixture};

#[test]
fn test_first_and_second_occurrence_scenario() {
    let log = TestLogger::new("test_first_and_second_occurrence_scenario");
    let mut fx = WorklistFixture::new();

    let f1 = fx
        .finding("SELECT *")
        .instance("I1")
        .schema("S1")
        .observed("2025-03-01T08:00:00Z")
        .build();
    let report = fx.merge(std::slice::from_ref(&f1));
    assert_eq!(report.inserted, 1);

    let item = find_by_dedup_key(&fx.db, fx.project_id, &f1.dedup_key())
        .unwrap()
        .unwrap();
    assert_eq!(item.fp_count, 1);
    assert_eq!(item.status, SqlManageStatus::Unhandled);
    assert_eq!(item.audit_level, "");

    let f2 = fx
        .finding("SELECT *")
        .instance("I1")
        .schema("S1")
        .level("high")
        .observed("2025-03-01T09:00:00Z")
        .build();
    let report = fx.merge(&[f2]);
    assert_eq!(report.merged, 1);

    let item = find_by_dedup_key(&fx.db, fx.project_id, &f1.dedup_key())
        .unwrap()
        .unwrap();
    log.log_actual(&item);
    assert_eq!(item.fp_count, 2);
    assert_eq!(item.audit_level, "high");
    assert_eq!(item.last_receive_at, at("2025-03-01T09:00:00Z"));
    assert_eq!(item.first_appear_at, at("2025-03-01T08:00:00Z"));

    let filter = SqlManageFilter::new().with_audit_level("high");
    let list = query(&fx.db, &fx.project_name, &filter, None).unwrap();
    assert_eq!(list.items.len(), 1);
    assert_eq!(list.summary.total, 1);
    assert_eq!(list.summary.bad, 1);
    assert_eq!(list.summary.solved, 0);

    log.pass();
}

#[test]
fn test_occurrence_count_equals_merged_findings() {
    let log = TestLogger::new("test_occurrence_count_equals_merged_findings");
    let mut fx = WorklistFixture::new();

    // 7 findings for one key, spread over 3 batches and shuffled in time
    let times = [
        "2025-01-04T00:00:00Z",
        "2025-01-01T00:00:00Z",
        "2025-01-07T00:00:00Z",
        "2025-01-02T00:00:00Z",
        "2025-01-06T00:00:00Z",
        "2025-01-03T00:00:00Z",
        "2025-01-05T00:00:00Z",
    ];
    let findings: Vec<_> = times
        .iter()
        .map(|t| fx.finding("UPDATE orders SET state = ?").observed(t).build())
        .collect();
    log.log_input("findings", &findings.len());

    fx.merge(&findings[..2]);
    fx.merge(&findings[2..5]);
    fx.merge(&findings[5..]);

    let items = list_all(&fx.db).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].fp_count, 7);
    assert_eq!(items[0].last_receive_at, at("2025-01-07T00:00:00Z"));
    // the first batch set first_appear_at; later, older batches do not move it
    assert_eq!(items[0].first_appear_at, at("2025-01-01T00:00:00Z"));

    log.pass();
}

#[test]
fn test_key_components_split_items() {
    let mut fx = WorklistFixture::new();
    let other_project = fx.db.ensure_project("billing").unwrap();

    let batch = vec![
        fx.finding("SELECT 1").build(),
        fx.finding("SELECT 1").build(),
        fx.finding("SELECT 1").source(SqlManageSource::SqlAuditRecord).build(),
        fx.finding("SELECT 1").instance("db2").build(),
        fx.finding("SELECT 1").schema("other").build(),
        fx.finding("SELECT 2").build(),
    ];
    let report = fx.merge(&batch);
    assert_eq!(report.inserted, 5);
    assert_eq!(report.occurrences, 6);

    let mut foreign = fx.finding("SELECT 1").build();
    foreign.project_id = other_project;
    let report = fx.merge(&[foreign]);
    assert_eq!(report.inserted, 1);

    let items = list_all(&fx.db).unwrap();
    assert_eq!(items.len(), 6);
    let mut keys: Vec<_> = items.iter().map(|i| i.dedup_key.clone()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 6);
}

#[test]
fn test_merge_survives_reopen() {
    let mut fx = WorklistFixture::new();
    let first = fx.finding("SELECT 1").observed("2025-01-01T00:00:00Z").build();
    fx.merge(&[first]);

    let mut reopened = Database::open(&fx.db_path).unwrap();
    sqlm::manage::merge_batch(
        &mut reopened,
        &[fx.finding("SELECT 1").observed("2025-01-02T00:00:00Z").build()],
    )
    .unwrap();

    let items = list_all(&fx.db).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].fp_count, 2);
}

#[test]
fn test_audit_results_follow_newest_observation() {
    let mut fx = WorklistFixture::new();
    let mut newer = fx.finding("DELETE FROM t").observed("2025-02-01T00:00:00Z").build();
    newer.audit_results = vec![sqlm::manage::AuditResult {
        level: "error".to_string(),
        message: "delete without where".to_string(),
        rule_name: "dml_check_where".to_string(),
    }];
    let older = fx.finding("DELETE FROM t").observed("2025-01-01T00:00:00Z").build();

    // both in one batch, older last in batch order
    fx.merge(&[newer.clone(), older]);

    let item = find_by_dedup_key(&fx.db, fx.project_id, &newer.dedup_key())
        .unwrap()
        .unwrap();
    assert_eq!(item.fp_count, 2);
    assert_eq!(item.audit_results, newer.audit_results);
    assert_eq!(item.first_appear_at, at("2025-01-01T00:00:00Z"));
}

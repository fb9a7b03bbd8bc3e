use sqlm::manage::{
    find_by_dedup_key, get_item, query, soft_delete, update_items, SqlManageFilter,
    SqlManageStatus, SqlManageUpdate,
};
use sqlm::test_utils::{TestLogger, WorklistFixture};
use sqlm::SqlmError;

#[test]
fn test_solved_item_stays_solved_after_new_occurrences() {
    let log = TestLogger::new("test_solved_item_stays_solved_after_new_occurrences");
    let mut fx = WorklistFixture::new();
    fx.add_user("alice");
    let project = fx.project_name.clone();

    let first = fx
        .finding("SELECT * FROM orders")
        .level("warn")
        .observed("2025-01-01T00:00:00Z")
        .build();
    fx.merge(std::slice::from_ref(&first));
    let id = find_by_dedup_key(&fx.db, fx.project_id, &first.dedup_key())
        .unwrap()
        .unwrap()
        .id;

    let update = SqlManageUpdate {
        status: Some(SqlManageStatus::Solved),
        remark: Some("rewritten with index hint".to_string()),
        assignees: Some(vec!["alice".to_string()]),
    };
    update_items(&mut fx.db, &project, &[id], &update).unwrap();

    for day in 2..=4 {
        let again = fx
            .finding("SELECT * FROM orders")
            .level("error")
            .observed(&format!("2025-01-0{day}T00:00:00Z"))
            .build();
        fx.merge(&[again]);
    }

    let item = get_item(&fx.db, id).unwrap().unwrap();
    log.log_actual(&item);
    assert_eq!(item.fp_count, 4);
    assert_eq!(item.audit_level, "error");
    assert_eq!(item.status, SqlManageStatus::Solved);
    assert_eq!(item.remark, "rewritten with index hint");
    assert_eq!(item.assignee_ids.len(), 1);

    let list = query(&fx.db, &project, &SqlManageFilter::new(), None).unwrap();
    assert_eq!(list.summary.bad, 0);
    assert_eq!(list.summary.solved, 1);

    log.pass();
}

#[test]
fn test_reopening_an_item_makes_it_bad_again() {
    let mut fx = WorklistFixture::new();
    let project = fx.project_name.clone();
    let finding = fx.finding("UPDATE t SET a = ?").level("warn").build();
    fx.merge(&[finding]);

    let solve = SqlManageUpdate {
        status: Some(SqlManageStatus::Solved),
        ..SqlManageUpdate::default()
    };
    update_items(&mut fx.db, &project, &[1], &solve).unwrap();
    assert_eq!(
        query(&fx.db, &project, &SqlManageFilter::new(), None)
            .unwrap()
            .summary
            .bad,
        0
    );

    let reopen = SqlManageUpdate {
        status: Some(SqlManageStatus::Unhandled),
        ..SqlManageUpdate::default()
    };
    update_items(&mut fx.db, &project, &[1], &reopen).unwrap();
    assert_eq!(
        query(&fx.db, &project, &SqlManageFilter::new(), None)
            .unwrap()
            .summary
            .bad,
        1
    );
}

#[test]
fn test_triage_is_scoped_to_project() {
    let mut fx = WorklistFixture::new();
    let other = fx.db.ensure_project("billing").unwrap();
    let mut foreign = fx.finding("SELECT 1").build();
    foreign.project_id = other;
    fx.merge(&[foreign]);

    let project = fx.project_name.clone();
    let update = SqlManageUpdate {
        status: Some(SqlManageStatus::Ignored),
        ..SqlManageUpdate::default()
    };
    let err = update_items(&mut fx.db, &project, &[1], &update).unwrap_err();
    assert!(matches!(err, SqlmError::ItemNotFound(1)));
    assert_eq!(soft_delete(&mut fx.db, &project, &[1]).unwrap(), 0);

    assert_eq!(
        get_item(&fx.db, 1).unwrap().unwrap().status,
        SqlManageStatus::Unhandled
    );
}

#[test]
fn test_error_codes_for_workflow_failures() {
    let mut fx = WorklistFixture::new();
    let project = fx.project_name.clone();
    let finding = fx.finding("SELECT 1").build();
    fx.merge(&[finding]);

    let assign = SqlManageUpdate {
        assignees: Some(vec!["ghost".to_string()]),
        ..SqlManageUpdate::default()
    };
    let err = update_items(&mut fx.db, &project, &[1], &assign).unwrap_err();
    let structured = err.to_structured();
    assert_eq!(structured.numeric_code, 103);
    assert_eq!(structured.category, "item");

    let err = soft_delete(&mut fx.db, "missing", &[1]).unwrap_err();
    assert_eq!(err.to_structured().numeric_code, 102);
}

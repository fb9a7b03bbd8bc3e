use super::fixture::TestFixture;

fn finding_line(project_id: i64, fingerprint: &str, level: &str, observed_at: &str) -> String {
    serde_json::json!({
        "project_id": project_id,
        "fingerprint": fingerprint,
        "sql_text": fingerprint,
        "source": "audit_plan",
        "audit_level": level,
        "observed_at": observed_at,
        "instance_name": "db1",
        "schema_name": "app",
    })
    .to_string()
}

fn register_project(fixture: &TestFixture, name: &str) -> i64 {
    let out = fixture.run_sqlm(&["--robot", "register", "project", name]);
    crate::assert_command_success!(out);
    out.json()["data"]["id"].as_i64().expect("project id")
}

#[test]
fn test_ingest_list_triage_workflow() {
    let fixture = TestFixture::new("test_ingest_list_triage_workflow");
    let project_id = register_project(&fixture, "payments");

    let user = fixture.run_sqlm(&["--robot", "register", "user", "alice"]);
    crate::assert_command_success!(user);

    let findings = [
        finding_line(project_id, "SELECT * FROM a", "", "2025-01-01T00:00:00Z"),
        finding_line(project_id, "SELECT * FROM a", "error", "2025-01-02T00:00:00Z"),
        finding_line(project_id, "SELECT * FROM b", "warn", "2025-01-03T00:00:00Z"),
    ]
    .join("\n");
    let input = fixture.root.join("findings.jsonl");
    std::fs::write(&input, findings).unwrap();

    let ingest = fixture.run_sqlm(&["--robot", "ingest", input.to_str().unwrap()]);
    crate::assert_command_success!(ingest);
    let report = ingest.json();
    assert_eq!(report["status"], "ok");
    assert_eq!(report["data"]["report"]["inserted"], 2);
    assert_eq!(report["data"]["report"]["occurrences"], 3);

    let list = fixture.run_sqlm(&["--robot", "list", "--project", "payments", "--all"]);
    crate::assert_command_success!(list);
    let list_json = list.json();
    let data = &list_json["data"];
    assert_eq!(data["total"], 2);
    assert_eq!(data["bad"], 2);
    assert_eq!(data["items"][1]["fp_count"], 2);
    assert_eq!(data["items"][1]["audit_level"], "error");

    let id = data["items"][1]["id"].as_i64().unwrap().to_string();
    let triage = fixture.run_sqlm(&[
        "--robot", "triage", "--project", "payments", &id, "--status", "solved", "--assign",
        "alice",
    ]);
    crate::assert_command_success!(triage);

    let solved = fixture.run_sqlm(&[
        "--robot", "list", "--project", "payments", "--status", "solved", "--assignee", "alice",
    ]);
    crate::assert_command_success!(solved);
    let solved_json = solved.json();
    let data = &solved_json["data"];
    assert_eq!(data["total"], 1);
    assert_eq!(data["solved"], 1);
    assert_eq!(data["items"][0]["assignees"][0], "alice");
}

#[test]
fn test_ingest_from_stdin_in_small_batches() {
    let fixture = TestFixture::new("test_ingest_from_stdin_in_small_batches");
    let project_id = register_project(&fixture, "payments");

    let lines: Vec<String> = (1..=5)
        .map(|day| finding_line(project_id, "SELECT 1", "", &format!("2025-01-0{day}T00:00:00Z")))
        .collect();
    let ingest = fixture.run_sqlm_with_stdin(
        &["--robot", "ingest", "-", "--batch-size", "2"],
        Some(&lines.join("\n")),
    );
    crate::assert_command_success!(ingest);
    let ingest_json = ingest.json();
    let data = &ingest_json["data"];
    assert_eq!(data["batches"], 3);
    assert_eq!(data["report"]["inserted"], 1);
    assert_eq!(data["report"]["merged"], 2);

    let export = fixture.run_sqlm(&["export"]);
    crate::assert_command_success!(export);
    let rows: Vec<serde_json::Value> = export
        .stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["fp_count"], 5);
    assert_eq!(rows[0]["last_receive_at"], "2025-01-05T00:00:00Z");
}

#[test]
fn test_delete_hides_items() {
    let fixture = TestFixture::new("test_delete_hides_items");
    let project_id = register_project(&fixture, "payments");
    let input = fixture.root.join("one.json");
    std::fs::write(
        &input,
        format!("[{}]", finding_line(project_id, "SELECT 1", "warn", "2025-01-01T00:00:00Z")),
    )
    .unwrap();
    let ingest = fixture.run_sqlm(&["ingest", input.to_str().unwrap()]);
    crate::assert_command_success!(ingest);

    let delete = fixture.run_sqlm(&["--robot", "delete", "--project", "payments", "1"]);
    crate::assert_command_success!(delete);
    assert_eq!(delete.json()["data"]["deleted"], 1);

    let list = fixture.run_sqlm(&["--robot", "list", "--project", "payments"]);
    crate::assert_command_success!(list);
    assert_eq!(list.json()["data"]["total"], 0);
}

#[test]
fn test_robot_errors_are_structured() {
    let fixture = TestFixture::new("test_robot_errors_are_structured");
    let out = fixture.run_sqlm(&[
        "--robot", "triage", "--project", "nope", "1", "--status", "solved",
    ]);
    assert!(!out.success);
    let json = out.json();
    assert_eq!(json["status"]["error"]["code"], "PROJECT_NOT_FOUND");
    assert_eq!(json["status"]["error"]["numeric_code"], 102);
}

#[test]
fn test_config_page_limit_is_enforced() {
    let fixture = TestFixture::new("test_config_page_limit_is_enforced");
    fixture.write_config("[query]\ndefault_page_size = 5\nmax_page_size = 10\n");
    register_project(&fixture, "payments");

    let out = fixture.run_sqlm(&[
        "--robot", "list", "--project", "payments", "--page-size", "50",
    ]);
    assert!(!out.success);
    assert_eq!(out.json()["status"]["error"]["code"], "VALIDATION_FAILED");
}

#[test]
fn test_ingest_rejects_bad_finding_before_any_commit() {
    let fixture = TestFixture::new("test_ingest_rejects_bad_finding_before_any_commit");
    let project_id = register_project(&fixture, "payments");

    let lines = [
        finding_line(project_id, "SELECT 1", "", "2025-01-01T00:00:00Z"),
        finding_line(project_id, "SELECT 2", "", "2025-01-02T00:00:00Z"),
        finding_line(project_id, "", "", "2025-01-03T00:00:00Z"),
    ]
    .join("\n");
    let ingest = fixture.run_sqlm_with_stdin(
        &["--robot", "ingest", "-", "--batch-size", "1"],
        Some(&lines),
    );
    assert!(!ingest.success);
    assert_eq!(ingest.json()["status"]["error"]["code"], "VALIDATION_FAILED");

    let list = fixture.run_sqlm(&["--robot", "list", "--project", "payments", "--all"]);
    crate::assert_command_success!(list);
    assert_eq!(list.json()["data"]["total"], 0);
}

#[test]
fn test_ingest_reports_committed_batches_on_store_failure() {
    let fixture = TestFixture::new("test_ingest_reports_committed_batches_on_store_failure");
    let project_id = register_project(&fixture, "payments");

    let lines = [
        finding_line(project_id, "SELECT 1", "", "2025-01-01T00:00:00Z"),
        finding_line(999, "SELECT 2", "", "2025-01-02T00:00:00Z"),
    ]
    .join("\n");
    let ingest = fixture.run_sqlm_with_stdin(
        &["--robot", "ingest", "-", "--batch-size", "1"],
        Some(&lines),
    );
    assert!(!ingest.success);
    let json = ingest.json();
    let error = &json["status"]["error"];
    assert_eq!(error["code"], "STORAGE_WRITE_ERROR");
    assert_eq!(error["context"]["committed_batches"], 1);
    assert_eq!(error["context"]["committed_occurrences"], 1);

    let list = fixture.run_sqlm(&["--robot", "list", "--project", "payments", "--all"]);
    crate::assert_command_success!(list);
    assert_eq!(list.json()["data"]["total"], 1);
}

#[test]
fn test_register_plan_delete_keeps_items() {
    let fixture = TestFixture::new("test_register_plan_delete_keeps_items");
    register_project(&fixture, "payments");

    let plan = fixture.run_sqlm(&["--robot", "register", "plan", "-p", "payments", "nightly"]);
    crate::assert_command_success!(plan);

    let delete = fixture.run_sqlm(&[
        "--robot", "register", "plan", "-p", "payments", "nightly", "--delete",
    ]);
    crate::assert_command_success!(delete);
    assert_eq!(delete.json()["data"]["deleted"], true);

    let again = fixture.run_sqlm(&[
        "--robot", "register", "plan", "-p", "payments", "nightly", "--delete",
    ]);
    crate::assert_command_success!(again);
    assert_eq!(again.json()["data"]["deleted"], false);
}

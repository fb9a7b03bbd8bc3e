use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

use sqlm::manage::{list_all, merge_batch, RawFinding, SqlManageSource};
use sqlm::storage::Database;
use sqlm::test_utils::{at, FindingBuilder};

fn base_time() -> DateTime<Utc> {
    at("2025-01-01T00:00:00Z")
}

fn arb_source() -> impl Strategy<Value = SqlManageSource> {
    prop_oneof![
        Just(SqlManageSource::AuditPlan),
        Just(SqlManageSource::SqlAuditRecord),
    ]
}

/// Small alphabets so keys collide often.
fn arb_finding(project_id: i64) -> impl Strategy<Value = RawFinding> {
    (
        prop::sample::select(vec!["SELECT 1", "SELECT 2", "UPDATE t SET a = ?"]),
        arb_source(),
        prop::sample::select(vec!["db1", "db2"]),
        prop::sample::select(vec!["", "s1"]),
        0i64..10_000,
    )
        .prop_map(move |(fp, source, instance, schema, offset)| {
            let mut finding = FindingBuilder::new(project_id, fp)
                .source(source)
                .instance(instance)
                .schema(schema)
                .build();
            finding.observed_at = base_time() + Duration::seconds(offset);
            finding
        })
}

fn arb_batches() -> impl Strategy<Value = Vec<Vec<RawFinding>>> {
    prop::collection::vec(prop::collection::vec(arb_finding(1), 0..12), 1..5)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn one_item_per_key_with_exact_counts(batches in arb_batches()) {
        let mut db = Database::open_in_memory().unwrap();
        let project = db.ensure_project("p").unwrap();
        prop_assert_eq!(project, 1);

        let mut expected: HashMap<String, (u64, DateTime<Utc>)> = HashMap::new();
        for batch in &batches {
            merge_batch(&mut db, batch).unwrap();
            for finding in batch {
                let entry = expected
                    .entry(finding.dedup_key().to_string())
                    .or_insert((0, finding.observed_at));
                entry.0 += 1;
                entry.1 = entry.1.max(finding.observed_at);
            }
        }

        let items = list_all(&db).unwrap();
        prop_assert_eq!(items.len(), expected.len());
        for item in items {
            let (count, last_seen) = expected[item.dedup_key.as_str()];
            prop_assert_eq!(item.fp_count, count);
            prop_assert_eq!(item.last_receive_at, last_seen);
            prop_assert!(item.first_appear_at <= item.last_receive_at);
        }
    }

    #[test]
    fn first_seen_is_fixed_by_the_creating_batch(batches in arb_batches()) {
        let mut db = Database::open_in_memory().unwrap();
        db.ensure_project("p").unwrap();

        let mut first_seen: HashMap<String, DateTime<Utc>> = HashMap::new();
        for batch in &batches {
            let mut batch_min: HashMap<String, DateTime<Utc>> = HashMap::new();
            for finding in batch {
                let key = finding.dedup_key().to_string();
                let slot = batch_min.entry(key).or_insert(finding.observed_at);
                *slot = (*slot).min(finding.observed_at);
            }
            for (key, min) in batch_min {
                first_seen.entry(key).or_insert(min);
            }
            merge_batch(&mut db, batch).unwrap();
        }

        for item in list_all(&db).unwrap() {
            prop_assert_eq!(item.first_appear_at, first_seen[item.dedup_key.as_str()]);
        }
    }

    #[test]
    fn batch_split_does_not_change_counts(findings in prop::collection::vec(arb_finding(1), 1..20), split in 0usize..20) {
        let split = split.min(findings.len());

        let mut whole = Database::open_in_memory().unwrap();
        whole.ensure_project("p").unwrap();
        merge_batch(&mut whole, &findings).unwrap();

        let mut parts = Database::open_in_memory().unwrap();
        parts.ensure_project("p").unwrap();
        merge_batch(&mut parts, &findings[..split]).unwrap();
        merge_batch(&mut parts, &findings[split..]).unwrap();

        let counts = |db: &Database| -> HashMap<String, (u64, DateTime<Utc>)> {
            list_all(db)
                .unwrap()
                .into_iter()
                .map(|i| (i.dedup_key.to_string(), (i.fp_count, i.last_receive_at)))
                .collect()
        };
        prop_assert_eq!(counts(&whole), counts(&parts));
    }
}

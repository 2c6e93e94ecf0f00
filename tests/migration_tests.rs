/// End-to-end repair scenarios over the in-memory store.
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use splitfix::{
    rules, CollectionPlan, Document, FieldValue, MemoryStore, Migration, MigrateError,
    RunOptions, RunPhase,
};

fn ts_map(prefixed: bool, seconds: i64, nanos: i64) -> FieldValue {
    let (s, n) = if prefixed {
        ("_seconds", "_nanoseconds")
    } else {
        ("seconds", "nanoseconds")
    };
    let mut map = BTreeMap::new();
    map.insert(s.to_string(), FieldValue::Integer(seconds));
    map.insert(n.to_string(), FieldValue::Integer(nanos));
    FieldValue::Map(map)
}

fn expense_repair_rules() -> Vec<Box<dyn splitfix::FieldRule>> {
    let mut all = rules::expense_amount_rules();
    all.extend(rules::expense_timestamp_rules());
    all
}

#[test]
fn test_end_to_end_e1_scenario() {
    let mut store = MemoryStore::new();
    store.insert(
        "expenses",
        Document::new("e1")
            .with("amount", "12.50")
            .with("date", ts_map(true, 1_700_000_000, 0)),
    );

    let mut migration = Migration::new(store, RunOptions::confirmed())
        .plan(CollectionPlan::new("expenses", expense_repair_rules()));
    let report = migration.run().unwrap();

    assert_eq!(report.documents_updated, 1);
    assert_eq!(report.documents_skipped, 0);
    assert_eq!(report.per_field_fixed.get("amount"), Some(&1));
    assert_eq!(report.per_field_fixed.get("date"), Some(&1));
    assert!(report.errors.is_empty());

    let doc = migration.client().document("expenses", "e1").unwrap();
    assert_eq!(doc.field("amount"), Some(&FieldValue::Float(12.5)));
    assert_eq!(
        doc.field("date"),
        Some(&FieldValue::Timestamp(
            Utc.timestamp_opt(1_700_000_000, 0).unwrap()
        ))
    );
}

#[test]
fn test_second_run_changes_nothing() {
    let mut store = MemoryStore::new();
    store.insert(
        "expenses",
        Document::new("e1")
            .with("amount", "12.50")
            .with("date", ts_map(true, 1_700_000_000, 0)),
    );

    let mut first = Migration::new(store, RunOptions::confirmed())
        .plan(CollectionPlan::new("expenses", expense_repair_rules()));
    first.run().unwrap();
    let store = first.into_client();
    let before = store.document("expenses", "e1").unwrap();

    let mut second = Migration::new(store, RunOptions::confirmed())
        .plan(CollectionPlan::new("expenses", expense_repair_rules()));
    let report = second.run().unwrap();

    assert_eq!(report.documents_updated, 0);
    assert_eq!(report.documents_skipped, 1);
    assert!(report.per_field_fixed.is_empty());
    assert_eq!(
        second.client().document("expenses", "e1").unwrap(),
        before
    );
    // The already-canonical run must not touch the store at all.
    assert_eq!(second.client().committed_batches().len(), 1);
}

#[test]
fn test_batch_bound_500_500_200() {
    let mut store = MemoryStore::new();
    for n in 0..1200 {
        store.insert(
            "expenses",
            Document::new(format!("e{:04}", n)).with("amount", "1.00"),
        );
    }

    let mut migration = Migration::new(store, RunOptions::confirmed()).plan(
        CollectionPlan::new("expenses", rules::expense_amount_rules()),
    );
    let report = migration.run().unwrap();

    assert_eq!(report.documents_updated, 1200);
    assert_eq!(report.batches_committed, 3);
    assert_eq!(migration.client().committed_batches(), &[500, 500, 200]);
}

#[test]
fn test_unmatched_fields_are_untouched() {
    let mut store = MemoryStore::new();
    store.insert(
        "expenses",
        Document::new("e1")
            .with("amount", "9.99")
            .with("note", "team lunch")
            .with("participants", FieldValue::Array(vec!["u1".into(), "u2".into()])),
    );

    let mut migration = Migration::new(store, RunOptions::confirmed()).plan(
        CollectionPlan::new("expenses", rules::expense_amount_rules()),
    );
    migration.run().unwrap();

    let doc = migration.client().document("expenses", "e1").unwrap();
    assert_eq!(doc.field("note").and_then(|v| v.as_str()), Some("team lunch"));
    assert_eq!(
        doc.field("participants"),
        Some(&FieldValue::Array(vec!["u1".into(), "u2".into()]))
    );
}

#[test]
fn test_both_timestamp_spellings_converge() {
    let mut store = MemoryStore::new();
    store.insert(
        "expenses",
        Document::new("e1").with("date", ts_map(true, 1_700_000_000, 500)),
    );
    store.insert(
        "expenses",
        Document::new("e2").with("date", ts_map(false, 1_700_000_000, 500)),
    );

    let mut migration = Migration::new(store, RunOptions::confirmed()).plan(
        CollectionPlan::new("expenses", rules::expense_timestamp_rules()),
    );
    let report = migration.run().unwrap();
    assert_eq!(report.per_field_fixed.get("date"), Some(&2));

    let a = migration.client().document("expenses", "e1").unwrap();
    let b = migration.client().document("expenses", "e2").unwrap();
    let when = a.field("date").and_then(|v| v.as_timestamp()).unwrap();
    assert_eq!(when, Utc.timestamp_opt(1_700_000_000, 500).unwrap());
    assert_eq!(a.field("date"), b.field("date"));
}

#[test]
fn test_rename_completes_and_stays_done() {
    let mut store = MemoryStore::new();
    store.insert("expenses", Document::new("e1").with("paidByUserId", "u1"));

    let mut first = Migration::new(store, RunOptions::confirmed()).plan(
        CollectionPlan::new("expenses", rules::paid_by_rename_rules()),
    );
    let report = first.run().unwrap();
    assert_eq!(report.documents_updated, 1);

    let doc = first.client().document("expenses", "e1").unwrap();
    assert!(!doc.has_field("paidByUserId"));
    assert_eq!(doc.field("paidById").and_then(|v| v.as_str()), Some("u1"));

    let mut second = Migration::new(first.into_client(), RunOptions::confirmed()).plan(
        CollectionPlan::new("expenses", rules::paid_by_rename_rules()),
    );
    let report = second.run().unwrap();
    assert_eq!(report.documents_updated, 0);
    assert_eq!(report.documents_skipped, 1);
}

#[test]
fn test_conversion_failure_is_recorded_and_run_completes() {
    let mut store = MemoryStore::new();
    store.insert(
        "expenses",
        Document::new("bad").with("amount", "not money"),
    );
    store.insert("expenses", Document::new("good").with("amount", "4.20"));

    let mut migration = Migration::new(store, RunOptions::confirmed()).plan(
        CollectionPlan::new("expenses", rules::expense_amount_rules()),
    );
    let report = migration.run().unwrap();

    assert_eq!(report.documents_updated, 1);
    assert_eq!(report.documents_skipped, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].key, "bad");
    assert_eq!(report.errors[0].field, "amount");

    // The unconvertible value is left exactly as it was.
    let doc = migration.client().document("expenses", "bad").unwrap();
    assert_eq!(doc.field("amount").and_then(|v| v.as_str()), Some("not money"));
}

#[test]
fn test_multiple_collections_run_in_order() {
    let mut store = MemoryStore::new();
    store.insert(
        "expenses",
        Document::new("e1").with("date", ts_map(true, 1_700_000_000, 0)),
    );
    store.insert(
        "settlements",
        Document::new("s1").with("date", ts_map(false, 1_700_000_100, 0)),
    );

    let mut migration = Migration::new(store, RunOptions::confirmed())
        .plan(CollectionPlan::new(
            "expenses",
            rules::expense_timestamp_rules(),
        ))
        .plan(CollectionPlan::new(
            "settlements",
            rules::settlement_timestamp_rules(),
        ));
    let report = migration.run().unwrap();

    assert_eq!(report.documents_scanned, 2);
    assert_eq!(report.documents_updated, 2);
    assert_eq!(report.per_field_fixed.get("date"), Some(&2));
    assert_eq!(migration.phase(), RunPhase::Done);
    // One batch per collection: a repair never mixes collections in a
    // single commit.
    assert_eq!(migration.client().committed_batches(), &[1, 1]);
}

#[test]
fn test_commit_failure_aborts_with_partial_report() {
    let mut store = MemoryStore::new();
    store.insert("expenses", Document::new("e1").with("amount", "1.00"));
    store.fail_next_commit();

    let mut migration = Migration::new(store, RunOptions::confirmed()).plan(
        CollectionPlan::new("expenses", rules::expense_amount_rules()),
    );
    let failure = migration.run().unwrap_err();

    assert!(matches!(failure.error, MigrateError::CommitFailed(_)));
    assert_eq!(failure.report.documents_scanned, 1);
    assert_eq!(failure.report.per_field_fixed.get("amount"), Some(&1));

    // Nothing reached the store; re-running finishes the job.
    let mut retry = Migration::new(migration.into_client(), RunOptions::confirmed()).plan(
        CollectionPlan::new("expenses", rules::expense_amount_rules()),
    );
    let report = retry.run().unwrap();
    assert_eq!(report.documents_updated, 1);
}

#[test]
fn test_confirmation_gate_delay_is_observable() {
    let delay = Duration::from_millis(150);

    let gated = RunOptions {
        skip_confirmation: false,
        confirmation_delay: delay,
    };
    let started = Instant::now();
    Migration::new(MemoryStore::new(), gated).run().unwrap();
    assert!(started.elapsed() >= delay);

    let skipped = RunOptions {
        skip_confirmation: true,
        confirmation_delay: delay,
    };
    let started = Instant::now();
    Migration::new(MemoryStore::new(), skipped).run().unwrap();
    assert!(started.elapsed() < delay);
}

mod common;

use binlog_stat::{ChangeOperation, ColumnInfo, Error, StatAggregator};
use common::{delete_event, insert_event, update_event};
use serde_json::json;

#[test]
fn test_repeated_ensure_leaves_store_unchanged() {
    let mut aggregator = StatAggregator::new();

    aggregator.ensure_schema("s");
    aggregator.ensure_table("s", "t");
    aggregator.ensure_insert_column("s", "t", "a");
    aggregator.ensure_update_column("s", "t", "b");
    let once = aggregator.store().clone();

    aggregator.ensure_schema("s");
    aggregator.ensure_table("s", "t");
    aggregator.ensure_insert_column("s", "t", "a");
    aggregator.ensure_update_column("s", "t", "b");

    assert_eq!(aggregator.store(), &once);
}

#[test]
fn test_insert_accounting() {
    let mut aggregator = StatAggregator::new();
    aggregator.process(&insert_event("s", "t", &["a", "b"], 3)).unwrap();

    let stat = aggregator.table_stat("s", "t").unwrap();
    assert_eq!(stat.dml_count.insert, 3);
    assert_eq!(stat.dml_count.update, 0);
    assert_eq!(stat.dml_count.delete, 0);
    assert_eq!(stat.insert_col_count["a"], 3);
    assert_eq!(stat.insert_col_count["b"], 3);
    assert!(stat.update_col_count.is_empty());
}

#[test]
fn test_update_skips_unchanged_values() {
    let mut aggregator = StatAggregator::new();
    let event = update_event(
        "s",
        "t",
        vec![ColumnInfo::new("a"), ColumnInfo::new("b")],
        vec![(json!({"a": 5, "b": 5}), json!({"a": 5, "b": 7}))],
    );

    aggregator.process(&event).unwrap();

    let stat = aggregator.table_stat("s", "t").unwrap();
    assert_eq!(stat.dml_count.update, 1);
    assert_eq!(stat.update_col_count.len(), 1);
    assert_eq!(stat.update_col_count["b"], 1);
    assert!(!aggregator.update_column_exists("s", "t", "a"));
}

#[test]
fn test_update_counts_per_row() {
    let mut aggregator = StatAggregator::new();
    let event = update_event(
        "s",
        "t",
        vec![ColumnInfo::key("id"), ColumnInfo::new("a"), ColumnInfo::new("b")],
        vec![
            (json!({"id": 1, "a": 1, "b": 1}), json!({"id": 1, "a": 2, "b": 1})),
            (json!({"id": 2, "a": 1, "b": 1}), json!({"id": 2, "a": 3, "b": 9})),
            (json!({"id": 3, "a": 1, "b": 1}), json!({"id": 3, "a": 1, "b": 1})),
        ],
    );

    aggregator.process(&event).unwrap();

    let stat = aggregator.table_stat("s", "t").unwrap();
    assert_eq!(stat.dml_count.update, 3);
    assert_eq!(stat.update_col_count["a"], 2);
    assert_eq!(stat.update_col_count["b"], 1);
}

#[test]
fn test_primary_key_changes_are_not_counted() {
    let mut aggregator = StatAggregator::new();
    let event = update_event(
        "s",
        "t",
        vec![ColumnInfo::key("id"), ColumnInfo::new("a")],
        vec![(json!({"id": 1, "a": 1}), json!({"id": 2, "a": 1}))],
    );

    aggregator.process(&event).unwrap();

    let stat = aggregator.table_stat("s", "t").unwrap();
    assert_eq!(stat.dml_count.update, 1);
    assert!(stat.update_col_count.is_empty());
}

#[test]
fn test_delete_accounting() {
    let mut aggregator = StatAggregator::new();
    aggregator.process(&delete_event("s", "t", 4)).unwrap();

    let stat = aggregator.table_stat("s", "t").unwrap();
    assert_eq!(stat.dml_count.delete, 4);
    assert!(stat.insert_col_count.is_empty());
    assert!(stat.update_col_count.is_empty());
}

#[test]
fn test_sorted_snapshot_descending() {
    let mut aggregator = StatAggregator::new();
    aggregator.process(&insert_event("s", "ten", &["a"], 10)).unwrap();
    aggregator.process(&insert_event("s", "fifty", &["a"], 50)).unwrap();
    aggregator.process(&insert_event("s", "five", &["a"], 5)).unwrap();

    let report = aggregator.sorted_snapshot(ChangeOperation::Insert);
    let counts: Vec<u64> = report
        .tables()
        .iter()
        .map(|t| t.stat.dml_count.insert)
        .collect();

    assert_eq!(counts, vec![50, 10, 5]);
    assert_eq!(report.tables()[0].name, "s.fifty");
}

#[test]
fn test_same_table_name_in_different_schemas() {
    let mut aggregator = StatAggregator::new();
    aggregator.process(&insert_event("s1", "t1", &["a"], 2)).unwrap();
    aggregator.process(&delete_event("s2", "t1", 1)).unwrap();
    aggregator.process(&insert_event("s1", "t1", &["a"], 1)).unwrap();

    let s1 = aggregator.table_stat("s1", "t1").unwrap();
    let s2 = aggregator.table_stat("s2", "t1").unwrap();

    assert_eq!(s1.dml_count.insert, 3);
    assert_eq!(s1.dml_count.delete, 0);
    assert_eq!(s2.dml_count.insert, 0);
    assert_eq!(s2.dml_count.delete, 1);
    assert!(s2.insert_col_count.is_empty());
    assert_eq!(aggregator.table_count(), 2);
}

#[test]
fn test_unknown_sort_key_produces_no_report() {
    let mut aggregator = StatAggregator::new();
    aggregator.process(&insert_event("s", "t", &["a"], 1)).unwrap();

    match aggregator.sorted_snapshot_by("upsert") {
        Err(Error::InvalidArgument(msg)) => assert!(msg.contains("upsert")),
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
}

#[test]
fn test_reprocessing_double_counts() {
    let mut aggregator = StatAggregator::new();
    let event = insert_event("s", "t", &["a"], 2);

    aggregator.process(&event).unwrap();
    aggregator.process(&event).unwrap();

    let stat = aggregator.table_stat("s", "t").unwrap();
    assert_eq!(stat.dml_count.insert, 4);
    assert_eq!(stat.insert_col_count["a"], 4);
}

#![allow(dead_code)]

use binlog_stat::{ChangeEvent, ChangeOperation, ColumnInfo, RowChange};
use serde_json::{json, Value};

/// Insert event with `rows` rows over the given non-key columns.
pub fn insert_event(schema: &str, table: &str, columns: &[&str], rows: usize) -> ChangeEvent {
    let images = (0..rows)
        .map(|i| {
            let mut image = serde_json::Map::new();
            for column in columns {
                image.insert(column.to_string(), json!(i));
            }
            RowChange::inserted(Value::Object(image))
        })
        .collect();

    ChangeEvent::new(
        ChangeOperation::Insert,
        schema,
        table,
        columns.iter().map(|c| ColumnInfo::new(*c)).collect(),
        images,
    )
}

/// Update event from (before, after) image pairs.
pub fn update_event(
    schema: &str,
    table: &str,
    columns: Vec<ColumnInfo>,
    rows: Vec<(Value, Value)>,
) -> ChangeEvent {
    ChangeEvent::new(
        ChangeOperation::Update,
        schema,
        table,
        columns,
        rows.into_iter()
            .map(|(before, after)| RowChange::updated(before, after))
            .collect(),
    )
}

pub fn delete_event(schema: &str, table: &str, rows: usize) -> ChangeEvent {
    ChangeEvent::new(
        ChangeOperation::Delete,
        schema,
        table,
        vec![ColumnInfo::key("id"), ColumnInfo::new("a")],
        (0..rows)
            .map(|i| RowChange::deleted(json!({ "id": i, "a": i })))
            .collect(),
    )
}

/// Encodes events as newline-delimited JSON, the format the binary reads.
pub fn to_json_lines(events: &[ChangeEvent]) -> String {
    events
        .iter()
        .map(|e| serde_json::to_string(e).unwrap() + "\n")
        .collect()
}

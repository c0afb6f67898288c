use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::event::ChangeOperation;

/// Rows affected per operation kind.
///
/// Serialized as `{"insert": .., "update": .., "delete": ..}` in exactly that
/// order so reports diff cleanly between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmlCount {
    pub insert: u64,
    pub update: u64,
    pub delete: u64,
}

impl DmlCount {
    pub fn get(&self, op: ChangeOperation) -> u64 {
        match op {
            ChangeOperation::Insert => self.insert,
            ChangeOperation::Update => self.update,
            ChangeOperation::Delete => self.delete,
        }
    }

    pub fn add(&mut self, op: ChangeOperation, rows: u64) {
        let counter = match op {
            ChangeOperation::Insert => &mut self.insert,
            ChangeOperation::Update => &mut self.update,
            ChangeOperation::Delete => &mut self.delete,
        };
        *counter += rows;
    }
}

/// Statistics for a single `schema.table`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStat {
    pub dml_count: DmlCount,
    pub insert_col_count: BTreeMap<String, u64>,
    pub update_col_count: BTreeMap<String, u64>,
}

impl TableStat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_column_exists(&self, column: &str) -> bool {
        self.insert_col_count.contains_key(column)
    }

    pub fn update_column_exists(&self, column: &str) -> bool {
        self.update_col_count.contains_key(column)
    }

    /// Returns the insert counter for `column`, zero-initialized on first use.
    pub fn ensure_insert_column(&mut self, column: &str) -> &mut u64 {
        self.insert_col_count.entry(column.to_string()).or_insert(0)
    }

    /// Returns the update counter for `column`, zero-initialized on first use.
    pub fn ensure_update_column(&mut self, column: &str) -> &mut u64 {
        self.update_col_count.entry(column.to_string()).or_insert(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dml_count_add_and_get() {
        let mut count = DmlCount::default();
        count.add(ChangeOperation::Insert, 3);
        count.add(ChangeOperation::Insert, 2);
        count.add(ChangeOperation::Delete, 4);

        assert_eq!(count.get(ChangeOperation::Insert), 5);
        assert_eq!(count.get(ChangeOperation::Update), 0);
        assert_eq!(count.get(ChangeOperation::Delete), 4);
    }

    #[test]
    fn test_ensure_column_is_idempotent() {
        let mut stat = TableStat::new();
        assert!(!stat.insert_column_exists("a"));

        *stat.ensure_insert_column("a") += 2;
        let before = stat.clone();
        stat.ensure_insert_column("a");

        assert_eq!(stat, before);
        assert_eq!(stat.insert_col_count["a"], 2);
        assert!(!stat.update_column_exists("a"));
    }

    #[test]
    fn test_serialized_field_order() {
        let mut stat = TableStat::new();
        stat.dml_count.add(ChangeOperation::Delete, 1);
        *stat.ensure_update_column("name") += 1;

        let json = serde_json::to_string(&stat).unwrap();
        assert_eq!(
            json,
            r#"{"dmlCount":{"insert":0,"update":0,"delete":1},"insertColCount":{},"updateColCount":{"name":1}}"#
        );
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
}

impl ChangeOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOperation::Insert => "insert",
            ChangeOperation::Update => "update",
            ChangeOperation::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "insert" => Ok(ChangeOperation::Insert),
            "update" => Ok(ChangeOperation::Update),
            "delete" => Ok(ChangeOperation::Delete),
            other => Err(Error::InvalidArgument(format!(
                "unknown operation '{}', expected one of insert/update/delete",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(default)]
    pub is_key: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_key: false,
        }
    }

    pub fn key(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_key: true,
        }
    }
}

/// One affected row. Inserts carry only `after`, deletes only `before`,
/// updates both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    #[serde(default)]
    pub before: Option<Value>,
    #[serde(default)]
    pub after: Option<Value>,
}

impl RowChange {
    pub fn inserted(after: Value) -> Self {
        Self {
            before: None,
            after: Some(after),
        }
    }

    pub fn updated(before: Value, after: Value) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(before: Value) -> Self {
        Self {
            before: Some(before),
            after: None,
        }
    }

    pub fn before_value(&self, column: &str) -> Option<&Value> {
        self.before.as_ref().and_then(|image| image.get(column))
    }

    pub fn after_value(&self, column: &str) -> Option<&Value> {
        self.after.as_ref().and_then(|image| image.get(column))
    }
}

/// Location of an event in the server's binary log.
///
/// Positions order by file name first, then by offset, which matches the
/// zero-padded sequence numbers the server gives its log files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BinlogPosition {
    pub log_file: String,
    #[serde(default)]
    pub log_pos: u64,
}

impl BinlogPosition {
    pub fn new(log_file: impl Into<String>, log_pos: u64) -> Self {
        Self {
            log_file: log_file.into(),
            log_pos,
        }
    }
}

impl fmt::Display for BinlogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.log_file, self.log_pos)
    }
}

/// A decoded row event for a single table, as handed over by the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub schema: String,
    pub table: String,
    pub op: ChangeOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<BinlogPosition>,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub rows: Vec<RowChange>,
}

impl ChangeEvent {
    pub fn new(
        op: ChangeOperation,
        schema: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<ColumnInfo>,
        rows: Vec<RowChange>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            op,
            ts_ms: None,
            position: None,
            columns,
            rows,
        }
    }

    pub fn with_ts_ms(mut self, ts_ms: i64) -> Self {
        self.ts_ms = Some(ts_ms);
        self
    }

    pub fn with_position(mut self, position: BinlogPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    pub fn row_count(&self) -> u64 {
        self.rows.len() as u64
    }

    /// Checks the contract the aggregator relies on. Nothing is counted for
    /// an event that fails here.
    pub fn validate(&self) -> Result<()> {
        if self.schema.is_empty() {
            return Err(self.invalid("missing schema name"));
        }
        if self.table.is_empty() {
            return Err(self.invalid("missing table name"));
        }

        if matches!(self.op, ChangeOperation::Insert | ChangeOperation::Update)
            && self.columns.is_empty()
        {
            return Err(self.invalid("no column descriptors"));
        }

        let mut seen = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if column.name.is_empty() {
                return Err(self.invalid("empty column name"));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(self.invalid(&format!("duplicate column '{}'", column.name)));
            }
        }

        if self.op == ChangeOperation::Update {
            for (idx, row) in self.rows.iter().enumerate() {
                match (&row.before, &row.after) {
                    (Some(Value::Object(_)), Some(Value::Object(_))) => {}
                    (None, _) | (_, None) => {
                        return Err(self.invalid(&format!(
                            "update row {} lacks a before or after image",
                            idx
                        )));
                    }
                    _ => {
                        return Err(self.invalid(&format!(
                            "update row {} image is not an object",
                            idx
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    fn invalid(&self, what: &str) -> Error {
        Error::InvalidEvent {
            message: format!(
                "{} event on '{}.{}': {}",
                self.op, self.schema, self.table, what
            ),
        }
    }
}

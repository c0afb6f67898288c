use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::io::Write;

use super::table_stat::TableStat;
use crate::event::ChangeOperation;
use crate::Result;

/// Statistics of one table, keyed by its `schema.table` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    pub name: String,
    pub stat: TableStat,
}

impl TableSnapshot {
    pub fn new(schema: &str, table: &str, stat: TableStat) -> Self {
        Self {
            name: format!("{}.{}", schema, table),
            stat,
        }
    }
}

/// A snapshot in report order.
///
/// Serializes as one JSON object whose keys appear in the order of
/// [`tables`](Self::tables).
#[derive(Debug, Clone)]
pub struct Report {
    sorted_by: ChangeOperation,
    tables: Vec<TableSnapshot>,
}

impl Report {
    pub fn new(sorted_by: ChangeOperation, tables: Vec<TableSnapshot>) -> Self {
        Self { sorted_by, tables }
    }

    pub fn sorted_by(&self) -> ChangeOperation {
        self.sorted_by
    }

    pub fn tables(&self) -> &[TableSnapshot] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let mut buf = Vec::new();
        self.write_json(&mut buf, pretty)?;
        // serde_json only ever emits valid UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Writes the report followed by a newline.
    pub fn write_json<W: Write>(&self, mut writer: W, pretty: bool) -> Result<()> {
        if pretty {
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
            self.serialize(&mut ser)?;
        } else {
            serde_json::to_writer(&mut writer, self)?;
        }
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for table in &self.tables {
            map.serialize_entry(&table.name, &table.stat)?;
        }
        map.end()
    }
}

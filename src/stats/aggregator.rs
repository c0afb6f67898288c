//! Stateful aggregation of row change events into per-table statistics.
//!
//! The [`StatAggregator`] owns a [`StatStore`] (schema → table →
//! [`TableStat`]) and is its only writer. Entries are created lazily the
//! first time an event for a table is seen and are never removed.
//!
//! # Example
//!
//! ```rust
//! use binlog_stat::{ChangeEvent, ChangeOperation, ColumnInfo, RowChange, StatAggregator};
//! use serde_json::json;
//!
//! let mut aggregator = StatAggregator::new();
//! let event = ChangeEvent::new(
//!     ChangeOperation::Insert,
//!     "shop",
//!     "orders",
//!     vec![ColumnInfo::key("id"), ColumnInfo::new("total")],
//!     vec![RowChange::inserted(json!({"id": 1, "total": 10}))],
//! );
//!
//! aggregator.process(&event).unwrap();
//!
//! let stat = aggregator.table_stat("shop", "orders").unwrap();
//! assert_eq!(stat.dml_count.insert, 1);
//! assert_eq!(stat.insert_col_count["total"], 1);
//! ```

use futures::{Stream, StreamExt};
use std::collections::BTreeMap;
use tracing::{debug, trace};

use super::report::{Report, TableSnapshot};
use super::table_stat::TableStat;
use crate::event::{ChangeEvent, ChangeOperation};
use crate::Result;

/// Tables of one schema, keyed by table name.
pub type SchemaStats = BTreeMap<String, TableStat>;

/// All statistics, keyed by schema name and then table name.
pub type StatStore = BTreeMap<String, SchemaStats>;

/// Consumes change events and accumulates [`TableStat`] counters.
///
/// Every instance starts with its own empty store; nothing is shared
/// between aggregators.
#[derive(Debug, Default)]
pub struct StatAggregator {
    store: StatStore,
    events_processed: u64,
    rows_processed: u64,
}

impl StatAggregator {
    /// Creates an aggregator with an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the accumulated statistics.
    pub fn store(&self) -> &StatStore {
        &self.store
    }

    /// Number of events accepted so far.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Number of rows carried by the accepted events.
    pub fn rows_processed(&self) -> u64 {
        self.rows_processed
    }

    /// Number of distinct `schema.table` pairs seen.
    pub fn table_count(&self) -> usize {
        self.store.values().map(|tables| tables.len()).sum()
    }

    pub fn schema_exists(&self, schema: &str) -> bool {
        self.store.contains_key(schema)
    }

    pub fn table_exists(&self, schema: &str, table: &str) -> bool {
        self.table_stat(schema, table).is_some()
    }

    pub fn insert_column_exists(&self, schema: &str, table: &str, column: &str) -> bool {
        self.table_stat(schema, table)
            .map_or(false, |stat| stat.insert_column_exists(column))
    }

    pub fn update_column_exists(&self, schema: &str, table: &str, column: &str) -> bool {
        self.table_stat(schema, table)
            .map_or(false, |stat| stat.update_column_exists(column))
    }

    /// Looks up the statistics of a table without creating anything.
    pub fn table_stat(&self, schema: &str, table: &str) -> Option<&TableStat> {
        self.store.get(schema).and_then(|tables| tables.get(table))
    }

    /// Makes sure `schema` has an entry and returns its table map.
    pub fn ensure_schema(&mut self, schema: &str) -> &mut SchemaStats {
        if !self.schema_exists(schema) {
            debug!(schema = %schema, "Tracking new schema");
        }
        self.store.entry(schema.to_string()).or_default()
    }

    /// Makes sure `schema.table` has a zeroed [`TableStat`] and returns it.
    ///
    /// The schema is ensured first, so this is safe to call on a fresh store.
    pub fn ensure_table(&mut self, schema: &str, table: &str) -> &mut TableStat {
        let tables = self.ensure_schema(schema);
        if !tables.contains_key(table) {
            debug!(schema = %schema, table = %table, "Tracking new table");
        }
        tables.entry(table.to_string()).or_default()
    }

    /// Returns the insert counter of a column, creating table and counter as needed.
    pub fn ensure_insert_column(&mut self, schema: &str, table: &str, column: &str) -> &mut u64 {
        self.ensure_table(schema, table).ensure_insert_column(column)
    }

    /// Returns the update counter of a column, creating table and counter as needed.
    pub fn ensure_update_column(&mut self, schema: &str, table: &str, column: &str) -> &mut u64 {
        self.ensure_table(schema, table).ensure_update_column(column)
    }

    /// Applies one event to the counters.
    ///
    /// The event is validated first; a malformed event is rejected with
    /// [`Error::InvalidEvent`](crate::Error::InvalidEvent) and leaves the store
    /// untouched. Processing the same event twice counts it twice.
    pub fn process(&mut self, event: &ChangeEvent) -> Result<()> {
        event.validate()?;

        trace!(
            schema = %event.schema,
            table = %event.table,
            op = %event.op,
            rows = event.rows.len(),
            "Processing change event"
        );

        match event.op {
            ChangeOperation::Insert => self.apply_insert(event),
            ChangeOperation::Update => self.apply_update(event),
            ChangeOperation::Delete => self.apply_delete(event),
        }

        self.events_processed += 1;
        self.rows_processed += event.row_count();
        Ok(())
    }

    /// Pulls events from `events` one at a time until the stream ends.
    ///
    /// Returns the number of events processed by this call. The first error,
    /// whether from the source or from a malformed event, stops consumption
    /// and is returned unchanged; counters applied before it are kept.
    pub async fn consume<S>(&mut self, events: S) -> Result<u64>
    where
        S: Stream<Item = Result<ChangeEvent>>,
    {
        futures::pin_mut!(events);

        let mut processed = 0;
        while let Some(event) = events.next().await {
            self.process(&event?)?;
            processed += 1;
        }

        debug!(processed, "Change event stream ended");
        Ok(processed)
    }

    /// Every column of an insert receives a value in every row.
    fn apply_insert(&mut self, event: &ChangeEvent) {
        let rows = event.row_count();
        let stat = self.ensure_table(&event.schema, &event.table);

        stat.dml_count.add(ChangeOperation::Insert, rows);
        for column in &event.columns {
            *stat.ensure_insert_column(&column.name) += rows;
        }
    }

    /// Counts, per non-key column, the rows whose value actually changed.
    ///
    /// A column missing from one image but present in the other counts as
    /// changed; a column missing from both images is skipped.
    fn apply_update(&mut self, event: &ChangeEvent) {
        let stat = self.ensure_table(&event.schema, &event.table);
        stat.dml_count.add(ChangeOperation::Update, event.row_count());

        for row in &event.rows {
            for column in event.columns.iter().filter(|c| !c.is_key) {
                let before = row.before_value(&column.name);
                let after = row.after_value(&column.name);

                if before == after {
                    continue;
                }

                *stat.ensure_update_column(&column.name) += 1;
            }
        }
    }

    /// Deleted rows have no after state, so only the row count is kept.
    fn apply_delete(&mut self, event: &ChangeEvent) {
        let stat = self.ensure_table(&event.schema, &event.table);
        stat.dml_count.add(ChangeOperation::Delete, event.row_count());
    }

    /// Unordered point-in-time copy of every table's statistics.
    pub fn snapshot(&self) -> Vec<TableSnapshot> {
        self.store
            .iter()
            .flat_map(|(schema, tables)| {
                tables
                    .iter()
                    .map(move |(table, stat)| TableSnapshot::new(schema, table, stat.clone()))
            })
            .collect()
    }

    /// Snapshot sorted by descending `dml_count[by]`.
    ///
    /// The sort is stable, so ties keep snapshot order.
    pub fn sorted_snapshot(&self, by: ChangeOperation) -> Report {
        let mut tables = self.snapshot();
        tables.sort_by(|a, b| b.stat.dml_count.get(by).cmp(&a.stat.dml_count.get(by)));
        Report::new(by, tables)
    }

    /// Like [`sorted_snapshot`](Self::sorted_snapshot) with the key given as text.
    ///
    /// An unknown key fails with
    /// [`Error::InvalidArgument`](crate::Error::InvalidArgument) before any
    /// report is built.
    pub fn sorted_snapshot_by(&self, by: &str) -> Result<Report> {
        let by = by.parse::<ChangeOperation>()?;
        Ok(self.sorted_snapshot(by))
    }
}

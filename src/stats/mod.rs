pub mod aggregator;
pub mod report;
pub mod table_stat;

pub use aggregator::{SchemaStats, StatAggregator, StatStore};
pub use report::{Report, TableSnapshot};
pub use table_stat::{DmlCount, TableStat};

pub mod collector;
pub mod config;
pub mod error;
pub mod event;

pub mod source;
pub mod stats;

pub use collector::Collector;
pub use config::Config;
pub use error::{Error, Result};
pub use event::{BinlogPosition, ChangeEvent, ChangeOperation, ColumnInfo, RowChange};
pub use stats::{Report, StatAggregator, TableStat};

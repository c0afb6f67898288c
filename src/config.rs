use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::event::{BinlogPosition, ChangeOperation};
use crate::{Error, Result};

pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Path of a JSON-lines change event file, `-` for stdin.
    #[serde(default = "default_input")]
    pub input: String,
    /// Keep waiting for new events at end of input instead of stopping.
    #[serde(default)]
    pub follow: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Skip events older than this, `YYYY-MM-DD HH:MM:SS` in UTC.
    #[serde(default)]
    pub start_time: Option<String>,
    /// Skip events logged before this binary log file.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Offset within `log_file`; requires `log_file`.
    #[serde(default)]
    pub log_pos: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    #[serde(default = "default_sorted_by")]
    pub sorted_by: String,
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            follow: false,
            poll_interval_ms: default_poll_interval_ms(),
            start_time: None,
            log_file: None,
            log_pos: None,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sorted_by: default_sorted_by(),
            pretty: default_pretty(),
        }
    }
}

impl Config {
    /// Layers defaults, an optional TOML file and `BINLOG_STAT_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("BINLOG_STAT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(Some(path.as_ref()))
    }

    /// Parsed sort key; unknown names are an [`Error::InvalidArgument`].
    pub fn sort_key(&self) -> Result<ChangeOperation> {
        self.report.sorted_by.parse()
    }
}

impl SourceConfig {
    /// Start time as epoch milliseconds, if one is configured.
    pub fn start_time_ms(&self) -> Result<Option<i64>> {
        self.start_time.as_deref().map(parse_start_time).transpose()
    }

    /// Start position in the binary log. A file without an offset starts at
    /// the beginning of that file.
    pub fn start_position(&self) -> Result<Option<BinlogPosition>> {
        match (&self.log_file, self.log_pos) {
            (Some(file), _) if file.trim().is_empty() => {
                Err(Error::Config("log_file must not be empty".to_string()))
            }
            (Some(file), pos) => Ok(Some(BinlogPosition::new(file.trim(), pos.unwrap_or(0)))),
            (None, Some(pos)) => Err(Error::Config(format!(
                "log_pos {} given without log_file",
                pos
            ))),
            (None, None) => Ok(None),
        }
    }
}

pub fn parse_start_time(text: &str) -> Result<i64> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), START_TIME_FORMAT).map_err(|e| {
        Error::Config(format!(
            "invalid start time '{}' (expected {}): {}",
            text, START_TIME_FORMAT, e
        ))
    })?;
    Ok(Utc.from_utc_datetime(&naive).timestamp_millis())
}

fn default_input() -> String {
    "-".to_string()
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_sorted_by() -> String {
    "insert".to_string()
}

fn default_pretty() -> bool {
    true
}

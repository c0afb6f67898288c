//! Error types and result handling for binlog-stat.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! # Example
//!
//! ```rust
//! use binlog_stat::{ChangeOperation, Error};
//!
//! match "upsert".parse::<ChangeOperation>() {
//!     Ok(op) => println!("sorting by {}", op),
//!     Err(Error::InvalidArgument(msg)) => eprintln!("bad sort key: {}", msg),
//!     Err(e) => eprintln!("other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// The main error type for binlog-stat operations.
///
/// Covers configuration problems, rejected arguments, malformed change
/// events coming from the source, and I/O failures of the source itself.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error, from a config file, the environment or a flag value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An argument outside its accepted set, such as an unknown sort key.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A change event that could not be decoded or violates the event contract.
    ///
    /// Counters are never touched for an event rejected this way.
    #[error("Invalid change event: {message}")]
    InvalidEvent {
        /// Description of what was invalid
        message: String,
    },

    /// JSON serialization error when rendering the report.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error from the change-event source or the report writer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

/// A convenient Result type alias for binlog-stat operations.
///
/// This is equivalent to `std::result::Result<T, binlog_stat::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

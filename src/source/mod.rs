use futures::Stream;
use std::pin::Pin;

use crate::{event::ChangeEvent, Result};

pub mod jsonl;


pub use jsonl::JsonLinesSource;

/// Lazy, possibly endless sequence of decoded change events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ChangeEvent>> + Send>>;

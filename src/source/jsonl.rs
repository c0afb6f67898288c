use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use super::EventStream;
use crate::config::SourceConfig;
use crate::event::{BinlogPosition, ChangeEvent};
use crate::{Error, Result};

/// Lines buffered between a blocking reader thread and the source.
const LINE_BUFFER: usize = 1024;

enum Input {
    Async(Box<dyn AsyncBufRead + Send + Unpin>),
    /// Lines read on a dedicated thread. A read blocked there does not hold
    /// the runtime open at shutdown.
    Thread(mpsc::Receiver<io::Result<String>>),
}

impl Input {
    async fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        match self {
            Input::Async(reader) => reader.read_line(buf).await,
            Input::Thread(lines) => match lines.recv().await {
                Some(line) => {
                    let line = line?;
                    buf.push_str(&line);
                    Ok(line.len())
                }
                None => Ok(0),
            },
        }
    }
}

/// Reads one JSON encoded [`ChangeEvent`] per line.
///
/// Without follow mode the source ends at end of input. In follow mode it
/// polls for appended data instead, so only the caller can end it.
pub struct JsonLinesSource {
    input: Input,
    label: String,
    follow: bool,
    poll_interval: Duration,
    start_ms: Option<i64>,
    start_position: Option<BinlogPosition>,
    pending: String,
    line_no: u64,
    skipped: u64,
}

impl JsonLinesSource {
    fn with_input(input: Input, label: String) -> Self {
        Self {
            input,
            label,
            follow: false,
            poll_interval: Duration::from_millis(100),
            start_ms: None,
            start_position: None,
            pending: String::new(),
            line_no: 0,
            skipped: 0,
        }
    }

    pub fn from_reader<R>(reader: R, label: impl Into<String>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::with_input(Input::Async(Box::new(BufReader::new(reader))), label.into())
    }

    /// Reads `reader` on its own thread and hands lines over through a
    /// channel. The thread exits at end of input or once the source is
    /// dropped and its next line cannot be delivered.
    pub fn from_blocking_reader<R>(reader: R, label: impl Into<String>) -> Result<Self>
    where
        R: io::Read + Send + 'static,
    {
        let label = label.into();
        let (tx, rx) = mpsc::channel(LINE_BUFFER);

        std::thread::Builder::new()
            .name(format!("{}-reader", label))
            .spawn(move || read_lines(io::BufReader::new(reader), tx))?;

        Ok(Self::with_input(Input::Thread(rx), label))
    }

    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::from_reader(file, path.display().to_string()))
    }

    pub fn stdin() -> Result<Self> {
        Self::from_blocking_reader(io::stdin(), "stdin")
    }

    /// Opens the input named by `config`, `-` meaning standard input.
    ///
    /// The start time and position are checked before the input is touched.
    pub async fn open(config: &SourceConfig) -> Result<Self> {
        let start_ms = config.start_time_ms()?;
        let start_position = config.start_position()?;

        let source = if config.input == "-" {
            if config.follow {
                debug!("stdin already waits for input, follow mode not needed");
            }
            Self::stdin()?
        } else {
            Self::from_path(&config.input)
                .await?
                .with_follow(config.follow, Duration::from_millis(config.poll_interval_ms))
        };

        info!(
            input = %source.label,
            follow = source.follow,
            start_time = ?config.start_time,
            start_position = ?start_position,
            "Opened change event source"
        );

        Ok(source
            .with_start_time(start_ms)
            .with_start_position(start_position))
    }

    pub fn with_follow(mut self, follow: bool, poll_interval: Duration) -> Self {
        self.follow = follow;
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_start_time(mut self, start_ms: Option<i64>) -> Self {
        self.start_ms = start_ms;
        self
    }

    pub fn with_start_position(mut self, position: Option<BinlogPosition>) -> Self {
        self.start_position = position;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Events dropped because they predate the start time or position.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Returns the next event, or `None` once the input is exhausted.
    pub async fn next_event(&mut self) -> Result<Option<ChangeEvent>> {
        loop {
            let read = self.input.read_line(&mut self.pending).await?;
            let complete = self.pending.ends_with('\n');

            if read == 0 || !complete {
                if self.follow {
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
                if self.pending.is_empty() {
                    debug!(
                        input = %self.label,
                        lines = self.line_no,
                        skipped = self.skipped,
                        "End of change event input"
                    );
                    return Ok(None);
                }
            }

            let line = std::mem::take(&mut self.pending);
            self.line_no += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let event = self.decode(line)?;

            if self.before_start(&event) {
                self.skipped += 1;
                trace!(
                    line = self.line_no,
                    ts_ms = ?event.ts_ms,
                    position = ?event.position,
                    "Skipping event before start"
                );
                continue;
            }

            return Ok(Some(event));
        }
    }

    /// Events without a timestamp or position pass the matching filter.
    fn before_start(&self, event: &ChangeEvent) -> bool {
        if let (Some(start), Some(ts)) = (self.start_ms, event.ts_ms) {
            if ts < start {
                return true;
            }
        }
        matches!(
            (&self.start_position, &event.position),
            (Some(start), Some(position)) if position < start
        )
    }

    fn decode(&self, line: &str) -> Result<ChangeEvent> {
        serde_json::from_str(line).map_err(|e| Error::InvalidEvent {
            message: format!("{} line {}: {}", self.label, self.line_no, e),
        })
    }

    /// Turns the source into a lazy stream that pulls one line per poll.
    ///
    /// The stream ends after yielding its first error.
    pub fn into_stream(self) -> EventStream {
        Box::pin(futures::stream::unfold(Some(self), |state| async move {
            let mut source = state?;
            match source.next_event().await {
                Ok(Some(event)) => Some((Ok(event), Some(source))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        }))
    }
}

fn read_lines<R: io::BufRead>(mut reader: R, lines: mpsc::Sender<io::Result<String>>) {
    loop {
        let mut line = String::new();
        match io::BufRead::read_line(&mut reader, &mut line) {
            Ok(0) => break,
            Ok(_) => {
                if lines.blocking_send(Ok(line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = lines.blocking_send(Err(e));
                break;
            }
        }
    }
}

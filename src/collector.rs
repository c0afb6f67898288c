use futures::{Stream, StreamExt};
use std::future::Future;
use std::io::Write;
use tracing::{info, warn};

use crate::event::{ChangeEvent, ChangeOperation};
use crate::source::JsonLinesSource;
use crate::stats::{Report, StatAggregator};
use crate::{Config, Result};

/// Drives one run: source → aggregator → report.
pub struct Collector {
    config: Config,
    sort_key: ChangeOperation,
    aggregator: StatAggregator,
}

impl Collector {
    /// Fails with [`Error::InvalidArgument`](crate::Error::InvalidArgument)
    /// for an unknown sort key, before any input is read.
    pub fn new(config: Config) -> Result<Self> {
        let sort_key = config.sort_key()?;
        Ok(Self {
            config,
            sort_key,
            aggregator: StatAggregator::new(),
        })
    }

    pub fn sort_key(&self) -> ChangeOperation {
        self.sort_key
    }

    pub fn aggregator(&self) -> &StatAggregator {
        &self.aggregator
    }

    /// Reads the configured source until it ends or Ctrl+C is pressed, then
    /// writes the report once.
    pub async fn run<W: Write>(&mut self, writer: W) -> Result<Report> {
        let source = JsonLinesSource::open(&self.config.source).await?;
        self.run_with_stream(source.into_stream(), writer).await
    }

    pub async fn run_with_stream<S, W>(&mut self, events: S, writer: W) -> Result<Report>
    where
        S: Stream<Item = Result<ChangeEvent>>,
        W: Write,
    {
        self.run_until(events, shutdown_signal(), writer).await
    }

    /// Like [`run_with_stream`](Self::run_with_stream) but stops consuming
    /// when `shutdown` resolves. The report is written in both cases.
    pub async fn run_until<S, F, W>(&mut self, events: S, shutdown: F, writer: W) -> Result<Report>
    where
        S: Stream<Item = Result<ChangeEvent>>,
        F: Future<Output = ()>,
        W: Write,
    {
        info!(sorted_by = %self.sort_key, "Collecting change event statistics");

        self.collect(events, shutdown).await?;

        let report = self.aggregator.sorted_snapshot(self.sort_key);
        report.write_json(writer, self.config.report.pretty)?;

        info!(
            events = self.aggregator.events_processed(),
            rows = self.aggregator.rows_processed(),
            tables = self.aggregator.table_count(),
            sorted_by = %self.sort_key,
            "Statistics report written"
        );

        Ok(report)
    }

    async fn collect<S, F>(&mut self, events: S, shutdown: F) -> Result<()>
    where
        S: Stream<Item = Result<ChangeEvent>>,
        F: Future<Output = ()>,
    {
        futures::pin_mut!(events);
        futures::pin_mut!(shutdown);

        loop {
            let event = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, ending change event stream");
                    break;
                }
                next = events.next() => match next {
                    Some(event) => event?,
                    None => break,
                },
            };

            self.aggregator.process(&event)?;
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        futures::future::pending::<()>().await;
    }
}

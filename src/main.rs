use anyhow::Context;
use binlog_stat::{Collector, Config};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "binlog-stat")]
#[command(about = "Per-table and per-column DML statistics from a row change stream", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", help = "Optional TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(short, long, value_name = "PATH", help = "JSON-lines change event input, '-' for stdin")]
    input: Option<String>,

    #[arg(short, long, help = "Keep waiting for new events at end of input")]
    follow: bool,

    #[arg(long, value_name = "YYYY-MM-DD HH:MM:SS", help = "Skip events before this UTC time")]
    start_time: Option<String>,

    #[arg(long, value_name = "binlog-file-name", help = "Skip events logged before this binary log file")]
    log_file: Option<String>,

    #[arg(long, value_name = "binlog-file-pos", requires = "log_file", help = "Offset within --log-file to start from")]
    log_pos: Option<u64>,

    #[arg(short, long, value_name = "insert/update/delete", help = "Sort the report by this operation")]
    sorted_by: Option<String>,

    #[arg(long, help = "Print the report on a single line")]
    compact: bool,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(input) = &self.input {
            config.source.input = input.clone();
        }
        if self.follow {
            config.source.follow = true;
        }
        if let Some(start_time) = &self.start_time {
            config.source.start_time = Some(start_time.clone());
        }
        if let Some(log_file) = &self.log_file {
            config.source.log_file = Some(log_file.clone());
            config.source.log_pos = self.log_pos;
        }
        if let Some(sorted_by) = &self.sorted_by {
            config.report.sorted_by = sorted_by.clone();
        }
        if self.compact {
            config.report.pretty = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    info!("Starting binlog-stat");

    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);

    info!(
        input = %config.source.input,
        follow = config.source.follow,
        start_time = ?config.source.start_time,
        log_file = ?config.source.log_file,
        log_pos = ?config.source.log_pos,
        sorted_by = %config.report.sorted_by,
        "Configuration summary"
    );

    let mut collector = Collector::new(config).context("invalid report options")?;

    let stdout = std::io::stdout();
    if let Err(e) = collector.run(stdout.lock()).await {
        error!("Statistics collection failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("binlog_stat=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("binlog_stat=info,warn"))
    };

    // stdout carries the report, logs go to stderr
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

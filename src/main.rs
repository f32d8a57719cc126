//! ledgerq CLI: start a run, stop it on any input.

use clap::Parser;
use ledgerq::prelude::*;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "ledgerq", about = "Bounded producer/consumer run over a shared task ledger")]
struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of producers
    #[arg(long)]
    producers: Option<usize>,
    /// Number of consumers
    #[arg(long)]
    consumers: Option<usize>,
    /// Total number of tasks to produce
    #[arg(long)]
    limit: Option<usize>,
    /// Pause after each append, in milliseconds
    #[arg(long)]
    producer_interval_ms: Option<u64>,
    /// Pause after each tail inspection, in milliseconds
    #[arg(long)]
    consumer_interval_ms: Option<u64>,
    /// Log level for diagnostics on stderr (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<LogLevel>,
}

impl Cli {
    fn into_config(self) -> LedgerResult<LedgerConfig> {
        let mut config = match &self.config {
            Some(path) => LedgerConfig::from_json_file(path)?,
            None => LedgerConfig::default(),
        };

        if let Some(count) = self.producers {
            config.producers.count = count;
        }
        if let Some(count) = self.consumers {
            config.consumers.count = count;
        }
        if let Some(limit) = self.limit {
            config.run.production_limit = limit;
        }
        if let Some(interval_ms) = self.producer_interval_ms {
            config.producers.interval_ms = interval_ms;
        }
        if let Some(interval_ms) = self.consumer_interval_ms {
            config.consumers.interval_ms = interval_ms;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }

        config.validate().map_err(LedgerError::invalid)?;
        Ok(config)
    }
}

/// Resolve on the first line (or byte) typed on standard input.
///
/// A closed stdin is not input: the run then ends at the production limit.
async fn wait_for_input(orchestrator: &Orchestrator) -> LedgerResult<()> {
    let mut line = String::new();
    let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    if read == 0 {
        tracing::info!("stdin closed, running until the production limit");
        orchestrator.wait_for_production_limit().await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> LedgerResult<()> {
    let config = Cli::parse().into_config()?;
    config.logging.init();

    let orchestrator = Orchestrator::new(config)?;
    orchestrator.start().await?;

    tokio::select! {
        result = wait_for_input(&orchestrator) => {
            result?;
            tracing::info!("Input received, stopping");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, stopping");
        }
    }

    let stats = orchestrator.shutdown().await?;
    tracing::info!(
        "Produced {} tasks, reported {} across {} consumers",
        stats.produced,
        stats.reported,
        stats.consumers_spawned
    );

    // A pending stdin read would keep the runtime from shutting down.
    std::process::exit(0)
}

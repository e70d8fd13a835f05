//! Stockify command line entry point.

mod logging;

use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use stockify_ingest::{
    Dataset, IngestConfig, IngestPipeline, WriteOutcome, YahooProvider, DEFAULT_DATASETS,
};

#[derive(Parser)]
#[command(name = "stockify")]
#[command(about = "Resilient market data ingestion into a date-partitioned raw store", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest datasets for the whole symbol universe
    Ingest {
        /// Datasets to run, in order (comma separated, e.g. "news,actions")
        #[arg(long)]
        datasets: Option<String>,

        /// Explicit symbols instead of the ticker list (comma separated)
        #[arg(long)]
        symbols: Option<String>,

        /// Only process the first N symbols
        #[arg(long)]
        limit: Option<usize>,

        /// Partition date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        run_date: Option<NaiveDate>,

        /// History range (1mo, 1y, max, ...)
        #[arg(long)]
        period: Option<String>,
    },

    /// Fetch and store one dataset for one symbol
    Fetch {
        #[arg(long)]
        symbol: String,

        #[arg(long)]
        dataset: Dataset,

        /// Partition date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        run_date: Option<NaiveDate>,

        /// History range (1mo, 1y, max, ...)
        #[arg(long)]
        period: Option<String>,
    },
}

fn parse_datasets(raw: Option<&str>) -> anyhow::Result<Vec<Dataset>> {
    match raw {
        None => Ok(DEFAULT_DATASETS.to_vec()),
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<Dataset>().map_err(anyhow::Error::from))
            .collect(),
    }
}

fn split_symbols(raw: Option<String>) -> Option<Vec<String>> {
    raw.map(|s| s.split(',').map(|v| v.trim().to_string()).collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = IngestConfig::from_env().context("Invalid configuration")?;
    let log_path = logging::init_tracing(&cli.log_level, config.log_dir.as_deref())?;
    if let Some(path) = log_path {
        tracing::info!(path = %path.display(), "Writing logs to file");
    }

    let provider = Arc::new(YahooProvider::new()?);
    let pipeline = IngestPipeline::new(config, provider)?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Ingest {
            datasets,
            symbols,
            limit,
            run_date,
            period,
        } => {
            let datasets = parse_datasets(datasets.as_deref())?;
            let universe = pipeline.universe(split_symbols(symbols), limit);
            if universe.is_empty() {
                tracing::warn!("Symbol universe is empty. Nothing to do.");
                return Ok(());
            }

            let run_date = run_date.unwrap_or(today);
            tracing::info!(
                symbols = universe.len(),
                datasets = ?datasets,
                run_date = %run_date,
                "Starting ingest"
            );
            let report = pipeline.run(&datasets, &universe, run_date, period).await;
            for (dataset, error) in &report.failed {
                tracing::error!(dataset = %dataset, "Dataset failed: {}", error);
            }
            tracing::info!("Ingest finished");
        }
        Commands::Fetch {
            symbol,
            dataset,
            run_date,
            period,
        } => {
            let symbol = pipeline
                .universe(Some(vec![symbol]), None)
                .into_iter()
                .next()
                .context("Symbol must not be empty")?;
            let run_date = run_date.unwrap_or(today);

            match pipeline.fetch_one(&symbol, dataset, run_date, period).await? {
                Some(WriteOutcome::Written(artifact)) => {
                    tracing::info!(path = %artifact.location.display(), "Saved {}", symbol)
                }
                Some(WriteOutcome::Skipped(path)) => {
                    tracing::info!(path = %path.display(), "Already stored {}", symbol)
                }
                Some(WriteOutcome::Empty) => tracing::warn!("Nothing to store for {}", symbol),
                None => anyhow::bail!("No usable {} data for {}", dataset, symbol),
            }
        }
    }

    Ok(())
}

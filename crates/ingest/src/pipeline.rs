//! Multi-dataset ingest runs.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::config::IngestConfig;
use crate::errors::{IngestError, Result};
use crate::models::{ArtifactKey, BatchJob, Dataset, FetchRequest};
use crate::provider::DataProvider;
use crate::registry::{ConcurrencyLimiter, FetchOutcome, Fetcher, FetcherConfig, RateLimitGate};
use crate::resolver::VariantGenerator;
use crate::scheduler::{BatchReport, BatchScheduler};
use crate::storage::{WriteOutcome, Writer, DEFAULT_PROVIDER_TAG};
use crate::tickers::load_ticker_list;

/// Datasets a daily run ingests when none are requested explicitly.
pub const DEFAULT_DATASETS: [Dataset; 4] = [
    Dataset::News,
    Dataset::Actions,
    Dataset::EarningsDates,
    Dataset::Calendar,
];

/// Outcome of a pipeline run, in dataset order.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub completed: Vec<(Dataset, BatchReport)>,
    pub failed: Vec<(Dataset, String)>,
    /// Inter-dataset cooldowns taken.
    pub cooldowns: usize,
}

/// Wires one shared fetcher, writer and scheduler and runs datasets
/// through them one after another.
pub struct IngestPipeline {
    config: IngestConfig,
    fetcher: Arc<Fetcher>,
    writer: Arc<Writer>,
    scheduler: BatchScheduler,
}

impl IngestPipeline {
    /// Build the pipeline. Fails if the data root is unusable.
    pub fn new(config: IngestConfig, provider: Arc<dyn DataProvider>) -> Result<Self> {
        config.validate()?;

        let fetcher = Arc::new(Fetcher::with_config(
            provider,
            ConcurrencyLimiter::new(config.max_concurrency),
            Arc::new(RateLimitGate::new()),
            VariantGenerator::default(),
            FetcherConfig {
                rate_limit_cooldown: config.rate_limit_cooldown,
                ..FetcherConfig::default()
            },
        ));
        let writer = Arc::new(
            Writer::new(&config.data_root, DEFAULT_PROVIDER_TAG)?
                .with_default_suffix(config.default_suffix.clone()),
        );
        let scheduler = BatchScheduler::new(Arc::clone(&fetcher), Arc::clone(&writer))
            .with_retries(config.retries)
            .with_timeout(config.request_timeout)
            .with_resource_sampling(config.sample_resources);

        Ok(Self {
            config,
            fetcher,
            writer,
            scheduler,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    pub fn writer(&self) -> &Arc<Writer> {
        &self.writer
    }

    /// Resolve the symbol universe.
    ///
    /// Explicit symbols win over the configured ticker list; either way the
    /// default suffix is applied and the list is capped at `limit` (or the
    /// configured symbol limit).
    pub fn universe(&self, symbols: Option<Vec<String>>, limit: Option<usize>) -> Vec<String> {
        let suffix = &self.config.default_suffix;
        let mut universe = match symbols {
            Some(symbols) => {
                let variants = VariantGenerator::default();
                symbols
                    .iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| variants.with_suffix(s, suffix))
                    .collect()
            }
            None => load_ticker_list(&self.config.ticker_list, suffix),
        };

        if let Some(limit) = limit.or(self.config.symbol_limit) {
            universe.truncate(limit);
        }
        universe
    }

    /// Run one dataset over the universe.
    pub async fn run_dataset(
        &self,
        dataset: Dataset,
        symbols: &[String],
        run_date: NaiveDate,
        period: Option<String>,
    ) -> Result<BatchReport> {
        let writer = Arc::clone(&self.writer);
        let partition =
            tokio::task::spawn_blocking(move || writer.ensure_partition(dataset, run_date))
                .await
                .map_err(|e| IngestError::Task(e.to_string()))??;
        info!(dataset = %dataset, partition = %partition.display(), "Starting {}", dataset);

        let job = BatchJob::new(symbols.to_vec(), dataset, run_date)
            .with_chunk_size(self.config.batch_size)
            .with_cooldown(self.config.cool_down)
            .with_period(period);
        Ok(self.scheduler.run(&job).await)
    }

    /// Run every dataset in order, cooling down between them.
    ///
    /// A dataset that fails fatally is logged and skipped; the pipeline
    /// moves straight on to the next one.
    pub async fn run(
        &self,
        datasets: &[Dataset],
        symbols: &[String],
        run_date: NaiveDate,
        period: Option<String>,
    ) -> PipelineReport {
        let mut report = PipelineReport::default();

        for (index, dataset) in datasets.iter().copied().enumerate() {
            match self
                .run_dataset(dataset, symbols, run_date, period.clone())
                .await
            {
                Ok(batch) => report.completed.push((dataset, batch)),
                Err(e) => {
                    error!(dataset = %dataset, "Error in {}: {}", dataset, e);
                    report.failed.push((dataset, e.to_string()));
                    continue;
                }
            }

            if index + 1 < datasets.len() {
                info!(
                    cooldown_secs = self.config.operation_cool_down.as_secs(),
                    "Cooling down for {:?} after {}",
                    self.config.operation_cool_down,
                    dataset
                );
                tokio::time::sleep(self.config.operation_cool_down).await;
                report.cooldowns += 1;
            }
        }

        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            "All datasets processed"
        );
        report
    }

    /// Fetch and store a single symbol's dataset.
    ///
    /// Returns `None` when no variant produced usable data.
    pub async fn fetch_one(
        &self,
        symbol: &str,
        dataset: Dataset,
        run_date: NaiveDate,
        period: Option<String>,
    ) -> Result<Option<WriteOutcome>> {
        let request = FetchRequest::new(symbol, dataset)
            .with_period(period)
            .with_retries(self.config.retries)
            .with_timeout(self.config.request_timeout);

        let payload = match self.fetcher.fetch(&request).await {
            FetchOutcome::Found { payload, .. } => payload,
            FetchOutcome::NotFound { .. } => return Ok(None),
        };

        let writer = Arc::clone(&self.writer);
        let key = ArtifactKey::new(dataset, run_date, symbol);
        let outcome = tokio::task::spawn_blocking(move || writer.write(&key, payload))
            .await
            .map_err(|e| IngestError::Task(e.to_string()))??;
        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::models::Payload;
    use crate::provider::FetchParams;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::tempdir;

    struct EchoProvider;

    #[async_trait]
    impl DataProvider for EchoProvider {
        fn id(&self) -> &'static str {
            "ECHO"
        }

        async fn fetch(
            &self,
            symbol: &str,
            _dataset: Dataset,
            _params: &FetchParams,
        ) -> std::result::Result<Payload, ProviderError> {
            Ok(Payload::List(vec![json!(symbol)]))
        }
    }

    fn pipeline(root: &std::path::Path) -> IngestPipeline {
        let config = IngestConfig {
            data_root: root.to_path_buf(),
            ticker_list: root.join("tickers.csv"),
            sample_resources: false,
            ..IngestConfig::default()
        };
        IngestPipeline::new(config, Arc::new(EchoProvider)).unwrap()
    }

    #[test]
    fn test_universe_from_explicit_symbols() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline(dir.path());

        let universe = pipeline.universe(
            Some(vec!["INFY".to_string(), " ".to_string(), "TCS.BO".to_string()]),
            None,
        );

        assert_eq!(universe, vec!["INFY.NS", "TCS.BO"]);
    }

    #[test]
    fn test_universe_from_ticker_list_with_limit() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("tickers.csv"), "Ticker\nA\nB\nC\n").unwrap();
        let pipeline = pipeline(dir.path());

        assert_eq!(pipeline.universe(None, Some(2)), vec!["A.NS", "B.NS"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_one_writes_artifact() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let run_date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

        let outcome = pipeline
            .fetch_one("ITC.NS", Dataset::News, run_date, None)
            .await
            .unwrap();

        assert!(matches!(outcome, Some(WriteOutcome::Written(_))));
        assert!(dir.path().join("yf/news/2024-06-03/ITC.json").exists());
    }

    #[test]
    fn test_new_rejects_invalid_root() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        let config = IngestConfig {
            data_root: file,
            ..IngestConfig::default()
        };

        let result = IngestPipeline::new(config, Arc::new(EchoProvider));

        assert!(matches!(result, Err(IngestError::Storage { .. })));
    }
}

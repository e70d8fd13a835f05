//! Chunked fan-out of a dataset over a symbol universe.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::report::{BatchReport, SymbolOutcome};
use super::resources;
use crate::errors::IngestError;
use crate::models::{ArtifactKey, BatchJob, FetchRequest, DEFAULT_RETRIES, DEFAULT_TIMEOUT};
use crate::registry::{FetchOutcome, Fetcher};
use crate::storage::{WriteOutcome, Writer};

/// Runs batch jobs: one fetch+write task per symbol, a chunk at a time.
///
/// Chunks run strictly one after another with a cooldown in between. The
/// tasks of a chunk share the fetcher's concurrency limiter, so the chunk
/// size bounds how many symbols are in flight while the limiter bounds how
/// many provider calls are.
pub struct BatchScheduler {
    fetcher: Arc<Fetcher>,
    writer: Arc<Writer>,
    retries: u32,
    timeout: Duration,
    sample_resources: bool,
}

impl BatchScheduler {
    pub fn new(fetcher: Arc<Fetcher>, writer: Arc<Writer>) -> Self {
        Self {
            fetcher,
            writer,
            retries: DEFAULT_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            sample_resources: false,
        }
    }

    /// Attempts per variant for every request of a run.
    pub fn with_retries(self, retries: u32) -> Self {
        Self {
            retries: retries.max(1),
            ..self
        }
    }

    /// Per-call timeout for every request of a run.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Log process memory and CPU time after each chunk.
    pub fn with_resource_sampling(self, enabled: bool) -> Self {
        Self {
            sample_resources: enabled,
            ..self
        }
    }

    /// Run a job to completion. Per-symbol failures are recorded in the
    /// report, never propagated.
    pub async fn run(&self, job: &BatchJob) -> BatchReport {
        let started = Instant::now();
        let chunk_size = job.chunk_size.max(1);
        let chunk_count = job.chunk_count();
        let mut report = BatchReport {
            total: job.symbols.len(),
            ..BatchReport::new()
        };

        info!(
            dataset = %job.dataset,
            run_date = %job.run_date,
            symbols = job.symbols.len(),
            chunks = chunk_count,
            "Starting batch run for {}",
            job.dataset
        );

        for (index, chunk) in job.symbols.chunks(chunk_size).enumerate() {
            info!(
                dataset = %job.dataset,
                "Processing batch {}/{}",
                index + 1,
                chunk_count
            );

            self.run_chunk(job, chunk, &mut report).await;
            report.chunks += 1;

            if self.sample_resources {
                log_resources(index + 1, chunk_count);
            }

            if index + 1 < chunk_count {
                info!(
                    cooldown_secs = job.cooldown.as_secs(),
                    "Batch complete. Sleeping for {:?}",
                    job.cooldown
                );
                tokio::time::sleep(job.cooldown).await;
                report.cooldowns += 1;
            }
        }

        report.elapsed = started.elapsed();
        report.log_summary(job.dataset);
        report
    }

    /// Spawn one task per symbol and wait for all of them to settle.
    async fn run_chunk(&self, job: &BatchJob, chunk: &[String], report: &mut BatchReport) {
        let mut tasks = JoinSet::new();
        let mut symbols_by_task = HashMap::new();

        for symbol in chunk {
            let request = FetchRequest::new(symbol.clone(), job.dataset)
                .with_period(job.period.clone())
                .with_retries(self.retries)
                .with_timeout(self.timeout);
            let key = ArtifactKey::new(job.dataset, job.run_date, symbol.clone());
            let fetcher = Arc::clone(&self.fetcher);
            let writer = Arc::clone(&self.writer);

            let handle = tasks.spawn(process_symbol(fetcher, writer, request, key));
            symbols_by_task.insert(handle.id(), symbol.clone());
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    let symbol = symbols_by_task
                        .get(&e.id())
                        .map(String::as_str)
                        .unwrap_or("<unknown>");
                    if e.is_panic() {
                        report.panicked += 1;
                        error!(symbol, "Task panicked: {}", e);
                    } else {
                        report.record(&SymbolOutcome::Failed(e.to_string()));
                        error!(symbol, "Task failed: {}", e);
                    }
                }
            }
        }
    }
}

/// Fetch, validate and persist a single symbol.
async fn process_symbol(
    fetcher: Arc<Fetcher>,
    writer: Arc<Writer>,
    request: FetchRequest,
    key: ArtifactKey,
) -> SymbolOutcome {
    let payload = match fetcher.fetch(&request).await {
        FetchOutcome::Found { payload, .. } => payload,
        FetchOutcome::NotFound { .. } => {
            warn!(
                symbol = request.symbol(),
                dataset = %request.dataset(),
                "No usable data. Skipping."
            );
            return SymbolOutcome::NotFound;
        }
    };

    let symbol = key.symbol.clone();
    let written = tokio::task::spawn_blocking(move || writer.write(&key, payload)).await;

    match written {
        Ok(Ok(WriteOutcome::Written(artifact))) => {
            debug!(symbol = %symbol, path = %artifact.location.display(), "Stored artifact");
            SymbolOutcome::Written
        }
        Ok(Ok(WriteOutcome::Skipped(_))) => SymbolOutcome::Skipped,
        Ok(Ok(WriteOutcome::Empty)) => SymbolOutcome::Empty,
        Ok(Err(e)) => {
            error!(symbol = %symbol, "Failed to save: {}", e);
            SymbolOutcome::Failed(e.to_string())
        }
        Err(e) => {
            let err = IngestError::Task(e.to_string());
            error!(symbol = %symbol, "Write task failed: {}", err);
            SymbolOutcome::Failed(err.to_string())
        }
    }
}

fn log_resources(chunk: usize, chunk_count: usize) {
    match resources::sample() {
        Some(usage) => info!(
            chunk,
            chunks = chunk_count,
            rss_mib = usage.rss_mib().map(|m| format!("{:.2}", m)),
            cpu_secs = usage.cpu_time.map(|t| format!("{:.2}", t.as_secs_f64())),
            "Resource usage"
        ),
        None => debug!("Resource usage unavailable on this platform"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::models::{Dataset, Payload};
    use crate::provider::{DataProvider, FetchParams};
    use crate::registry::ConcurrencyLimiter;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Returns one news item per call for every symbol.
    struct NewsProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DataProvider for NewsProvider {
        fn id(&self) -> &'static str {
            "MOCK"
        }

        async fn fetch(
            &self,
            symbol: &str,
            _dataset: Dataset,
            _params: &FetchParams,
        ) -> Result<Payload, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Payload::List(vec![json!({ "title": symbol })]))
        }
    }

    fn job(symbols: &[&str]) -> BatchJob {
        BatchJob::new(
            symbols.iter().map(|s| s.to_string()).collect(),
            Dataset::News,
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_writes_every_symbol_and_cools_down_between_chunks() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(NewsProvider {
            calls: AtomicUsize::new(0),
        });
        let fetcher = Arc::new(Fetcher::new(provider.clone(), ConcurrencyLimiter::new(2)));
        let writer = Arc::new(Writer::new(dir.path(), "yf").unwrap());
        let scheduler = BatchScheduler::new(fetcher, writer);

        let job = job(&["A.NS", "B.NS", "C.NS", "D.NS", "E.NS"])
            .with_chunk_size(2)
            .with_cooldown(Duration::from_secs(60));
        let report = scheduler.run(&job).await;

        assert_eq!(report.total, 5);
        assert_eq!(report.written, 5);
        assert_eq!(report.chunks, 3);
        assert_eq!(report.cooldowns, 2);
        assert!(report.elapsed >= Duration::from_secs(120));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
        assert!(dir.path().join("yf/news/2024-06-03/C.json").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_skips_existing_artifacts() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(NewsProvider {
            calls: AtomicUsize::new(0),
        });
        let fetcher = Arc::new(Fetcher::new(provider, ConcurrencyLimiter::new(2)));
        let writer = Arc::new(Writer::new(dir.path(), "yf").unwrap());
        let scheduler = BatchScheduler::new(fetcher, writer);
        let job = job(&["A.NS", "B.NS"]).with_cooldown(Duration::ZERO);

        scheduler.run(&job).await;
        let report = scheduler.run(&job).await;

        assert_eq!(report.written, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.cooldowns, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_universe() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(NewsProvider {
            calls: AtomicUsize::new(0),
        });
        let fetcher = Arc::new(Fetcher::new(provider, ConcurrencyLimiter::new(1)));
        let writer = Arc::new(Writer::new(dir.path(), "yf").unwrap());

        let report = BatchScheduler::new(fetcher, writer).run(&job(&[])).await;

        assert_eq!(report.total, 0);
        assert_eq!(report.chunks, 0);
        assert_eq!(report.cooldowns, 0);
    }
}

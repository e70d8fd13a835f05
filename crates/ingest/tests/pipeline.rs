use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Map};
use stockify_ingest::{
    DataProvider, Dataset, FetchParams, IngestConfig, IngestPipeline, Payload, ProviderError,
    Table,
};
use tempfile::tempdir;
use tokio::time::Instant;

/// Answers every dataset with a payload of the matching shape.
struct DatasetProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl DataProvider for DatasetProvider {
    fn id(&self) -> &'static str {
        "MOCK"
    }

    async fn fetch(
        &self,
        symbol: &str,
        dataset: Dataset,
        _params: &FetchParams,
    ) -> Result<Payload, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match dataset {
            Dataset::News => Payload::List(vec![json!({ "title": symbol })]),
            Dataset::Info | Dataset::Calendar => {
                let mut map = Map::new();
                map.insert("symbol".to_string(), json!(symbol));
                Payload::Keyed(map)
            }
            Dataset::History | Dataset::Actions | Dataset::EarningsDates => {
                let mut table = Table::new(["Value"]);
                table.push_row("2024-06-03", vec![json!(1.5)]);
                Payload::Table(table)
            }
        })
    }
}

fn config(root: &std::path::Path) -> IngestConfig {
    IngestConfig {
        data_root: root.to_path_buf(),
        ticker_list: root.join("tickers.csv"),
        batch_size: 2,
        cool_down: Duration::from_secs(1),
        operation_cool_down: Duration::from_secs(600),
        sample_resources: false,
        ..IngestConfig::default()
    }
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
}

#[tokio::test(start_paused = true)]
async fn runs_datasets_in_order_with_cooldown_between() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("tickers.csv"), "Ticker\nRELIANCE\nTCS\nINFY\n").unwrap();
    let provider = Arc::new(DatasetProvider {
        calls: AtomicUsize::new(0),
    });
    let pipeline = IngestPipeline::new(config(dir.path()), provider.clone()).unwrap();
    let universe = pipeline.universe(None, None);
    let start = Instant::now();

    let report = pipeline
        .run(
            &[Dataset::News, Dataset::Actions, Dataset::Calendar],
            &universe,
            run_date(),
            None,
        )
        .await;

    assert_eq!(report.completed.len(), 3);
    assert!(report.failed.is_empty());
    assert_eq!(report.cooldowns, 2);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 9);
    // Two operation cooldowns plus one chunk cooldown per dataset.
    assert!(start.elapsed() >= Duration::from_secs(1203));
    assert!(start.elapsed() < Duration::from_secs(1800));

    let root = dir.path().join("yf");
    assert!(root.join("news/2024-06-03/RELIANCE.json").exists());
    assert!(root.join("actions/2024-06-03/TCS.csv").exists());
    assert!(root.join("calendar/2024-06-03/INFY.json").exists());
    let actions = std::fs::read_to_string(root.join("actions/2024-06-03/TCS.csv")).unwrap();
    assert_eq!(actions, "Value,actions_features\n1.5,2024-06-03\n");
}

#[tokio::test(start_paused = true)]
async fn failed_dataset_is_skipped_without_cooldown() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(DatasetProvider {
        calls: AtomicUsize::new(0),
    });
    let pipeline = IngestPipeline::new(config(dir.path()), provider).unwrap();
    // A file where the news partition tree should go.
    std::fs::create_dir_all(dir.path().join("yf")).unwrap();
    std::fs::write(dir.path().join("yf/news"), b"blocked").unwrap();
    let universe = pipeline.universe(Some(vec!["ITC".to_string()]), None);
    let start = Instant::now();

    let report = pipeline
        .run(&[Dataset::News, Dataset::Calendar], &universe, run_date(), None)
        .await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, Dataset::News);
    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.cooldowns, 0);
    assert!(start.elapsed() < Duration::from_secs(600));
    assert!(dir.path().join("yf/calendar/2024-06-03/ITC.json").exists());
}

#[tokio::test(start_paused = true)]
async fn rerun_on_same_date_skips_everything() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(DatasetProvider {
        calls: AtomicUsize::new(0),
    });
    let pipeline = IngestPipeline::new(config(dir.path()), provider).unwrap();
    let universe = pipeline.universe(Some(vec!["SBIN".to_string(), "ITC".to_string()]), None);
    let path = dir.path().join("yf/news/2024-06-03/SBIN.json");

    pipeline
        .run(&[Dataset::News], &universe, run_date(), None)
        .await;
    let first = std::fs::read_to_string(&path).unwrap();
    let report = pipeline
        .run(&[Dataset::News], &universe, run_date(), None)
        .await;

    let (_, batch) = &report.completed[0];
    assert_eq!(batch.skipped, 2);
    assert_eq!(batch.written, 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
}

//! Environment-based configuration.
//!
//! Values come from the process environment, optionally seeded from a
//! `.env` file. Unparsable values fall back to their defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{IngestError, Result};
use crate::registry::{DEFAULT_MAX_CONCURRENCY, DEFAULT_RATE_LIMIT_COOLDOWN};
use crate::resolver::NSE_SUFFIX;

const DEFAULT_DATA_ROOT: &str = "./DataStorage";
const DEFAULT_TICKER_LIST: &str = "./config/tickers.csv";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BATCH_SIZE: usize = 50;
const DEFAULT_COOL_DOWN_SECS: u64 = 60;
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_OPERATION_COOL_DOWN_SECS: u64 = 600;

/// Ingest run settings.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    /// Root of the raw artifact store.
    pub data_root: PathBuf,
    /// CSV file listing the symbol universe.
    pub ticker_list: PathBuf,
    /// Directory for JSON log files. Terminal only when unset.
    pub log_dir: Option<PathBuf>,
    pub max_concurrency: usize,
    pub request_timeout: Duration,
    /// Symbols per chunk.
    pub batch_size: usize,
    /// Pause between chunks.
    pub cool_down: Duration,
    /// Attempts per symbol variant.
    pub retries: u32,
    pub rate_limit_cooldown: Duration,
    /// Pause between datasets of a pipeline run.
    pub operation_cool_down: Duration,
    /// Only process the first N symbols of the universe.
    pub symbol_limit: Option<usize>,
    /// Suffix appended to bare tickers and stripped from artifact names.
    pub default_suffix: String,
    /// Log process memory and CPU time after each chunk.
    pub sample_resources: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
            ticker_list: PathBuf::from(DEFAULT_TICKER_LIST),
            log_dir: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
            cool_down: Duration::from_secs(DEFAULT_COOL_DOWN_SECS),
            retries: DEFAULT_RETRIES,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
            operation_cool_down: Duration::from_secs(DEFAULT_OPERATION_COOL_DOWN_SECS),
            symbol_limit: None,
            default_suffix: NSE_SUFFIX.to_string(),
            sample_resources: true,
        }
    }
}

impl IngestConfig {
    /// Load from the environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |key: &str| lookup(key).map(|v| v.trim().to_string());

        let config = Self {
            data_root: parse("STOCKIFY_DATA_ROOT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_root),
            ticker_list: parse("STOCKIFY_TICKER_LIST")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.ticker_list),
            log_dir: parse("STOCKIFY_LOG_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            max_concurrency: parse_or(
                &lookup,
                "STOCKIFY_MAX_CONCURRENCY",
                defaults.max_concurrency,
            ),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "STOCKIFY_REQUEST_TIMEOUT_SECONDS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            batch_size: parse_or(&lookup, "STOCKIFY_BATCH_SIZE", defaults.batch_size),
            cool_down: Duration::from_secs(parse_or(
                &lookup,
                "STOCKIFY_COOL_DOWN",
                DEFAULT_COOL_DOWN_SECS,
            )),
            retries: parse_or(&lookup, "STOCKIFY_RETRIES", defaults.retries),
            rate_limit_cooldown: Duration::from_secs(parse_or(
                &lookup,
                "STOCKIFY_RATE_LIMIT_COOLDOWN",
                DEFAULT_RATE_LIMIT_COOLDOWN.as_secs(),
            )),
            operation_cool_down: Duration::from_secs(parse_or(
                &lookup,
                "STOCKIFY_OPERATION_COOL_DOWN",
                DEFAULT_OPERATION_COOL_DOWN_SECS,
            )),
            symbol_limit: parse("STOCKIFY_SYMBOL_LIMIT").and_then(|v| v.parse().ok()),
            default_suffix: parse("STOCKIFY_DEFAULT_SUFFIX").unwrap_or(defaults.default_suffix),
            sample_resources: parse("STOCKIFY_SAMPLE_RESOURCES")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.sample_resources),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings no run could work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(IngestError::Config(
                "STOCKIFY_MAX_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(IngestError::Config(
                "STOCKIFY_BATCH_SIZE must be at least 1".to_string(),
            ));
        }
        if self.retries == 0 {
            return Err(IngestError::Config(
                "STOCKIFY_RETRIES must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

use std::time::Duration;

use super::Dataset;

/// Default number of attempts per symbol variant.
pub const DEFAULT_RETRIES: u32 = 3;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A single (symbol, dataset) fetch.
///
/// Immutable once built; the `with_*` methods consume and return a new value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    symbol: String,
    dataset: Dataset,
    period: Option<String>,
    retries: u32,
    timeout: Duration,
}

impl FetchRequest {
    pub fn new(symbol: impl Into<String>, dataset: Dataset) -> Self {
        Self {
            symbol: symbol.into(),
            dataset,
            period: None,
            retries: DEFAULT_RETRIES,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// History range such as `1mo`, `1y` or `max`.
    pub fn with_period(self, period: Option<String>) -> Self {
        Self { period, ..self }
    }

    /// Attempts per variant, clamped to at least one.
    pub fn with_retries(self, retries: u32) -> Self {
        Self {
            retries: retries.max(1),
            ..self
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    pub fn period(&self) -> Option<&str> {
        self.period.as_deref()
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

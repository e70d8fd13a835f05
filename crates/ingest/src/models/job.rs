use std::time::Duration;

use chrono::NaiveDate;

use super::Dataset;

/// One orchestration run of a dataset over a symbol universe.
#[derive(Clone, Debug)]
pub struct BatchJob {
    pub symbols: Vec<String>,
    pub dataset: Dataset,
    pub run_date: NaiveDate,
    pub chunk_size: usize,
    pub cooldown: Duration,
    pub period: Option<String>,
}

impl BatchJob {
    pub fn new(symbols: Vec<String>, dataset: Dataset, run_date: NaiveDate) -> Self {
        Self {
            symbols,
            dataset,
            run_date,
            chunk_size: 50,
            cooldown: Duration::from_secs(60),
            period: None,
        }
    }

    /// Chunk size, clamped to at least one symbol per chunk.
    pub fn with_chunk_size(self, chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            ..self
        }
    }

    pub fn with_cooldown(self, cooldown: Duration) -> Self {
        Self { cooldown, ..self }
    }

    pub fn with_period(self, period: Option<String>) -> Self {
        Self { period, ..self }
    }

    /// Number of chunks this job will run.
    pub fn chunk_count(&self) -> usize {
        self.symbols.len().div_ceil(self.chunk_size.max(1))
    }
}

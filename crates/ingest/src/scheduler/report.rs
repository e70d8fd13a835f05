use std::time::Duration;

use crate::models::Dataset;

/// Final state of one symbol in a batch run.
#[derive(Clone, Debug, PartialEq)]
pub enum SymbolOutcome {
    Written,
    /// Artifact already present for this run date.
    Skipped,
    /// Fetched successfully but nothing to persist.
    Empty,
    /// Every variant exhausted.
    NotFound,
    /// The write failed or the task errored.
    Failed(String),
}

/// Counters for one batch run.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub total: usize,
    pub written: usize,
    pub skipped: usize,
    pub empty: usize,
    pub not_found: usize,
    pub failed: usize,
    /// Tasks that panicked; their siblings still ran to completion.
    pub panicked: usize,
    pub chunks: usize,
    /// Inter-chunk cooldowns taken.
    pub cooldowns: usize,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &SymbolOutcome) {
        match outcome {
            SymbolOutcome::Written => self.written += 1,
            SymbolOutcome::Skipped => self.skipped += 1,
            SymbolOutcome::Empty => self.empty += 1,
            SymbolOutcome::NotFound => self.not_found += 1,
            SymbolOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Symbols whose task settled, whatever the outcome.
    pub fn settled(&self) -> usize {
        self.written + self.skipped + self.empty + self.not_found + self.failed + self.panicked
    }

    /// Share of symbols that ended with an artifact on disk (%).
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            ((self.written + self.skipped) as f64 / self.total as f64) * 100.0
        }
    }

    pub fn log_summary(&self, dataset: Dataset) {
        tracing::info!(
            dataset = %dataset,
            total = self.total,
            written = self.written,
            skipped = self.skipped,
            empty = self.empty,
            not_found = self.not_found,
            failed = self.failed,
            panicked = self.panicked,
            chunks = self.chunks,
            cooldowns = self.cooldowns,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "All batches completed for {}",
            dataset
        );
    }
}

//! Exponential backoff with jitter for transient provider failures.

use std::time::Duration;

use rand::Rng;

/// Backoff delay policy: `unit * min(cap, 2^attempt) + jitter`.
#[derive(Clone, Debug)]
pub struct BackoffPolicy {
    /// Time unit the exponential term is measured in.
    pub unit: Duration,
    /// Upper bound of the exponential term, in units.
    pub cap_units: u32,
    /// Upper bound (exclusive) of the uniform random jitter.
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            cap_units: 30,
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl BackoffPolicy {
    /// No waiting at all. Handy for tests and dry runs.
    pub fn none() -> Self {
        Self {
            unit: Duration::ZERO,
            cap_units: 0,
            max_jitter: Duration::ZERO,
        }
    }

    /// Deterministic part of the delay after the given (1-based) attempt.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponential = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.unit * exponential.min(self.cap_units)
    }

    /// Full delay after the given attempt, including jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            let fraction: f64 = rand::thread_rng().gen_range(0.0..1.0);
            self.max_jitter.mul_f64(fraction)
        };
        self.base_delay(attempt) + jitter
    }
}

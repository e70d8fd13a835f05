//! Fetch orchestration.
//!
//! This module provides the resilient fetch path for a single request:
//! - Ordered symbol variant fallback
//! - Retry with exponential backoff for transient failures
//! - Fetcher-wide cooldown on rate limiting
//! - Global cap on in-flight provider calls
//! - Result validation

mod backoff;
mod cooldown;
mod diagnostics;
mod fetcher;
mod limiter;
mod validator;

pub use backoff::BackoffPolicy;
pub use cooldown::{RateLimitGate, DEFAULT_RATE_LIMIT_COOLDOWN};
pub use diagnostics::{FetchDiagnostics, FetchOutcome, VariantAttempt, VariantExit};
pub use fetcher::{Fetcher, FetcherConfig, DEFAULT_MAX_RATE_LIMIT_WAITS};
pub use limiter::{ConcurrencyLimiter, ConcurrencyPermit, DEFAULT_MAX_CONCURRENCY};
pub use validator::ResultValidator;

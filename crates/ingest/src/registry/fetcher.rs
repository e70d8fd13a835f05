//! Resilient fetch of one (symbol, dataset) request.
//!
//! For each symbol variant the fetcher runs a small state machine:
//!
//! ```text
//!              usable                         ┌──────────┐
//!   Attempting ───────────────────────────────► Success  │
//!     │  ▲  ▲                                 └──────────┘
//!     │  │  │ transient, retry left
//!     │  │  └──────────── Backoff
//!     │  │ rate limited (retry kept)
//!     │  └─────────────── RateLimitCooldown
//!     │ empty / not found / retries exhausted
//!     ▼
//!   VariantExhausted ──► next variant, or NotFound when none remain
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::backoff::BackoffPolicy;
use super::cooldown::{RateLimitGate, DEFAULT_RATE_LIMIT_COOLDOWN};
use super::diagnostics::{FetchDiagnostics, FetchOutcome, VariantAttempt, VariantExit};
use super::limiter::ConcurrencyLimiter;
use super::validator::ResultValidator;
use crate::errors::{ProviderError, RetryClass};
use crate::models::{FetchRequest, Payload};
use crate::provider::{DataProvider, FetchParams};
use crate::resolver::VariantGenerator;

/// Consecutive free cooldowns allowed for a single attempt.
pub const DEFAULT_MAX_RATE_LIMIT_WAITS: u32 = 5;

/// Fetcher tuning.
#[derive(Clone, Debug)]
pub struct FetcherConfig {
    /// Fetcher-wide pause after a rate-limit signal.
    pub rate_limit_cooldown: Duration,
    /// Beyond this many consecutive cooldowns the rate limit costs a retry.
    pub max_rate_limit_waits: u32,
    pub backoff: BackoffPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
            max_rate_limit_waits: DEFAULT_MAX_RATE_LIMIT_WAITS,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Result of a single provider invocation.
enum CallResult {
    Payload(Payload),
    Failed(ProviderError),
    TimedOut,
}

/// Drives retry, backoff, variant fallback and rate-limit cooldown.
///
/// A fetcher is shared by every task of a run; the limiter and the
/// rate-limit gate it holds are the only state those tasks share.
pub struct Fetcher {
    provider: Arc<dyn DataProvider>,
    limiter: ConcurrencyLimiter,
    gate: Arc<RateLimitGate>,
    variants: VariantGenerator,
    validator: ResultValidator,
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a fetcher with default variants and tuning.
    pub fn new(provider: Arc<dyn DataProvider>, limiter: ConcurrencyLimiter) -> Self {
        Self::with_config(
            provider,
            limiter,
            Arc::new(RateLimitGate::new()),
            VariantGenerator::default(),
            FetcherConfig::default(),
        )
    }

    /// Create a fetcher with custom collaborators.
    pub fn with_config(
        provider: Arc<dyn DataProvider>,
        limiter: ConcurrencyLimiter,
        gate: Arc<RateLimitGate>,
        variants: VariantGenerator,
        config: FetcherConfig,
    ) -> Self {
        Self {
            provider,
            limiter,
            gate,
            variants,
            validator: ResultValidator::new(),
            config,
        }
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn gate(&self) -> &Arc<RateLimitGate> {
        &self.gate
    }

    /// Fetch a dataset for a symbol, trying every variant spelling.
    ///
    /// Never fails: exhausting all variants resolves to
    /// [`FetchOutcome::NotFound`], which callers treat as a soft failure.
    pub async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        let mut diagnostics = FetchDiagnostics::new(request.symbol(), request.dataset());
        let params = FetchParams {
            period: request.period().map(str::to_string),
        };

        for variant in self.variants.generate(request.symbol()) {
            let (record, payload) = self.fetch_variant(&variant, request, &params).await;
            diagnostics.variants.push(record);

            if let Some(payload) = payload {
                info!(
                    symbol = request.symbol(),
                    variant = %variant,
                    dataset = %request.dataset(),
                    size = payload.len(),
                    "Fetched data"
                );
                return FetchOutcome::Found {
                    payload,
                    variant,
                    diagnostics,
                };
            }

            warn!(
                variant = %variant,
                dataset = %request.dataset(),
                "Variant failed completely: {}",
                variant
            );
        }

        error!(
            symbol = request.symbol(),
            dataset = %request.dataset(),
            calls = diagnostics.total_calls(),
            rate_limit_waits = diagnostics.total_rate_limit_waits(),
            "All symbol variants failed for {} ({})",
            request.symbol(),
            request.dataset()
        );
        FetchOutcome::NotFound { diagnostics }
    }

    /// Run the attempt loop for one variant.
    async fn fetch_variant(
        &self,
        variant: &str,
        request: &FetchRequest,
        params: &FetchParams,
    ) -> (VariantAttempt, Option<Payload>) {
        let retries = request.retries();
        let mut record = VariantAttempt::new(variant);
        let mut attempt = 1;
        let mut rate_limit_waits = 0;

        while attempt <= retries {
            record.attempts = attempt;
            record.calls += 1;

            match self.call(variant, request, params).await {
                CallResult::Payload(payload) => {
                    if self.validator.is_usable(Some(&payload)) {
                        record.exit = VariantExit::Success;
                        return (record, Some(payload));
                    }
                    warn!(
                        variant,
                        dataset = %request.dataset(),
                        shape = payload.shape(),
                        "Empty or invalid result. Trying next variant."
                    );
                    record.exit = VariantExit::Empty;
                    return (record, None);
                }
                CallResult::TimedOut => {
                    record.timeouts += 1;
                    warn!(
                        variant,
                        dataset = %request.dataset(),
                        attempt,
                        retries,
                        "Timeout after {:?}",
                        request.timeout()
                    );
                }
                CallResult::Failed(err) => match err.retry_class() {
                    RetryClass::RateLimited
                        if rate_limit_waits < self.config.max_rate_limit_waits =>
                    {
                        rate_limit_waits += 1;
                        record.rate_limit_waits += 1;
                        error!(
                            variant,
                            cooldown_secs = self.config.rate_limit_cooldown.as_secs(),
                            "Rate limit hit. Cooling down."
                        );
                        // Same attempt again once the gate reopens.
                        continue;
                    }
                    RetryClass::RateLimited => {
                        record.transient_errors += 1;
                        warn!(
                            variant,
                            waits = rate_limit_waits,
                            "Still rate limited after repeated cooldowns, spending a retry"
                        );
                    }
                    RetryClass::NotFound => {
                        warn!(
                            variant,
                            error = %err,
                            "Variant appears inactive or delisted. Trying next variant."
                        );
                        record.exit = VariantExit::NotFound;
                        return (record, None);
                    }
                    RetryClass::Transient => {
                        record.transient_errors += 1;
                        warn!(
                            variant,
                            dataset = %request.dataset(),
                            attempt,
                            retries,
                            error = %err,
                            "Retrying after provider error"
                        );
                    }
                },
            }

            if attempt < retries {
                let delay = self.config.backoff.delay(attempt);
                debug!(variant, attempt, delay_ms = delay.as_millis() as u64, "Backing off");
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
            rate_limit_waits = 0;
        }

        record.exit = VariantExit::RetriesExhausted;
        (record, None)
    }

    /// One provider invocation: gate, permit, timed call.
    ///
    /// The permit lives only for the call, so a timeout drops the call's
    /// future and releases the permit together. A rate-limit signal closes
    /// the gate before the permit is released, so no queued task can slip a
    /// call into the cooldown.
    async fn call(&self, variant: &str, request: &FetchRequest, params: &FetchParams) -> CallResult {
        let permit = loop {
            self.gate.wait().await;

            let permit = match self.limiter.acquire().await {
                Ok(permit) => permit,
                Err(e) => {
                    return CallResult::Failed(ProviderError::Other {
                        provider: self.provider.id().to_string(),
                        message: format!("Concurrency limiter closed: {}", e),
                    })
                }
            };

            // The gate may have closed while this task queued for a permit.
            if self.gate.is_cooling_down() {
                drop(permit);
                continue;
            }
            break permit;
        };

        let result = tokio::time::timeout(
            request.timeout(),
            self.provider.fetch(variant, request.dataset(), params),
        )
        .await;

        if let Ok(Err(err)) = &result {
            if err.retry_class() == RetryClass::RateLimited {
                self.gate.trip(self.config.rate_limit_cooldown);
            }
        }
        permit.release();

        match result {
            Ok(Ok(payload)) => CallResult::Payload(payload),
            Ok(Err(err)) => CallResult::Failed(err),
            Err(_) => CallResult::TimedOut,
        }
    }
}

//! Fetch outcome and per-variant attempt tracking.

use crate::models::{Dataset, Payload};

/// Why the fetcher stopped working on a variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VariantExit {
    /// A usable payload was returned.
    Success,
    /// The provider answered, but with nothing usable.
    Empty,
    /// The provider reported the symbol unknown or delisted.
    NotFound,
    /// Every attempt failed with a timeout or transient error.
    RetriesExhausted,
}

/// Record of the work done on a single symbol variant.
#[derive(Clone, Debug)]
pub struct VariantAttempt {
    pub variant: String,
    /// Provider invocations, including the ones repeated after a cooldown.
    pub calls: u32,
    /// Retry budget consumed (attempt number reached).
    pub attempts: u32,
    pub timeouts: u32,
    pub transient_errors: u32,
    /// Free rate-limit cooldowns taken.
    pub rate_limit_waits: u32,
    pub exit: VariantExit,
}

impl VariantAttempt {
    pub(crate) fn new(variant: &str) -> Self {
        Self {
            variant: variant.to_string(),
            calls: 0,
            attempts: 0,
            timeouts: 0,
            transient_errors: 0,
            rate_limit_waits: 0,
            exit: VariantExit::RetriesExhausted,
        }
    }
}

/// Detailed trace of one fetch, in variant order.
#[derive(Clone, Debug)]
pub struct FetchDiagnostics {
    pub symbol: String,
    pub dataset: Dataset,
    pub variants: Vec<VariantAttempt>,
}

impl FetchDiagnostics {
    pub fn new(symbol: &str, dataset: Dataset) -> Self {
        Self {
            symbol: symbol.to_string(),
            dataset,
            variants: Vec::new(),
        }
    }

    pub fn variant(&self, variant: &str) -> Option<&VariantAttempt> {
        self.variants.iter().find(|v| v.variant == variant)
    }

    /// Provider invocations across all variants.
    pub fn total_calls(&self) -> u32 {
        self.variants.iter().map(|v| v.calls).sum()
    }

    pub fn total_rate_limit_waits(&self) -> u32 {
        self.variants.iter().map(|v| v.rate_limit_waits).sum()
    }
}

/// Result of [`Fetcher::fetch`](super::Fetcher::fetch).
#[derive(Clone, Debug)]
pub enum FetchOutcome {
    /// A usable payload, and the variant spelling that produced it.
    Found {
        payload: Payload,
        variant: String,
        diagnostics: FetchDiagnostics,
    },
    /// Every variant exhausted without a usable payload.
    NotFound { diagnostics: FetchDiagnostics },
}

impl FetchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Self::Found { payload, .. } => Some(payload),
            Self::NotFound { .. } => None,
        }
    }

    pub fn diagnostics(&self) -> &FetchDiagnostics {
        match self {
            Self::Found { diagnostics, .. } | Self::NotFound { diagnostics } => diagnostics,
        }
    }
}

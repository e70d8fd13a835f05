//! Error types and retry classification for the ingest crate.
//!
//! This module provides:
//! - [`ProviderError`]: errors raised at the provider boundary
//! - [`RetryClass`]: classification for determining retry behavior
//! - [`IngestError`]: crate-level errors (config, storage, tasks)

mod retry;

pub use retry::RetryClass;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while calling an upstream data provider.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method, which determines how the
/// fetcher should handle the error.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider rate limited the request (HTTP 429 / "Too Many Requests").
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The symbol is known but delisted, or the provider has no data for it.
    #[error("Symbol delisted or without data: {0}")]
    Delisted(String),

    /// The provider cannot serve this dataset at all.
    #[error("Dataset {dataset} not supported by {provider}")]
    UnsupportedDataset {
        /// The provider that rejected the dataset
        provider: String,
        /// Storage name of the dataset
        dataset: String,
    },

    /// The provider's own HTTP client timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider answered with something we could not decode.
    #[error("Parse error from {provider}: {message}")]
    Parse {
        /// The provider that returned the payload
        provider: String,
        /// Decoder error message
        message: String,
    },

    /// A provider-specific error that matched no other class.
    #[error("Provider error: {provider} - {message}")]
    Other {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },
}

impl ProviderError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use stockify_ingest::errors::{ProviderError, RetryClass};
    ///
    /// let error = ProviderError::RateLimited { provider: "YAHOO".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::RateLimited);
    ///
    /// let error = ProviderError::Delisted("OLDCO.NS".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::NotFound);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { .. } => RetryClass::RateLimited,

            Self::SymbolNotFound(_) | Self::Delisted(_) | Self::UnsupportedDataset { .. } => {
                RetryClass::NotFound
            }

            Self::Timeout { .. } | Self::Parse { .. } | Self::Other { .. } => {
                RetryClass::Transient
            }
        }
    }

    /// Build a typed error from a raw provider message.
    ///
    /// This is the only place where error text is inspected. Providers call it
    /// for errors they cannot map structurally; unmatched messages become
    /// [`ProviderError::Other`] and fall into the generic retry path.
    pub fn from_message(provider: &str, symbol: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_ascii_lowercase();

        if lowered.contains("too many requests")
            || lowered.contains("rate limit")
            || mentions_status_429(&lowered)
        {
            return Self::RateLimited {
                provider: provider.to_string(),
            };
        }

        if lowered.contains("delisted") || lowered.contains("no data found") {
            return Self::Delisted(symbol.to_string());
        }

        Self::Other {
            provider: provider.to_string(),
            message,
        }
    }
}

/// True if `lowered` reports an HTTP 429 status rather than merely
/// containing those digits.
fn mentions_status_429(lowered: &str) -> bool {
    [
        "http 429",
        "http/1.1 429",
        "http/2 429",
        "status 429",
        "status: 429",
        "status code 429",
    ]
    .iter()
    .any(|pattern| lowered.contains(pattern))
}

/// Crate-level errors.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Invalid or missing configuration. Fatal for a run.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The destination store cannot be initialised. Fatal for a run.
    #[error("Storage error at {path}: {message}")]
    Storage {
        /// Offending path
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The payload has a shape the writer cannot persist.
    #[error("Unsupported payload shape: {0}")]
    UnsupportedShape(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A per-symbol task failed outside of the fetch state machine.
    #[error("Task failed: {0}")]
    Task(String),
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        IngestError::Serialization(err.to_string())
    }
}

/// Result alias for crate-level operations.
pub type Result<T> = std::result::Result<T, IngestError>;

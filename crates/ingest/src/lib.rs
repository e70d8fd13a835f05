//! Stockify Ingest Crate
//!
//! Resilient, rate-limit-aware fetching of per-symbol market datasets and
//! write-once persistence of the results into a date-partitioned raw store.
//!
//! # Overview
//!
//! - Symbol variant fallback (NSE `.NS` / BSE `.BO` listings)
//! - Retry with exponential backoff, fetcher-wide rate-limit cooldown
//! - Process-wide cap on in-flight provider calls
//! - Chunked batch scheduling with inter-chunk cooldowns
//! - Idempotent CSV/JSON artifact storage
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  IngestPipeline  |  (datasets in sequence, operation cooldown)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  BatchScheduler  |  (chunks, per-symbol tasks, chunk cooldown)
//! +------------------+
//!          |
//!          v
//! +------------------+     +--------------------+
//! |     Fetcher      | --> | ConcurrencyLimiter |  (shared permits)
//! +------------------+     +--------------------+
//!          |               +--------------------+
//!          |           --> |   RateLimitGate    |  (shared cooldown)
//!          v               +--------------------+
//! +------------------+
//! |  DataProvider    |  (Yahoo, mocks)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |     Writer       |  (<root>/<tag>/<dataset>/<date>/<symbol>.<ext>)
//! +------------------+
//! ```

pub mod config;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod storage;
pub mod tickers;

pub use config::IngestConfig;
pub use errors::{IngestError, ProviderError, Result, RetryClass};
pub use models::{
    ArtifactFormat, ArtifactKey, BatchJob, Dataset, FetchRequest, Payload, StoredArtifact, Table,
};
pub use pipeline::{IngestPipeline, PipelineReport, DEFAULT_DATASETS};
pub use provider::{DataProvider, FetchParams, YahooProvider};
pub use registry::{
    BackoffPolicy, ConcurrencyLimiter, ConcurrencyPermit, FetchDiagnostics, FetchOutcome,
    Fetcher, FetcherConfig, RateLimitGate, ResultValidator, VariantExit,
};
pub use resolver::{SuffixPair, VariantGenerator};
pub use scheduler::{BatchReport, BatchScheduler, SymbolOutcome};
pub use storage::{WriteOutcome, Writer};
pub use tickers::{load_ticker_list, parse_ticker_list};

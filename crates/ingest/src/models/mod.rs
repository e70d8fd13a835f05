//! Ingest models
//!
//! This module contains the core data types:
//! - `dataset` - Dataset enum and its storage names
//! - `request` - Per-symbol fetch request (FetchRequest)
//! - `payload` - Provider payloads (Payload, Table)
//! - `job` - Batch job definition (BatchJob)
//! - `artifact` - Persisted artifact identity (ArtifactKey, StoredArtifact)

mod artifact;
mod dataset;
mod job;
mod payload;
mod request;

pub use artifact::{ArtifactFormat, ArtifactKey, StoredArtifact};
pub use dataset::Dataset;
pub use job::BatchJob;
pub use payload::{Payload, Table};
pub use request::{FetchRequest, DEFAULT_RETRIES, DEFAULT_TIMEOUT};

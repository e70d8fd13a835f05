use std::path::PathBuf;

use chrono::NaiveDate;

use super::Dataset;

/// Storage format of a persisted artifact.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArtifactFormat {
    /// Row/column delimited (CSV).
    Tabular,
    /// Structured text (JSON).
    Keyed,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tabular => "csv",
            Self::Keyed => "json",
        }
    }
}

/// Unique key of an artifact in the raw store.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ArtifactKey {
    pub dataset: Dataset,
    pub run_date: NaiveDate,
    pub symbol: String,
}

impl ArtifactKey {
    pub fn new(dataset: Dataset, run_date: NaiveDate, symbol: impl Into<String>) -> Self {
        Self {
            dataset,
            run_date,
            symbol: symbol.into(),
        }
    }

    /// Partition directory name (`YYYY-MM-DD`).
    pub fn partition(&self) -> String {
        self.run_date.format("%Y-%m-%d").to_string()
    }
}

/// A file written by the writer. Never overwritten by a later run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredArtifact {
    pub key: ArtifactKey,
    pub format: ArtifactFormat,
    pub location: PathBuf,
}

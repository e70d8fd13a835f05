//! Write-once raw artifact store.
//!
//! Layout: `<root>/<provider-tag>/<dataset>/<YYYY-MM-DD>/<symbol>.<ext>`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{IngestError, Result};
use crate::models::{ArtifactFormat, ArtifactKey, Dataset, Payload, StoredArtifact, Table};
use crate::resolver::NSE_SUFFIX;

/// Provider tag of Yahoo sourced artifacts.
pub const DEFAULT_PROVIDER_TAG: &str = "yf";

/// What happened to a write request.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOutcome {
    /// A new artifact was created.
    Written(StoredArtifact),
    /// An artifact for the key already existed and was left untouched.
    Skipped(PathBuf),
    /// The payload had nothing in it; no file was created.
    Empty,
}

/// Persists fetched payloads under a partitioned directory tree.
///
/// Artifacts are never overwritten: the file is opened with
/// `create_new`, so of two racing writers for the same key exactly one
/// succeeds and the other reports [`WriteOutcome::Skipped`].
#[derive(Clone, Debug)]
pub struct Writer {
    root: PathBuf,
    provider_tag: String,
    default_suffix: String,
}

impl Writer {
    /// Create a writer rooted at `root`.
    ///
    /// The root does not have to exist yet, but if it does it must be a
    /// directory.
    pub fn new(root: impl Into<PathBuf>, provider_tag: impl Into<String>) -> Result<Self> {
        let root = root.into();
        if root.exists() && !root.is_dir() {
            return Err(IngestError::Storage {
                path: root,
                message: "Data root exists but is not a directory".to_string(),
            });
        }
        Ok(Self {
            root,
            provider_tag: provider_tag.into(),
            default_suffix: NSE_SUFFIX.to_string(),
        })
    }

    /// Suffix stripped from symbols when naming artifacts.
    pub fn with_default_suffix(self, suffix: impl Into<String>) -> Self {
        Self {
            default_suffix: suffix.into(),
            ..self
        }
    }

    /// Directory holding every artifact of one dataset and run date.
    pub fn partition_dir(&self, dataset: Dataset, partition: &str) -> PathBuf {
        self.root
            .join(&self.provider_tag)
            .join(dataset.as_str())
            .join(partition)
    }

    /// Create the partition directory for a dataset run.
    ///
    /// Failing here means nothing of the run could be stored.
    pub fn ensure_partition(&self, dataset: Dataset, run_date: NaiveDate) -> Result<PathBuf> {
        let dir = self.partition_dir(dataset, &run_date.format("%Y-%m-%d").to_string());
        fs::create_dir_all(&dir).map_err(|e| IngestError::Storage {
            path: dir.clone(),
            message: e.to_string(),
        })?;
        Ok(dir)
    }

    /// Path an artifact for `key` would be written to.
    pub fn artifact_path(&self, key: &ArtifactKey, format: ArtifactFormat) -> PathBuf {
        self.partition_dir(key.dataset, &key.partition())
            .join(format!("{}.{}", self.file_stem(&key.symbol), format.extension()))
    }

    fn file_stem<'a>(&self, symbol: &'a str) -> &'a str {
        if self.default_suffix.is_empty() {
            return symbol;
        }
        match symbol.strip_suffix(self.default_suffix.as_str()) {
            Some(base) if !base.is_empty() => base,
            _ => symbol,
        }
    }

    /// Persist a payload under `key`.
    ///
    /// Tables become CSV, keyed and list payloads become pretty-printed JSON.
    /// Scalars have no storage format and fail with
    /// [`IngestError::UnsupportedShape`].
    pub fn write(&self, key: &ArtifactKey, payload: Payload) -> Result<WriteOutcome> {
        if payload.is_empty() {
            debug!(symbol = %key.symbol, dataset = %key.dataset, "Nothing to write");
            return Ok(WriteOutcome::Empty);
        }

        let format = match &payload {
            Payload::Table(_) => ArtifactFormat::Tabular,
            Payload::Keyed(_) | Payload::List(_) => ArtifactFormat::Keyed,
            Payload::Scalar(_) => {
                return Err(IngestError::UnsupportedShape(format!(
                    "{} payload for {} ({})",
                    payload.shape(),
                    key.symbol,
                    key.dataset
                )))
            }
        };

        let location = self.artifact_path(key, format);
        if location.exists() {
            info!(path = %location.display(), "Artifact already exists. Skipping.");
            return Ok(WriteOutcome::Skipped(location));
        }

        if let Some(dir) = location.parent() {
            fs::create_dir_all(dir).map_err(|e| IngestError::Storage {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?;
        }

        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&location)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                info!(path = %location.display(), "Artifact created concurrently. Skipping.");
                return Ok(WriteOutcome::Skipped(location));
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = write_payload(file, key.dataset, payload) {
            // A half-written artifact would block every later attempt.
            if let Err(remove_err) = fs::remove_file(&location) {
                warn!(
                    path = %location.display(),
                    "Failed to remove partial artifact: {}",
                    remove_err
                );
            }
            return Err(e);
        }

        info!(path = %location.display(), "Saved artifact");
        Ok(WriteOutcome::Written(StoredArtifact {
            key: key.clone(),
            format,
            location,
        }))
    }
}

/// Column the table index is moved into before serialisation.
fn index_column(dataset: Dataset) -> String {
    match dataset {
        Dataset::History => "Date".to_string(),
        other => format!("{}_features", other.as_str()),
    }
}

fn write_payload(file: File, dataset: Dataset, payload: Payload) -> Result<()> {
    let mut out = BufWriter::new(file);
    match payload {
        Payload::Table(table) => {
            write_table(&mut out, table.with_index_column(&index_column(dataset)))?
        }
        Payload::Keyed(map) => serde_json::to_writer_pretty(&mut out, &map)?,
        Payload::List(items) => serde_json::to_writer_pretty(&mut out, &items)?,
        Payload::Scalar(value) => {
            return Err(IngestError::UnsupportedShape(format!("scalar {}", value)))
        }
    }
    out.flush()?;
    Ok(())
}

fn write_table<W: Write>(out: W, table: Table) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(cell_text))?;
    }
    writer.flush()?;
    Ok(())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use tempfile::tempdir;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn history_table() -> Payload {
        let mut table = Table::new(["Open", "Close", "Volume"]);
        table.push_row("2024-05-31", vec![json!(100.5), json!(101.0), json!(1200)]);
        table.push_row("2024-06-03", vec![json!(101.0), Value::Null, json!(900)]);
        Payload::Table(table)
    }

    #[test]
    fn test_table_written_as_csv_with_date_column() {
        let dir = tempdir().unwrap();
        let writer = Writer::new(dir.path(), DEFAULT_PROVIDER_TAG).unwrap();
        let key = ArtifactKey::new(Dataset::History, run_date(), "RELIANCE.NS");

        let outcome = writer.write(&key, history_table()).unwrap();

        let expected = dir
            .path()
            .join("yf")
            .join("history")
            .join("2024-06-03")
            .join("RELIANCE.csv");
        match outcome {
            WriteOutcome::Written(artifact) => {
                assert_eq!(artifact.location, expected);
                assert_eq!(artifact.format, ArtifactFormat::Tabular);
            }
            other => panic!("expected a written artifact, got {:?}", other),
        }
        let contents = fs::read_to_string(&expected).unwrap();
        assert_eq!(
            contents,
            "Open,Close,Volume,Date\n100.5,101.0,1200,2024-05-31\n101.0,,900,2024-06-03\n"
        );
    }

    #[test]
    fn test_non_history_tables_get_features_column() {
        let dir = tempdir().unwrap();
        let writer = Writer::new(dir.path(), DEFAULT_PROVIDER_TAG).unwrap();
        let key = ArtifactKey::new(Dataset::Actions, run_date(), "TCS.NS");
        let mut table = Table::new(["Dividends", "Stock Splits"]);
        table.push_row("2024-01-05", vec![json!(18.0), json!(0.0)]);

        writer.write(&key, Payload::Table(table)).unwrap();

        let path = dir.path().join("yf/actions/2024-06-03/TCS.csv");
        let header = fs::read_to_string(path).unwrap();
        assert!(header.starts_with("Dividends,Stock Splits,actions_features\n"));
    }

    #[test]
    fn test_keyed_and_list_payloads_written_as_json() {
        let dir = tempdir().unwrap();
        let writer = Writer::new(dir.path(), DEFAULT_PROVIDER_TAG).unwrap();

        let mut info = Map::new();
        info.insert("sector".to_string(), json!("Energy"));
        let key = ArtifactKey::new(Dataset::Calendar, run_date(), "ONGC.NS");
        writer.write(&key, Payload::Keyed(info)).unwrap();

        let key = ArtifactKey::new(Dataset::News, run_date(), "ONGC.NS");
        writer
            .write(&key, Payload::List(vec![json!({"title": "Results"})]))
            .unwrap();

        let calendar: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("yf/calendar/2024-06-03/ONGC.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(calendar, json!({"sector": "Energy"}));

        let news = fs::read_to_string(dir.path().join("yf/news/2024-06-03/ONGC.json")).unwrap();
        assert!(news.contains('\n'));
        assert_eq!(
            serde_json::from_str::<Value>(&news).unwrap(),
            json!([{"title": "Results"}])
        );
    }

    #[test]
    fn test_existing_artifact_is_skipped_and_untouched() {
        let dir = tempdir().unwrap();
        let writer = Writer::new(dir.path(), DEFAULT_PROVIDER_TAG).unwrap();
        let key = ArtifactKey::new(Dataset::History, run_date(), "INFY.NS");

        writer.write(&key, history_table()).unwrap();
        let path = writer.artifact_path(&key, ArtifactFormat::Tabular);
        let before = fs::read_to_string(&path).unwrap();

        let mut other = Table::new(["Close"]);
        other.push_row("2024-06-03", vec![json!(1.0)]);
        let outcome = writer.write(&key, Payload::Table(other)).unwrap();

        assert_eq!(outcome, WriteOutcome::Skipped(path.clone()));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_empty_payload_never_touches_disk() {
        let dir = tempdir().unwrap();
        let writer = Writer::new(dir.path(), DEFAULT_PROVIDER_TAG).unwrap();
        let key = ArtifactKey::new(Dataset::News, run_date(), "WIPRO.NS");

        let outcome = writer.write(&key, Payload::List(Vec::new())).unwrap();

        assert_eq!(outcome, WriteOutcome::Empty);
        assert!(!dir.path().join("yf").exists());
    }

    #[test]
    fn test_scalar_payload_is_unsupported() {
        let dir = tempdir().unwrap();
        let writer = Writer::new(dir.path(), DEFAULT_PROVIDER_TAG).unwrap();
        let key = ArtifactKey::new(Dataset::Info, run_date(), "SBIN.NS");

        let result = writer.write(&key, Payload::Scalar(json!(42)));

        assert!(matches!(result, Err(IngestError::UnsupportedShape(_))));
        assert!(!writer.artifact_path(&key, ArtifactFormat::Keyed).exists());
    }

    #[test]
    fn test_only_default_suffix_is_stripped() {
        let dir = tempdir().unwrap();
        let writer = Writer::new(dir.path(), DEFAULT_PROVIDER_TAG).unwrap();

        let nse = ArtifactKey::new(Dataset::News, run_date(), "HDFC.NS");
        let bse = ArtifactKey::new(Dataset::News, run_date(), "HDFC.BO");

        assert!(writer
            .artifact_path(&nse, ArtifactFormat::Keyed)
            .ends_with("HDFC.json"));
        assert!(writer
            .artifact_path(&bse, ArtifactFormat::Keyed)
            .ends_with("HDFC.BO.json"));
    }

    #[test]
    fn test_ensure_partition_creates_directory() {
        let dir = tempdir().unwrap();
        let writer = Writer::new(dir.path().join("raw"), DEFAULT_PROVIDER_TAG).unwrap();

        let partition = writer.ensure_partition(Dataset::Calendar, run_date()).unwrap();

        assert_eq!(partition, dir.path().join("raw/yf/calendar/2024-06-03"));
        assert!(partition.is_dir());
    }

    #[test]
    fn test_root_must_be_a_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();

        let result = Writer::new(&file, DEFAULT_PROVIDER_TAG);

        assert!(matches!(result, Err(IngestError::Storage { .. })));
    }
}

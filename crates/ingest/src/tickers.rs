//! Symbol universe loading.

use std::path::Path;

use csv::ReaderBuilder;
use tracing::{error, info};

use crate::errors::Result;
use crate::resolver::VariantGenerator;

/// Read tickers from the first column of a CSV file.
///
/// Header rows (any cell value containing `Ticker`) and blank rows are
/// skipped. `suffix` is appended to tickers that carry no recognised market
/// suffix.
pub fn parse_ticker_list(content: &str, suffix: &str) -> Result<Vec<String>> {
    let variants = VariantGenerator::default();
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut symbols = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(ticker) = record.get(0).filter(|t| !t.is_empty()) else {
            continue;
        };
        if ticker.contains("Ticker") {
            continue;
        }
        symbols.push(variants.with_suffix(ticker, suffix));
    }
    Ok(symbols)
}

/// Load the symbol universe from `path`.
///
/// A missing or unreadable file is logged and yields an empty list, so a
/// run over it completes without doing any work.
pub fn load_ticker_list(path: &Path, suffix: &str) -> Vec<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!(path = %path.display(), "Failed to read ticker list: {}", e);
            return Vec::new();
        }
    };

    match parse_ticker_list(&content, suffix) {
        Ok(symbols) => {
            info!(path = %path.display(), count = symbols.len(), "Loaded ticker list");
            symbols
        }
        Err(e) => {
            error!(path = %path.display(), "Failed to parse ticker list: {}", e);
            Vec::new()
        }
    }
}

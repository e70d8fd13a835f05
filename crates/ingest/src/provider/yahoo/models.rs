//! Yahoo Finance API response models.
//!
//! Only the envelopes are typed. Module bodies stay as JSON values since
//! they are persisted close to verbatim.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Error object Yahoo embeds in otherwise successful responses.
#[derive(Debug, Deserialize)]
pub struct YahooApiError {
    pub code: Option<String>,
    pub description: Option<String>,
}

/// Main response wrapper for quoteSummary API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteSummaryResponse {
    pub quote_summary: YahooQuoteSummary,
}

#[derive(Debug, Deserialize)]
pub struct YahooQuoteSummary {
    #[serde(default)]
    pub result: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    pub error: Option<YahooApiError>,
}

/// Chart endpoint response, used for dividend and split events.
#[derive(Debug, Deserialize)]
pub struct YahooChartResponse {
    pub chart: YahooChart,
}

#[derive(Debug, Deserialize)]
pub struct YahooChart {
    #[serde(default)]
    pub result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    pub error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
pub struct YahooChartResult {
    #[serde(default)]
    pub events: Option<YahooChartEvents>,
}

/// Events keyed by their unix timestamp, as Yahoo sends them.
#[derive(Debug, Default, Deserialize)]
pub struct YahooChartEvents {
    #[serde(default)]
    pub dividends: BTreeMap<String, YahooDividend>,
    #[serde(default)]
    pub splits: BTreeMap<String, YahooSplit>,
}

#[derive(Debug, Deserialize)]
pub struct YahooDividend {
    pub amount: f64,
    pub date: i64,
}

#[derive(Debug, Deserialize)]
pub struct YahooSplit {
    pub date: i64,
    pub numerator: f64,
    pub denominator: f64,
}

/// Search endpoint response; only the news block is used.
#[derive(Debug, Deserialize)]
pub struct YahooSearchResponse {
    #[serde(default)]
    pub news: Vec<Value>,
}

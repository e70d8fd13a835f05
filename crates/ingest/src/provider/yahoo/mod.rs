//! Yahoo Finance data provider.
//!
//! Price history goes through the `yahoo_finance_api` connector. The other
//! datasets come from Yahoo's JSON endpoints:
//! - actions: chart endpoint with dividend and split events
//! - info, calendar, earnings dates: quoteSummary (crumb authenticated)
//! - news: search endpoint

mod models;

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::header;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::debug;
use urlencoding::encode;
use yahoo_finance_api as yahoo;

use crate::errors::ProviderError;
use crate::models::{Dataset, Payload, Table};
use crate::provider::{DataProvider, FetchParams};

use models::{
    YahooApiError, YahooChartEvents, YahooChartResponse, YahooQuoteSummaryResponse,
    YahooSearchResponse,
};

const PROVIDER_ID: &str = "YAHOO";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const DEFAULT_HISTORY_RANGE: &str = "1mo";
const NEWS_COUNT: usize = 10;

const INFO_MODULES: &str = "assetProfile,summaryDetail,defaultKeyStatistics,financialData,price";
const CALENDAR_MODULES: &str = "calendarEvents";
const EARNINGS_MODULES: &str = "earningsHistory";

/// Columns of the daily price table.
const HISTORY_COLUMNS: [&str; 6] = ["Open", "High", "Low", "Close", "Adj Close", "Volume"];
const ACTIONS_COLUMNS: [&str; 2] = ["Dividends", "Stock Splits"];
const EARNINGS_COLUMNS: [&str; 3] = ["EPS Estimate", "Reported EPS", "Surprise(%)"];

/// Cached Yahoo authentication data
#[derive(Debug, Clone)]
struct CrumbData {
    cookie: String,
    crumb: String,
}

/// Yahoo Finance provider.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
    client: reqwest::Client,
    crumb: RwLock<Option<CrumbData>>,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider.
    pub fn new() -> Result<Self, ProviderError> {
        let connector = yahoo::YahooConnector::new().map_err(|e| ProviderError::Other {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to initialize Yahoo connector: {}", e),
        })?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Other {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            connector,
            client,
            crumb: RwLock::new(None),
        })
    }

    // ========================================================================
    // Crumb/Cookie Authentication
    // ========================================================================

    async fn ensure_crumb(&self) -> Result<CrumbData, ProviderError> {
        {
            let guard = self.crumb.read().unwrap_or_else(|e| e.into_inner());
            if let Some(crumb) = guard.as_ref() {
                return Ok(crumb.clone());
            }
        }
        self.fetch_crumb().await
    }

    async fn fetch_crumb(&self) -> Result<CrumbData, ProviderError> {
        let response = self
            .client
            .get("https://fc.yahoo.com")
            .send()
            .await
            .map_err(|e| request_error("Failed to get cookie", e))?;

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()))
            .ok_or_else(|| ProviderError::Other {
                provider: PROVIDER_ID.to_string(),
                message: "Failed to parse Yahoo cookie".to_string(),
            })?;

        let response = self
            .client
            .get("https://query1.finance.yahoo.com/v1/test/getcrumb")
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .map_err(|e| request_error("Failed to get crumb", e))?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(rate_limited());
        }
        let crumb = response
            .text()
            .await
            .map_err(|e| request_error("Failed to read crumb", e))?;

        let crumb_data = CrumbData { cookie, crumb };
        *self.crumb.write().unwrap_or_else(|e| e.into_inner()) = Some(crumb_data.clone());

        Ok(crumb_data)
    }

    fn clear_crumb(&self) {
        *self.crumb.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    // ========================================================================
    // HTTP helpers
    // ========================================================================

    /// GET a Yahoo JSON endpoint and map HTTP failures onto provider errors.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        symbol: &str,
        cookie: Option<&str>,
    ) -> Result<T, ProviderError> {
        let mut request = self.client.get(url);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = request
            .send()
            .await
            .map_err(|e| request_error("Request failed", e))?;

        let status = response.status();
        match status {
            reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(rate_limited()),
            reqwest::StatusCode::NOT_FOUND => {
                return Err(ProviderError::SymbolNotFound(symbol.to_string()))
            }
            reqwest::StatusCode::UNAUTHORIZED => {
                self.clear_crumb();
                return Err(ProviderError::Other {
                    provider: PROVIDER_ID.to_string(),
                    message: "Yahoo authentication expired".to_string(),
                });
            }
            s if !s.is_success() => {
                return Err(ProviderError::from_message(
                    PROVIDER_ID,
                    symbol,
                    format!("HTTP {}", s),
                ))
            }
            _ => {}
        }

        response.json::<T>().await.map_err(|e| ProviderError::Parse {
            provider: PROVIDER_ID.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetch quoteSummary modules and merge them into one object.
    async fn quote_summary(
        &self,
        symbol: &str,
        modules: &str,
    ) -> Result<Map<String, Value>, ProviderError> {
        let crumb = self.ensure_crumb().await?;
        let url = format!(
            "https://query1.finance.yahoo.com/v10/finance/quoteSummary/{}?modules={}&crumb={}",
            encode(symbol),
            modules,
            encode(&crumb.crumb)
        );

        let data: YahooQuoteSummaryResponse =
            self.get_json(&url, symbol, Some(&crumb.cookie)).await?;
        if let Some(err) = data.quote_summary.error {
            return Err(api_error(symbol, err));
        }

        data.quote_summary
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| ProviderError::SymbolNotFound(symbol.to_string()))
    }

    // ========================================================================
    // Datasets
    // ========================================================================

    async fn fetch_history(&self, symbol: &str, range: &str) -> Result<Payload, ProviderError> {
        debug!("Fetching {} price history for {} from Yahoo", range, symbol);

        let response = self
            .connector
            .get_quote_range(symbol, "1d", range)
            .await
            .map_err(|e| map_connector_error(symbol, e))?;

        let quotes = match response.quotes() {
            Ok(quotes) => quotes,
            // An answer without bars is an empty result, not a failure.
            Err(yahoo::YahooError::NoQuotes) => Vec::new(),
            Err(e) => return Err(map_connector_error(symbol, e)),
        };

        let mut table = Table::new(HISTORY_COLUMNS);
        for quote in quotes {
            table.push_row(
                format_timestamp(quote.timestamp as i64),
                vec![
                    json!(quote.open),
                    json!(quote.high),
                    json!(quote.low),
                    json!(quote.close),
                    json!(quote.adjclose),
                    json!(quote.volume),
                ],
            );
        }
        Ok(Payload::Table(table))
    }

    async fn fetch_actions(&self, symbol: &str) -> Result<Payload, ProviderError> {
        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?range=max&interval=1d&events=div%2Csplit",
            encode(symbol)
        );
        let data: YahooChartResponse = self.get_json(&url, symbol, None).await?;
        if let Some(err) = data.chart.error {
            return Err(api_error(symbol, err));
        }

        let events = data
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .and_then(|result| result.events)
            .unwrap_or_default();
        Ok(Payload::Table(actions_table(events)))
    }

    async fn fetch_news(&self, symbol: &str) -> Result<Payload, ProviderError> {
        let url = format!(
            "https://query2.finance.yahoo.com/v1/finance/search?q={}&quotesCount=0&newsCount={}",
            encode(symbol),
            NEWS_COUNT
        );
        let data: YahooSearchResponse = self.get_json(&url, symbol, None).await?;
        Ok(Payload::List(data.news))
    }

    async fn fetch_info(&self, symbol: &str) -> Result<Payload, ProviderError> {
        let summary = self.quote_summary(symbol, INFO_MODULES).await?;
        Ok(Payload::Keyed(flatten_modules(summary)))
    }

    async fn fetch_calendar(&self, symbol: &str) -> Result<Payload, ProviderError> {
        let summary = self.quote_summary(symbol, CALENDAR_MODULES).await?;
        Ok(Payload::Keyed(calendar_entries(&summary)))
    }

    async fn fetch_earnings_dates(&self, symbol: &str) -> Result<Payload, ProviderError> {
        let summary = self.quote_summary(symbol, EARNINGS_MODULES).await?;
        Ok(Payload::Table(earnings_table(&summary)))
    }
}

#[async_trait]
impl DataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch(
        &self,
        symbol: &str,
        dataset: Dataset,
        params: &FetchParams,
    ) -> Result<Payload, ProviderError> {
        match dataset {
            Dataset::History => {
                let range = params.period.as_deref().unwrap_or(DEFAULT_HISTORY_RANGE);
                self.fetch_history(symbol, range).await
            }
            Dataset::Info => self.fetch_info(symbol).await,
            Dataset::Actions => self.fetch_actions(symbol).await,
            Dataset::News => self.fetch_news(symbol).await,
            Dataset::EarningsDates => self.fetch_earnings_dates(symbol).await,
            Dataset::Calendar => self.fetch_calendar(symbol).await,
        }
    }
}

// ============================================================================
// Error mapping
// ============================================================================

fn rate_limited() -> ProviderError {
    ProviderError::RateLimited {
        provider: PROVIDER_ID.to_string(),
    }
}

fn request_error(context: &str, err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        return ProviderError::Timeout {
            provider: PROVIDER_ID.to_string(),
        };
    }
    if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
        return rate_limited();
    }
    ProviderError::Other {
        provider: PROVIDER_ID.to_string(),
        message: format!("{}: {}", context, err),
    }
}

fn map_connector_error(symbol: &str, err: yahoo::YahooError) -> ProviderError {
    if matches!(err, yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult) {
        ProviderError::SymbolNotFound(symbol.to_string())
    } else {
        ProviderError::from_message(PROVIDER_ID, symbol, err.to_string())
    }
}

fn api_error(symbol: &str, err: YahooApiError) -> ProviderError {
    let code = err.code.unwrap_or_default();
    let description = err.description.unwrap_or_default();
    if code.eq_ignore_ascii_case("not found") {
        return ProviderError::SymbolNotFound(symbol.to_string());
    }
    ProviderError::from_message(PROVIDER_ID, symbol, format!("{}: {}", code, description))
}

// ============================================================================
// Response shaping
// ============================================================================

fn format_timestamp(timestamp: i64) -> String {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Replace Yahoo's `{"raw": .., "fmt": ..}` wrappers with their raw value.
fn unwrap_raw(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("raw") => {
            map.remove("raw").unwrap_or(Value::Null)
        }
        // Empty wrappers stand for missing values.
        Value::Object(map) if map.is_empty() => Value::Null,
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, unwrap_raw(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap_raw).collect()),
        other => other,
    }
}

/// Merge module objects into one flat mapping. Earlier modules win on
/// key collisions.
fn flatten_modules(summary: Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    for (_, module) in summary {
        if let Value::Object(fields) = unwrap_raw(module) {
            for (key, value) in fields {
                if key == "maxAge" || value.is_null() {
                    continue;
                }
                flat.entry(key).or_insert(value);
            }
        }
    }
    flat
}

fn raw_date(value: Option<&Value>) -> Value {
    match value.map(|v| unwrap_raw(v.clone())) {
        Some(Value::Number(n)) => n
            .as_i64()
            .map(|ts| Value::String(format_timestamp(ts)))
            .unwrap_or(Value::Null),
        Some(other) => other,
        None => Value::Null,
    }
}

/// Upcoming events, keyed the way the calendar is usually presented.
fn calendar_entries(summary: &Map<String, Value>) -> Map<String, Value> {
    let mut calendar = Map::new();
    let Some(events) = summary.get("calendarEvents") else {
        return calendar;
    };

    if let Some(earnings) = events.get("earnings") {
        let dates: Vec<Value> = earnings
            .get("earningsDate")
            .and_then(Value::as_array)
            .map(|dates| dates.iter().map(|d| raw_date(Some(d))).collect())
            .unwrap_or_default();
        if !dates.is_empty() {
            calendar.insert("Earnings Date".to_string(), Value::Array(dates));
        }

        for (key, label) in [
            ("earningsHigh", "Earnings High"),
            ("earningsLow", "Earnings Low"),
            ("earningsAverage", "Earnings Average"),
            ("revenueHigh", "Revenue High"),
            ("revenueLow", "Revenue Low"),
            ("revenueAverage", "Revenue Average"),
        ] {
            if let Some(value) = earnings.get(key).map(|v| unwrap_raw(v.clone())) {
                if !value.is_null() {
                    calendar.insert(label.to_string(), value);
                }
            }
        }
    }

    for (key, label) in [
        ("exDividendDate", "Ex-Dividend Date"),
        ("dividendDate", "Dividend Date"),
    ] {
        let value = raw_date(events.get(key));
        if !value.is_null() {
            calendar.insert(label.to_string(), value);
        }
    }

    calendar
}

/// Reported quarters with estimate, actual and surprise.
fn earnings_table(summary: &Map<String, Value>) -> Table {
    let mut table = Table::new(EARNINGS_COLUMNS);
    let history = summary
        .get("earningsHistory")
        .and_then(|m| m.get("history"))
        .and_then(Value::as_array);

    for entry in history.into_iter().flatten() {
        let date = raw_date(entry.get("quarter"));
        let Some(date) = date.as_str().map(str::to_string) else {
            continue;
        };
        let field = |key: &str| {
            entry
                .get(key)
                .map(|v| unwrap_raw(v.clone()))
                .unwrap_or(Value::Null)
        };
        let surprise = match field("surprisePercent") {
            Value::Number(n) => n
                .as_f64()
                .map(|pct| json!(pct * 100.0))
                .unwrap_or(Value::Null),
            other => other,
        };
        table.push_row(date, vec![field("epsEstimate"), field("epsActual"), surprise]);
    }
    table
}

/// Dividends and splits merged by date, zero where an event is absent.
fn actions_table(events: YahooChartEvents) -> Table {
    let mut by_date: BTreeMap<i64, (f64, f64)> = BTreeMap::new();
    for dividend in events.dividends.into_values() {
        by_date.entry(dividend.date).or_default().0 += dividend.amount;
    }
    for split in events.splits.into_values() {
        if split.denominator != 0.0 {
            by_date.entry(split.date).or_default().1 = split.numerator / split.denominator;
        }
    }

    let mut table = Table::new(ACTIONS_COLUMNS);
    for (date, (dividend, split)) in by_date {
        table.push_row(format_timestamp(date), vec![json!(dividend), json!(split)]);
    }
    table
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RetryClass;

    #[test]
    fn test_unwrap_raw_values() {
        let value = json!({
            "marketCap": {"raw": 1_500_000, "fmt": "1.5M"},
            "sector": "Energy",
            "payoutRatio": {},
            "officers": [{"name": "A", "age": {"raw": 60}}]
        });

        assert_eq!(
            unwrap_raw(value),
            json!({
                "marketCap": 1_500_000,
                "sector": "Energy",
                "payoutRatio": null,
                "officers": [{"name": "A", "age": 60}]
            })
        );
    }

    #[test]
    fn test_flatten_modules_merges_and_drops_max_age() {
        let summary = json!({
            "assetProfile": {"sector": "Energy", "maxAge": 86400},
            "summaryDetail": {"trailingPE": {"raw": 24.5, "fmt": "24.50"}, "sector": "Other"}
        });
        let Value::Object(summary) = summary else {
            unreachable!()
        };

        let flat = flatten_modules(summary);

        assert_eq!(flat.get("sector"), Some(&json!("Energy")));
        assert_eq!(flat.get("trailingPE"), Some(&json!(24.5)));
        assert!(!flat.contains_key("maxAge"));
    }

    #[test]
    fn test_calendar_entries() {
        let summary = json!({
            "calendarEvents": {
                "earnings": {
                    "earningsDate": [{"raw": 1_706_745_600, "fmt": "2024-02-01"}],
                    "earningsAverage": {"raw": 12.4},
                    "revenueAverage": {}
                },
                "exDividendDate": {"raw": 1_704_067_200}
            }
        });
        let Value::Object(summary) = summary else {
            unreachable!()
        };

        let calendar = calendar_entries(&summary);

        assert_eq!(calendar.get("Earnings Date"), Some(&json!(["2024-02-01"])));
        assert_eq!(calendar.get("Earnings Average"), Some(&json!(12.4)));
        assert_eq!(calendar.get("Ex-Dividend Date"), Some(&json!("2024-01-01")));
        assert!(!calendar.contains_key("Revenue Average"));
    }

    #[test]
    fn test_calendar_entries_missing_module() {
        assert!(calendar_entries(&Map::new()).is_empty());
    }

    #[test]
    fn test_earnings_table() {
        let summary = json!({
            "earningsHistory": {
                "history": [
                    {
                        "quarter": {"raw": 1_703_980_800, "fmt": "2023-12-31"},
                        "epsEstimate": {"raw": 10.0},
                        "epsActual": {"raw": 11.0},
                        "surprisePercent": {"raw": 0.1}
                    },
                    {"epsActual": {"raw": 9.0}}
                ]
            }
        });
        let Value::Object(summary) = summary else {
            unreachable!()
        };

        let table = earnings_table(&summary);

        assert_eq!(table.len(), 1);
        assert_eq!(table.index, vec!["2023-12-31"]);
        assert_eq!(table.rows[0][0], json!(10.0));
        assert_eq!(table.rows[0][1], json!(11.0));
        assert!((table.rows[0][2].as_f64().unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_actions_table_merges_events_by_date() {
        let events: YahooChartEvents = serde_json::from_value(json!({
            "dividends": {
                "1704067200": {"amount": 8.0, "date": 1_704_067_200}
            },
            "splits": {
                "1704067200": {"date": 1_704_067_200, "numerator": 2.0, "denominator": 1.0},
                "1696118400": {"date": 1_696_118_400, "numerator": 1.0, "denominator": 0.0}
            }
        }))
        .unwrap();

        let table = actions_table(events);

        assert_eq!(table.columns, vec!["Dividends", "Stock Splits"]);
        assert_eq!(table.index, vec!["2024-01-01"]);
        assert_eq!(table.rows[0], vec![json!(8.0), json!(2.0)]);
    }

    #[test]
    fn test_api_error_mapping() {
        let not_found = api_error(
            "NOPE.NS",
            YahooApiError {
                code: Some("Not Found".to_string()),
                description: Some("Quote not found for ticker symbol: NOPE.NS".to_string()),
            },
        );
        assert!(matches!(not_found, ProviderError::SymbolNotFound(_)));

        let other = api_error(
            "TCS.NS",
            YahooApiError {
                code: Some("Internal".to_string()),
                description: None,
            },
        );
        assert_eq!(other.retry_class(), RetryClass::Transient);
    }

    #[test]
    fn test_connector_no_result_is_not_found() {
        let err = map_connector_error("GONE.NS", yahoo::YahooError::NoResult);
        assert_eq!(err.retry_class(), RetryClass::NotFound);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_704_067_200), "2024-01-01");
    }
}

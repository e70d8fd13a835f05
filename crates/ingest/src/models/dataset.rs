use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::IngestError;

/// Kind of data requested for a symbol.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// Daily OHLCV price history.
    History,
    /// Company profile and key statistics.
    Info,
    /// Corporate actions (dividends and splits).
    Actions,
    /// Recent news items.
    News,
    /// Past and upcoming earnings dates with EPS figures.
    EarningsDates,
    /// Upcoming calendar events (earnings window, ex-dividend date).
    Calendar,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::History,
        Dataset::Info,
        Dataset::Actions,
        Dataset::News,
        Dataset::EarningsDates,
        Dataset::Calendar,
    ];

    /// Directory name used in the raw store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::History => "history",
            Self::Info => "info",
            Self::Actions => "actions",
            Self::News => "news",
            Self::EarningsDates => "earnings_dates",
            Self::Calendar => "calendar",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dataset {
    type Err = IngestError;

    /// Accepts storage names as well as the `get_`-prefixed operation names
    /// used by older job definitions (`get_news`, `get_actions`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let name = normalized.strip_prefix("get_").unwrap_or(&normalized);

        Dataset::ALL
            .into_iter()
            .find(|d| d.as_str() == name)
            .ok_or_else(|| IngestError::Config(format!("Unknown dataset: {}", s)))
    }
}

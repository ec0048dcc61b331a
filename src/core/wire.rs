// Minimal serde mapping of the aggregate endpoints (prev, range, grouped).

use serde::{Deserialize, Serialize};

/// Envelope shared by the previous-close, ranged and grouped-daily aggregate endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatesResponse {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub adjusted: Option<bool>,
    #[serde(rename = "resultsCount", default)]
    pub results_count: Option<u64>,
    #[serde(rename = "queryCount", default)]
    pub query_count: Option<u64>,
    #[serde(default)]
    pub results: Vec<AggBar>,
}

/// One OHLCV bar as the provider encodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggBar {
    /// Ticker; only present on grouped-daily and previous-close results.
    #[serde(rename = "T", default)]
    pub ticker: Option<String>,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
    #[serde(rename = "vw", default)]
    pub vwap: Option<f64>,
    /// Bar start, Unix milliseconds.
    #[serde(rename = "t")]
    pub timestamp_ms: i64,
    #[serde(rename = "n", default)]
    pub transactions: Option<u64>,
}

impl AggBar {
    /// Bar start as a UTC timestamp, if representable.
    #[must_use]
    pub fn timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.timestamp_ms)
    }
}

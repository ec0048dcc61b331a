//! Market context for conversational callers.
//!
//! Pulls tagged symbols and a date out of free text, fetches one payload per mention
//! through [`MarketData`], and folds each into a short text block suitable for a prompt.

mod extract;

pub use extract::{Mention, QueryDetails, extract_mentions};

use chrono::SecondsFormat;
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;

use crate::core::dates::format_date;
use crate::core::{AggregatesResponse, CacheMode, MarketType, PolyClient, PolyError};
use crate::market::MarketData;

/// Text used when a payload carries no bar.
pub const NO_DATA: &str = "No market data available";

/// The payload fetched for one mention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub symbol: String,
    pub market: MarketType,
    pub data: Value,
}

impl Snapshot {
    /// This snapshot rendered with [`summarize`].
    #[must_use]
    pub fn summary(&self) -> String {
        summarize(&self.data)
    }
}

/// Fetches every mention concurrently: the day bar when a date was given, otherwise
/// the previous-close aggregate.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    market: MarketData,
    details: QueryDetails,
}

impl SnapshotBuilder {
    pub fn new(client: &PolyClient, details: QueryDetails) -> Self {
        Self {
            market: MarketData::new(client),
            details,
        }
    }

    /// Shortcut for `SnapshotBuilder::new(client, extract_mentions(text))`.
    pub fn from_text(client: &PolyClient, text: &str) -> Self {
        Self::new(client, extract_mentions(text))
    }

    /// Sets the cache mode for every fetch.
    #[must_use]
    pub fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.market = self.market.cache_mode(mode);
        self
    }

    pub const fn details(&self) -> &QueryDetails {
        &self.details
    }

    /// Fetches all mentions; results keep mention order.
    ///
    /// # Errors
    ///
    /// Fails with the first error any fetch reports.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err, fields(mentions = self.details.mentions.len())))]
    pub async fn fetch(self) -> Result<Vec<Snapshot>, PolyError> {
        let date = self.details.date.map(format_date);
        let market = &self.market;

        let futs = self.details.mentions.iter().map(|m| {
            let date = date.clone();
            async move {
                let data = match date {
                    Some(d) => market.day_bar(&m.symbol, m.market.as_str(), &d).await?,
                    None => market.current_quote(&m.symbol, m.market.as_str()).await?,
                };
                Ok::<_, PolyError>(Snapshot {
                    symbol: m.symbol.clone(),
                    market: m.market,
                    data,
                })
            }
        });

        try_join_all(futs).await
    }
}

/// Renders the first bar of an aggregate payload as a text block.
///
/// Returns [`NO_DATA`] when the payload has no decodable bar.
#[must_use]
pub fn summarize(payload: &Value) -> String {
    let Ok(resp) = serde_json::from_value::<AggregatesResponse>(payload.clone()) else {
        return NO_DATA.to_string();
    };
    let Some(bar) = resp.results.first() else {
        return NO_DATA.to_string();
    };

    let timestamp = bar
        .timestamp()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| bar.timestamp_ms.to_string());

    format!(
        "Current Price: ${c}\nOpen: ${o}\nHigh: ${h}\nLow: ${l}\nClose: ${c}\nVolume: {v}\nTimestamp: {timestamp}",
        c = bar.close,
        o = bar.open,
        h = bar.high,
        l = bar.low,
        v = bar.volume,
    )
}

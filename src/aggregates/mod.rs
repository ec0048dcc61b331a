//! Aggregate (OHLCV bar) endpoints: previous close, ranged bars and grouped daily.

use chrono::NaiveDate;
use serde_json::Value;

use crate::core::dates::{check_range, format_date};
use crate::core::{
    AggregatesResponse, CacheMode, MarketType, PolyClient, PolyError, RequestIdentity,
    RetryConfig, Timeframe, validate_symbol,
};

/// Previous-close aggregate for a provider symbol.
#[must_use]
pub fn prev_close_identity(provider_symbol: &str) -> RequestIdentity {
    RequestIdentity::path_only(format!("/aggs/ticker/{provider_symbol}/prev"))
}

/// Ranged aggregate for a provider symbol; both dates inclusive.
#[must_use]
pub fn range_identity(
    provider_symbol: &str,
    timeframe: Timeframe,
    from: NaiveDate,
    to: NaiveDate,
) -> RequestIdentity {
    RequestIdentity::path_only(format!(
        "/aggs/ticker/{provider_symbol}/range/{timeframe}/{}/{}",
        format_date(from),
        format_date(to)
    ))
}

/// Grouped daily bars for a whole market.
#[must_use]
pub fn grouped_identity(market: MarketType, date: NaiveDate) -> RequestIdentity {
    RequestIdentity::path_only(format!(
        "/grouped/locale/global/market/{market}/{}",
        format_date(date)
    ))
}

/// A builder for ranged aggregate requests on one symbol.
///
/// # Example
///
/// ```no_run
/// # use polygon_gate::{AggregatesBuilder, MarketType, PolyClient, Timeframe};
/// # use chrono::NaiveDate;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = PolyClient::builder().api_key("demo").build()?;
/// let bars = AggregatesBuilder::new(&client, "BTCUSD")
///     .market(MarketType::Crypto)
///     .timeframe(Timeframe::Hour1)
///     .between(
///         NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///         NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
///     )
///     .fetch()
///     .await?;
/// println!("{bars}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AggregatesBuilder {
    client: PolyClient,
    symbol: String,
    // `None` sends the symbol exactly as given.
    market: Option<MarketType>,
    timeframe: Timeframe,
    range: Option<(NaiveDate, NaiveDate)>,
    cache_mode: CacheMode,
    retry_override: Option<RetryConfig>,
}

impl AggregatesBuilder {
    /// Daily bars on the stocks market by default. A date range must be set before fetching.
    pub fn new(client: &PolyClient, symbol: impl Into<String>) -> Self {
        Self {
            client: client.clone(),
            symbol: symbol.into(),
            market: Some(MarketType::Stocks),
            timeframe: Timeframe::Day1,
            range: None,
            cache_mode: CacheMode::Use,
            retry_override: None,
        }
    }

    #[must_use]
    pub const fn market(mut self, market: MarketType) -> Self {
        self.market = Some(market);
        self
    }

    /// Sends the symbol exactly as given, without stripping or adding a market prefix.
    #[must_use]
    pub const fn verbatim(mut self) -> Self {
        self.market = None;
        self
    }

    #[must_use]
    pub const fn timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    /// Inclusive date range.
    #[must_use]
    pub const fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.range = Some((from, to));
        self
    }

    /// A single trading day.
    #[must_use]
    pub const fn on(self, date: NaiveDate) -> Self {
        self.between(date, date)
    }

    /// Sets the cache mode for this specific API call.
    #[must_use]
    pub const fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    /// Overrides the default retry policy for this specific API call.
    #[must_use]
    pub fn retry_policy(mut self, cfg: Option<RetryConfig>) -> Self {
        self.retry_override = cfg;
        self
    }

    /// The identity this builder resolves to.
    ///
    /// # Errors
    ///
    /// Returns `PolyError::InvalidArgument` if the symbol is invalid, no range is set or
    /// the range is inverted.
    pub fn identity(&self) -> Result<RequestIdentity, PolyError> {
        validate_symbol(&self.symbol)?;
        let (from, to) = self
            .range
            .ok_or_else(|| PolyError::InvalidArgument("no date range set".into()))?;
        check_range(from, to)?;
        let provider_symbol = match self.market {
            Some(market) => market.provider_symbol(&self.symbol),
            None => self.symbol.clone(),
        };
        Ok(range_identity(&provider_symbol, self.timeframe, from, to))
    }

    /// Fetches the raw provider payload.
    ///
    /// # Errors
    ///
    /// `PolyError::InvalidArgument` before any network call if the symbol is invalid or
    /// the range is missing or inverted; otherwise whatever [`PolyClient::fetch`] reports.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err, fields(symbol = %self.symbol)))]
    pub async fn fetch(self) -> Result<Value, PolyError> {
        let identity = self.identity()?;
        self.client
            .fetch(&identity, self.cache_mode, self.retry_override.as_ref())
            .await
    }

    /// Fetches and decodes into [`AggregatesResponse`].
    ///
    /// # Errors
    ///
    /// As [`fetch`](Self::fetch), plus `PolyError::Json` if the payload does not match.
    pub async fn fetch_typed(self) -> Result<AggregatesResponse, PolyError> {
        let value = self.fetch().await?;
        Ok(serde_json::from_value(value)?)
    }
}

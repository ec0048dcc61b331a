use serde_json::Value;

use crate::aggregates::{self, AggregatesBuilder};
use crate::core::dates::parse_date;
use crate::core::{
    AggBar, AggregatesResponse, CacheMode, MarketType, PolyClient, PolyError, RetryConfig,
    Timeframe, format_for_api, validate_symbol,
};
use crate::search::SearchBuilder;

/// Domain operations over the provider, taking the loosely-typed arguments that HTTP
/// handlers and chat extraction produce (`symbol`, `marketType`, dates as `YYYY-MM-DD`).
///
/// Holds no state of its own beyond a client handle and per-call options; every
/// operation resolves to one executor call.
///
/// # Example
///
/// ```no_run
/// # use polygon_gate::{MarketData, PolyClient};
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = PolyClient::builder().api_key("demo").build()?;
/// let market = MarketData::new(&client);
///
/// let prev = market.current_quote("BTCUSD", "crypto").await?;
/// let week = market
///     .historical_range("AAPL", "stocks", "1/day", "2024-01-01", "2024-01-07")
///     .await?;
/// println!("{prev}\n{week}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MarketData {
    client: PolyClient,
    cache_mode: CacheMode,
    retry_override: Option<RetryConfig>,
}

impl MarketData {
    pub fn new(client: &PolyClient) -> Self {
        Self {
            client: client.clone(),
            cache_mode: CacheMode::Use,
            retry_override: None,
        }
    }

    /// Sets the cache mode for all subsequent calls made through this instance.
    #[must_use]
    pub const fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    /// Always fetch from the provider and leave the cache untouched.
    #[must_use]
    pub const fn live(self) -> Self {
        self.cache_mode(CacheMode::Bypass)
    }

    /// Overrides the client's default retry policy for calls made through this instance.
    #[must_use]
    pub fn retry_policy(mut self, cfg: Option<RetryConfig>) -> Self {
        self.retry_override = cfg;
        self
    }

    pub const fn client(&self) -> &PolyClient {
        &self.client
    }

    /// Previous-close aggregate for `symbol`.
    ///
    /// Unknown market types pass the symbol through without a prefix.
    ///
    /// # Errors
    ///
    /// `PolyError::InvalidArgument` before any network call if the symbol is blank or
    /// cannot form a single path segment; `PolyError::UpstreamUnavailable` if the
    /// provider cannot be reached.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn current_quote(&self, symbol: &str, market_type: &str) -> Result<Value, PolyError> {
        validate_symbol(symbol)?;
        let identity = aggregates::prev_close_identity(&format_for_api(symbol, market_type));
        self.client
            .fetch(&identity, self.cache_mode, self.retry_override.as_ref())
            .await
    }

    /// First bar of the previous-close aggregate, decoded.
    ///
    /// # Errors
    ///
    /// As [`current_quote`](Self::current_quote), plus `PolyError::Json` if the payload
    /// does not decode.
    pub async fn current_bar(
        &self,
        symbol: &str,
        market_type: &str,
    ) -> Result<Option<AggBar>, PolyError> {
        let resp: AggregatesResponse =
            serde_json::from_value(self.current_quote(symbol, market_type).await?)?;
        Ok(resp.results.into_iter().next())
    }

    /// Bars for `symbol` between `from` and `to` (inclusive, `YYYY-MM-DD`).
    ///
    /// # Errors
    ///
    /// `PolyError::InvalidArgument` before any network call if the symbol is invalid,
    /// the timeframe is not a valid wire token, a date does not parse, or `to`
    /// precedes `from`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn historical_range(
        &self,
        symbol: &str,
        market_type: &str,
        timeframe: &str,
        from: &str,
        to: &str,
    ) -> Result<Value, PolyError> {
        let timeframe: Timeframe = timeframe.parse()?;
        let (from, to) = (parse_date(from)?, parse_date(to)?);
        self.range_builder(symbol, market_type)
            .timeframe(timeframe)
            .between(from, to)
            .fetch()
            .await
    }

    /// The single daily bar of `symbol` on `date`.
    ///
    /// # Errors
    ///
    /// `PolyError::InvalidArgument` if the symbol is invalid or `date` does not parse.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn day_bar(&self, symbol: &str, market_type: &str, date: &str) -> Result<Value, PolyError> {
        let date = parse_date(date)?;
        self.range_builder(symbol, market_type)
            .timeframe(Timeframe::Day1)
            .on(date)
            .fetch()
            .await
    }

    /// Daily bars of every ticker in a market on `date`.
    ///
    /// # Errors
    ///
    /// `PolyError::InvalidArgument` if the market type is unknown or `date` does not parse.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn grouped_daily(&self, market_type: &str, date: &str) -> Result<Value, PolyError> {
        let market: MarketType = market_type.parse()?;
        let identity = aggregates::grouped_identity(market, parse_date(date)?);
        self.client
            .fetch(&identity, self.cache_mode, self.retry_override.as_ref())
            .await
    }

    /// Active tickers matching `query` in a market, ten at a time, sorted by ticker.
    ///
    /// # Errors
    ///
    /// Returns `PolyError::UpstreamUnavailable` if the provider cannot be reached.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn search_symbols(&self, query: &str, market_type: &str) -> Result<Value, PolyError> {
        SearchBuilder::new(&self.client, query)
            .market_token(market_type)
            .cache_mode(self.cache_mode)
            .retry_policy(self.retry_override.clone())
            .fetch()
            .await
    }

    fn range_builder(&self, symbol: &str, market_type: &str) -> AggregatesBuilder {
        // Unknown market types keep the symbol as given, like `format_for_api`.
        let builder = match market_type.parse::<MarketType>() {
            Ok(market) => AggregatesBuilder::new(&self.client, symbol).market(market),
            Err(_) => AggregatesBuilder::new(&self.client, symbol).verbatim(),
        };
        builder
            .cache_mode(self.cache_mode)
            .retry_policy(self.retry_override.clone())
    }
}

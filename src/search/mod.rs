use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{CacheMode, MarketType, PolyClient, PolyError, RequestIdentity, RetryConfig};

/// Ticker reference endpoint, relative to the provider base.
pub const TICKER_SEARCH_PATH: &str = "/reference/tickers";

/* ---------------- Public API ---------------- */

/// Searches active tickers matching `query` within one market.
///
/// # Errors
///
/// Returns `PolyError` if the request fails after retries.
pub async fn search(
    client: &PolyClient,
    query: &str,
    market: MarketType,
) -> Result<Value, PolyError> {
    SearchBuilder::new(client, query).market(market).fetch().await
}

/// A builder for ticker reference searches.
///
/// Defaults match the fixed result shaping of the reference endpoint: active tickers
/// only, sorted by ticker ascending, ten results.
#[derive(Debug, Clone)]
pub struct SearchBuilder {
    client: PolyClient,
    query: String,
    market: Option<String>,
    active: bool,
    limit: u32,
    cache_mode: CacheMode,
    retry_override: Option<RetryConfig>,
}

impl SearchBuilder {
    /// Creates a new `SearchBuilder` for a given search query.
    pub fn new(client: &PolyClient, query: impl Into<String>) -> Self {
        Self {
            client: client.clone(),
            query: query.into(),
            market: None,
            active: true,
            limit: 10,
            cache_mode: CacheMode::Use,
            retry_override: None,
        }
    }

    /// Restricts results to one market.
    #[must_use]
    pub fn market(mut self, market: MarketType) -> Self {
        self.market = Some(market.as_str().to_string());
        self
    }

    /// Restricts results to a market given as a raw token. Passed through unvalidated.
    #[must_use]
    pub fn market_token(mut self, market: impl Into<String>) -> Self {
        self.market = Some(market.into());
        self
    }

    /// Include delisted tickers as well.
    #[must_use]
    pub const fn include_inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Sets the maximum number of results to return.
    #[must_use]
    pub const fn limit(mut self, n: u32) -> Self {
        self.limit = n;
        self
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

    /// The identity this search resolves to.
    #[must_use]
    pub fn identity(&self) -> RequestIdentity {
        let mut params = vec![
            ("search", self.query.clone()),
            ("active", self.active.to_string()),
            ("sort", "ticker".to_string()),
            ("order", "asc".to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(m) = &self.market {
            params.push(("market", m.clone()));
        }
        RequestIdentity::new(TICKER_SEARCH_PATH, params)
    }

    /// Executes the search request and returns the raw provider payload.
    ///
    /// # Errors
    ///
    /// This method will return an error if every allowed attempt fails.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err, fields(query = %self.query)))]
    pub async fn fetch(self) -> Result<Value, PolyError> {
        let identity = self.identity();
        self.client
            .fetch(&identity, self.cache_mode, self.retry_override.as_ref())
            .await
    }

    /// Executes the search and decodes the result list.
    ///
    /// # Errors
    ///
    /// As [`fetch`](Self::fetch), plus `PolyError::Json` if the payload does not match.
    pub async fn fetch_results(self) -> Result<Vec<TickerResult>, PolyError> {
        let env: TickerSearchEnvelope = serde_json::from_value(self.fetch().await?)?;
        Ok(env.results.unwrap_or_default())
    }
}

/* ------------- Minimal serde mapping of /reference/tickers ------------- */

#[derive(Deserialize)]
struct TickerSearchEnvelope {
    #[serde(default)]
    results: Option<Vec<TickerResult>>,
}

/// One entry of a ticker search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerResult {
    pub ticker: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub currency_name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

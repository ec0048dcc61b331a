//! Public client surface + builder.
//! Internals are split into `constants` (endpoints + defaults) and `retry` (retry policy).

mod constants;
mod retry;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::core::admission::{RateLimit, RateLimitStatus, TokenBucket};
use crate::core::cache::{CacheMode, CacheStats, ResponseCache};
use crate::core::clock::{Clock, TokioClock};
use crate::core::executor::Executor;
use crate::core::identity::RequestIdentity;
use crate::core::transport::{ReqwestTransport, Transport};
use crate::core::PolyError;

pub use constants::{
    DEFAULT_BASE_URL, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, DEFAULT_TIMEOUT, ENV_API_KEY,
    ENV_TIER,
};
pub use retry::RetryConfig;

/// Provider subscription tiers and their contractual request ceilings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tier {
    #[default]
    Basic,
    Starter,
    Developer,
    Advanced,
}

impl Tier {
    #[must_use]
    pub const fn requests_per_minute(self) -> u32 {
        match self {
            Self::Basic => 5,
            Self::Starter => 10,
            Self::Developer => 20,
            Self::Advanced => 50,
        }
    }

    /// Daily ceiling. Informational only; the admission bucket enforces the per-minute rate.
    #[must_use]
    pub const fn requests_per_day(self) -> u32 {
        match self {
            Self::Basic => 1000,
            Self::Starter => 2000,
            Self::Developer => 5000,
            Self::Advanced => 10000,
        }
    }

    #[must_use]
    pub const fn rate_limit(self) -> RateLimit {
        RateLimit::per_minute(self.requests_per_minute())
    }
}

impl FromStr for Tier {
    type Err = PolyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BASIC" => Ok(Self::Basic),
            "STARTER" => Ok(Self::Starter),
            "DEVELOPER" => Ok(Self::Developer),
            "ADVANCED" => Ok(Self::Advanced),
            _ => Err(PolyError::InvalidArgument(format!("unknown tier: {s}"))),
        }
    }
}

/// Handle to the market data access core.
///
/// Cheap to clone: clones share one executor, and therefore one cache and one
/// admission bucket.
#[derive(Clone)]
pub struct PolyClient {
    executor: Arc<Executor>,
}

impl fmt::Debug for PolyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolyClient")
            .field("executor", &self.executor)
            .finish()
    }
}

impl Default for PolyClient {
    fn default() -> Self {
        Self::builder().build().expect("default client")
    }
}

impl PolyClient {
    /// Create a new builder.
    pub fn builder() -> PolyClientBuilder {
        PolyClientBuilder::default()
    }

    /// Wraps an executor assembled by hand.
    #[must_use]
    pub fn from_executor(executor: Executor) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Resolves a request identity through cache, admission and retry.
    ///
    /// # Errors
    ///
    /// See [`Executor::dispatch`].
    pub async fn fetch(
        &self,
        identity: &RequestIdentity,
        cache_mode: CacheMode,
        retry_override: Option<&RetryConfig>,
    ) -> Result<Value, PolyError> {
        self.executor
            .dispatch(identity, cache_mode, retry_override)
            .await
    }

    pub fn cache_enabled(&self) -> bool {
        !self.executor.cache().is_disabled()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.executor.cache().stats().await
    }

    /// Removes one cached identity. Returns whether it was present.
    pub async fn invalidate(&self, identity: &RequestIdentity) -> bool {
        self.executor.cache().invalidate(identity).await
    }

    /// Empties the response cache.
    pub async fn clear_cache(&self) {
        self.executor.cache().clear().await;
    }

    pub fn rate_limit_status(&self) -> RateLimitStatus {
        self.executor.admission().status()
    }
}

/* ----------------------- Builder ----------------------- */

#[derive(Default)]
pub struct PolyClientBuilder {
    api_key: Option<String>,
    base_url: Option<Url>,
    user_agent: Option<String>,

    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,

    retry: Option<RetryConfig>,
    max_attempts: Option<u32>,
    retry_delay: Option<Duration>,

    rate_limit: Option<RateLimit>,
    cache_ttl: Option<Duration>,
    cache_capacity: Option<usize>,

    clock: Option<Arc<dyn Clock>>,
    transport: Option<Arc<dyn Transport>>,
}

impl PolyClientBuilder {
    /// Seeds a builder from `POLYGON_API_KEY` and `POLYGON_TIER`.
    ///
    /// # Errors
    ///
    /// Returns `PolyError::InvalidArgument` if `POLYGON_TIER` names an unknown tier.
    pub fn from_env() -> Result<Self, PolyError> {
        let mut builder = Self::default();
        if let Ok(key) = std::env::var(ENV_API_KEY)
            && !key.trim().is_empty()
        {
            builder = builder.api_key(key);
        }
        if let Ok(tier) = std::env::var(ENV_TIER) {
            builder = builder.tier(tier.parse()?);
        }
        Ok(builder)
    }

    /// Provider credential, appended to every request as `apiKey`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the REST base (e.g., `https://api.polygon.io/v2/`).
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Override the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Per-dispatch timeout. Default: 30 seconds.
    pub fn timeout(mut self, dur: Duration) -> Self {
        self.timeout = Some(dur);
        self
    }

    /// Set a connect timeout. Default: none.
    pub fn connect_timeout(mut self, dur: Duration) -> Self {
        self.connect_timeout = Some(dur);
        self
    }

    /// Replace the whole default retry policy.
    pub fn retry_config(mut self, cfg: RetryConfig) -> Self {
        self.retry = Some(cfg);
        self
    }

    /// Total attempts for non-429 failures. Default: 3.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n);
        self
    }

    /// Linear backoff unit. Default: 1 second.
    pub fn retry_delay(mut self, dur: Duration) -> Self {
        self.retry_delay = Some(dur);
        self
    }

    /// Admission bucket shape. Overrides [`tier`](Self::tier).
    pub fn rate_limit(mut self, limit: RateLimit) -> Self {
        self.rate_limit = Some(limit);
        self
    }

    /// Admission bucket sized for a subscription tier. Default: [`Tier::Basic`].
    pub fn tier(mut self, tier: Tier) -> Self {
        self.rate_limit = Some(tier.rate_limit());
        self
    }

    /// Lifetime of cached payloads. `Duration::ZERO` disables caching. Default: 10 seconds.
    pub fn cache_ttl(mut self, dur: Duration) -> Self {
        self.cache_ttl = Some(dur);
        self
    }

    /// Entry-count ceiling of the cache. `0` disables caching. Default: 1000.
    pub fn cache_capacity(mut self, n: usize) -> Self {
        self.cache_capacity = Some(n);
        self
    }

    /// Disables the response cache.
    pub fn no_cache(self) -> Self {
        self.cache_capacity(0)
    }

    /// Time source for cache expiry and bucket refill.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the reqwest transport (e.g., with a scripted fake in tests).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - `PolyError::InvalidArgument` if the rate limit has a zero capacity, refill or window.
    /// - `PolyError::Url` if the default base URL cannot be parsed.
    /// - `PolyError::Http` if the reqwest client cannot be constructed.
    pub fn build(self) -> Result<PolyClient, PolyError> {
        let base_url = match self.base_url {
            Some(u) => u,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };

        let limit = self.rate_limit.unwrap_or_else(|| Tier::default().rate_limit());
        if !limit.is_valid() {
            return Err(PolyError::InvalidArgument(format!(
                "rate limit must have a non-zero capacity, refill and window: {limit:?}"
            )));
        }

        let mut retry = self.retry.unwrap_or_default();
        if let Some(n) = self.max_attempts {
            retry.max_attempts = n;
        }
        if let Some(d) = self.retry_delay {
            retry.base_delay = d;
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => {
                let mut httpb = reqwest::Client::builder()
                    .user_agent(self.user_agent.as_deref().unwrap_or(constants::USER_AGENT));
                if let Some(ct) = self.connect_timeout {
                    httpb = httpb.connect_timeout(ct);
                }
                Arc::new(ReqwestTransport::new(httpb.build()?))
            }
        };

        let clock = self.clock.unwrap_or_else(|| Arc::new(TokioClock));
        let cache = ResponseCache::with_clock(
            self.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL),
            self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
            clock.clone(),
        );
        let admission = TokenBucket::with_clock(limit, clock)?;

        let executor = Executor::new(transport, cache, admission, base_url)
            .api_key(self.api_key)
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .retry_config(retry);

        Ok(PolyClient::from_executor(executor))
    }
}

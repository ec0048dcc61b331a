//! Request executor: cache check, admission, dispatch, rate-limit recovery, bounded retry.
//!
//! Per call the executor moves through
//! `normalized -> cache hit | admission wait -> dispatched -> success | rate limited | retryable | exhausted`.
//! A 429 re-dispatches the same call after the provider's advised delay without taking a
//! new admission token or an attempt; every other failure takes an attempt and, while
//! attempts remain, goes back to admission after a linear backoff.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::core::admission::TokenBucket;
use crate::core::cache::{CacheMode, ResponseCache};
use crate::core::client::RetryConfig;
use crate::core::identity::{CREDENTIAL_PARAM, RequestIdentity};
use crate::core::transport::Transport;
use crate::core::PolyError;

/// Result of one admitted dispatch, after any 429 recoveries.
enum Dispatched {
    Payload(Value),
    Retryable(String),
}

/// Owns the cache and the admission bucket and drives every outbound call.
pub struct Executor {
    transport: Arc<dyn Transport>,
    cache: ResponseCache,
    admission: TokenBucket,
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
    retry: RetryConfig,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("admission", &self.admission.limit())
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Creates an executor over the given collaborators.
    ///
    /// Defaults: no credential, a 30 second timeout and [`RetryConfig::default`].
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: ResponseCache,
        admission: TokenBucket,
        base_url: Url,
    ) -> Self {
        Self {
            transport,
            cache,
            admission,
            base_url,
            api_key: None,
            timeout: super::client::DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn retry_config(mut self, cfg: RetryConfig) -> Self {
        self.retry = cfg;
        self
    }

    pub const fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub const fn admission(&self) -> &TokenBucket {
        &self.admission
    }

    pub const fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// The request URL without the credential, as used in errors and logs.
    ///
    /// # Errors
    ///
    /// Returns `PolyError::Url` if the identity path cannot be joined onto the base URL.
    pub fn display_url(&self, identity: &RequestIdentity) -> Result<Url, PolyError> {
        let mut url = self.base_url.join(identity.path().trim_start_matches('/'))?;
        let mut params = identity.params().peekable();
        if params.peek().is_some() {
            let mut qp = url.query_pairs_mut();
            for (k, v) in params {
                qp.append_pair(k, v);
            }
        }
        Ok(url)
    }

    fn request_url(&self, identity: &RequestIdentity) -> Result<Url, PolyError> {
        let mut url = self.display_url(identity)?;
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair(CREDENTIAL_PARAM, key);
        }
        Ok(url)
    }

    /// Resolves `identity` to a provider payload.
    ///
    /// # Errors
    ///
    /// - `PolyError::UpstreamUnavailable` once every allowed attempt failed.
    /// - `PolyError::RateLimited` only if a finite `max_rate_limit_recoveries` was exceeded.
    /// - `PolyError::Url` if the identity cannot form a valid URL.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, retry_override), err, fields(identity = %identity)))]
    pub async fn dispatch(
        &self,
        identity: &RequestIdentity,
        cache_mode: CacheMode,
        retry_override: Option<&RetryConfig>,
    ) -> Result<Value, PolyError> {
        if cache_mode.reads()
            && let Some(hit) = self.cache.get(identity).await
        {
            #[cfg(feature = "tracing")]
            tracing::debug!("cache hit");
            return Ok(hit);
        }

        let retry = retry_override.unwrap_or(&self.retry);
        let max_attempts = retry.max_attempts.max(1);
        let url = self.request_url(identity)?;
        let mut attempts = 0;
        let mut recoveries = 0;

        loop {
            self.admission.acquire(1).await;
            attempts += 1;

            match self.send_once(identity, &url, retry, &mut recoveries).await? {
                Dispatched::Payload(value) => {
                    if cache_mode.writes() {
                        self.cache.put(identity.clone(), value.clone()).await;
                    }
                    return Ok(value);
                }
                Dispatched::Retryable(last_error) => {
                    if attempts >= max_attempts {
                        return Err(PolyError::UpstreamUnavailable {
                            attempts,
                            url: self.display_url(identity)?.to_string(),
                            last_error,
                        });
                    }
                    let backoff = retry.delay_for_attempt(attempts);
                    #[cfg(feature = "tracing")]
                    tracing::warn!(attempts, ?backoff, error = %last_error, "retrying provider call");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// One admitted dispatch. 429 replies are waited out and re-sent here, outside the
    /// attempt budget.
    async fn send_once(
        &self,
        identity: &RequestIdentity,
        url: &Url,
        retry: &RetryConfig,
        recoveries: &mut u32,
    ) -> Result<Dispatched, PolyError> {
        loop {
            let resp = match self.transport.get(url, self.timeout).await {
                Ok(resp) => resp,
                Err(e) => return Ok(Dispatched::Retryable(e.to_string())),
            };

            if resp.is_rate_limited() {
                let retry_after = retry.retry_after(resp.retry_after.as_deref());
                *recoveries += 1;
                if retry
                    .max_rate_limit_recoveries
                    .is_some_and(|max| *recoveries > max)
                {
                    return Err(PolyError::RateLimited {
                        retry_after,
                        url: self.display_url(identity)?.to_string(),
                    });
                }
                #[cfg(feature = "tracing")]
                tracing::warn!(?retry_after, recoveries = *recoveries, "provider rate limit, waiting");
                tokio::time::sleep(retry_after).await;
                continue;
            }

            if !resp.is_success() {
                return Ok(Dispatched::Retryable(format!(
                    "unexpected response status {}",
                    resp.status
                )));
            }

            return Ok(match serde_json::from_str::<Value>(&resp.body) {
                Ok(value) => Dispatched::Payload(value),
                Err(e) => Dispatched::Retryable(format!("malformed payload: {e}")),
            });
        }
    }
}

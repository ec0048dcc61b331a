use std::time::Duration;

/// Configuration for the automatic retry mechanism.
///
/// Two failure paths are tracked separately:
/// - an HTTP 429 is waited out for the provider's `Retry-After` delay and the same call
///   is re-dispatched, without consuming an attempt or an admission token;
/// - any other failure (transport error, timeout, non-2xx status) consumes an attempt
///   and is retried after `base_delay * attempts` until `max_attempts` is reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total physical attempts allowed for non-429 failures, including the first one.
    pub max_attempts: u32,
    /// Linear backoff unit: the wait after attempt `k` is `base_delay * k`.
    pub base_delay: Duration,
    /// Delay used when a 429 carries no usable `Retry-After` header.
    pub fallback_retry_after: Duration,
    /// Ceiling on consecutive 429 recoveries for one call. `None` waits them out indefinitely.
    pub max_rate_limit_recoveries: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            fallback_retry_after: Duration::from_secs(60),
            max_rate_limit_recoveries: None,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no backoff.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// The wait after `attempts` failed attempts.
    #[must_use]
    pub fn delay_for_attempt(&self, attempts: u32) -> Duration {
        self.base_delay.saturating_mul(attempts)
    }

    /// Interprets a `Retry-After` header given in whole seconds.
    ///
    /// Missing, negative or unparseable values fall back to `fallback_retry_after`.
    #[must_use]
    pub fn retry_after(&self, header: Option<&str>) -> Duration {
        header
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(self.fallback_retry_after, Duration::from_secs)
    }
}

use std::time::Duration;

use thiserror::Error;

/// The primary error type for all fallible operations in this crate.
#[derive(Debug, Error)]
pub enum PolyError {
    /// A symbol, market type, timeframe or date failed validation.
    ///
    /// Detected before the cache or the network is consulted; never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The provider kept answering with HTTP 429 beyond the configured ceiling of
    /// rate-limit recoveries.
    ///
    /// With the default (unbounded) retry policy this variant is never returned.
    #[error("rate limited by provider at {url}; retry after {retry_after:?}")]
    RateLimited {
        /// The delay most recently advised by the provider.
        retry_after: Duration,
        /// The request URL, without credentials.
        url: String,
    },

    /// Every attempt allowed by the retry policy failed.
    #[error("upstream unavailable after {attempts} attempt(s) at {url}: {last_error}")]
    UpstreamUnavailable {
        /// Number of physical attempts made.
        attempts: u32,
        /// The request URL, without credentials.
        url: String,
        /// Description of the last failure observed.
        last_error: String,
    },

    /// A provided or configured URL could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A payload could not be decoded into the requested type.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PolyError {
    /// The HTTP status an outer routing layer should answer with for this error.
    #[must_use]
    pub const fn status_hint(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) => 400,
            Self::RateLimited { .. } => 429,
            Self::UpstreamUnavailable { .. } => 503,
            Self::Url(_) | Self::Json(_) | Self::Http(_) => 500,
        }
    }

    /// Returns true for validation failures.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Returns true when the provider could not be reached within the retry budget.
    #[must_use]
    pub const fn is_upstream_unavailable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

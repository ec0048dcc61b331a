//! HTTP transport abstraction used by the executor.
//!
//! The executor only needs "GET this URL within this timeout"; keeping that behind a
//! trait lets tests count and script provider responses without a network.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use url::Url;

/// Boxed future returned by [`Transport::get`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>>;

/// A provider reply, reduced to what the executor inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Raw `Retry-After` header value, if the provider sent one.
    pub retry_after: Option<String>,
    pub body: String,
}

impl TransportResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    /// A 429 reply, optionally carrying a `Retry-After` value.
    pub fn too_many_requests(retry_after: Option<&str>) -> Self {
        Self {
            status: 429,
            retry_after: retry_after.map(str::to_string),
            body: String::new(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Why a request produced no response at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Other,
}

/// Transport-level failure. Always treated as retryable by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    #[must_use]
    pub const fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// Issues a single HTTP GET. Implementations must not retry on their own.
pub trait Transport: Send + Sync {
    fn get<'a>(&'a self, url: &'a Url, timeout: Duration) -> TransportFuture<'a>;
}

/// Production transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    #[must_use]
    pub const fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for ReqwestTransport {
    fn get<'a>(&'a self, url: &'a Url, timeout: Duration) -> TransportFuture<'a> {
        Box::pin(async move {
            let resp = self
                .http
                .get(url.clone())
                .header("accept", "application/json")
                .timeout(timeout)
                .send()
                .await
                .map_err(classify)?;

            let status = resp.status().as_u16();
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp.text().await.map_err(classify)?;

            Ok(TransportResponse {
                status,
                retry_after,
                body,
            })
        })
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    // reqwest embeds the full URL (credential included) in its Display output.
    let e = e.without_url();
    if e.is_timeout() {
        TransportError::timeout(format!("request timeout: {e}"))
    } else if e.is_connect() {
        TransportError::connect(format!("connection failed: {e}"))
    } else {
        TransportError::new(TransportErrorKind::Other, format!("request failed: {e}"))
    }
}

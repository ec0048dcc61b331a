#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use httpmock::MockServer;
use polygon_gate::core::{Transport, TransportError, TransportFuture, TransportResponse};
use polygon_gate::{PolyClient, PolyClientBuilder, RateLimit};
use url::Url;

pub const API_KEY: &str = "test-key";

pub fn setup_server() -> MockServer {
    MockServer::start()
}

/// Base URL for a mock server, mirroring the provider's `/v2/` prefix.
pub fn base_url(server: &MockServer) -> Url {
    Url::parse(&server.url("/v2/")).unwrap()
}

/// A client pointed at `server` with a generous bucket and fast retries.
pub fn mock_client(server: &MockServer) -> PolyClient {
    mock_builder(server).build().unwrap()
}

pub fn mock_builder(server: &MockServer) -> PolyClientBuilder {
    PolyClient::builder()
        .api_key(API_KEY)
        .base_url(base_url(server))
        .rate_limit(RateLimit::per_minute(1000))
        .retry_delay(Duration::from_millis(1))
        .timeout(Duration::from_secs(5))
}

pub fn prev_close_body(ticker: &str, close: f64) -> String {
    format!(
        r#"{{"ticker":"{ticker}","status":"OK","adjusted":true,"queryCount":1,"resultsCount":1,
"results":[{{"T":"{ticker}","o":{open},"h":{high},"l":{low},"c":{close},"v":1200.5,"vw":{close},"t":1704153600000,"n":42}}]}}"#,
        open = close - 1.0,
        high = close + 2.0,
        low = close - 2.0,
    )
}

/// One scripted reply.
pub type Scripted = Result<TransportResponse, TransportError>;

/// Transport that answers from a script and records every URL it was asked for.
///
/// Once the script runs dry every call gets `fallback`.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Scripted,
    calls: AtomicUsize,
    urls: Mutex<Vec<Url>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Scripted>, fallback: Scripted) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    /// Always answers 200 with `body`.
    pub fn always_ok(body: &str) -> Arc<Self> {
        Self::new([], Ok(TransportResponse::ok(body)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.urls().iter().map(|u| u.path().to_string()).collect()
    }
}

impl Transport for ScriptedTransport {
    fn get<'a>(&'a self, url: &'a Url, _timeout: Duration) -> TransportFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.clone());
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        Box::pin(async move { reply })
    }
}

/// A client over `transport` with the default (Basic tier) bucket and retry policy.
pub fn scripted_builder(transport: Arc<ScriptedTransport>) -> PolyClientBuilder {
    PolyClient::builder().api_key(API_KEY).transport(transport)
}

pub fn scripted_client(transport: Arc<ScriptedTransport>) -> PolyClient {
    scripted_builder(transport).build().unwrap()
}

#[cfg(feature = "tracing-subscriber")]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(not(feature = "tracing-subscriber"))]
pub fn init_tracing() {}

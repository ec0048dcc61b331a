use std::time::Duration;

use polygon_gate::core::{TransportError, TransportResponse};
use polygon_gate::{CacheMode, PolyError, RequestIdentity, RetryConfig};
use tokio::time::Instant;

use crate::common::{self, ScriptedTransport};

fn prev() -> RequestIdentity {
    RequestIdentity::path_only("/aggs/ticker/AAPL/prev")
}

#[tokio::test(start_paused = true)]
async fn persistent_failure_stops_after_three_attempts() {
    let transport = ScriptedTransport::new([], Err(TransportError::connect("connection refused")));
    let client = common::scripted_client(transport.clone());

    let start = Instant::now();
    let err = client
        .fetch(&prev(), CacheMode::Use, None)
        .await
        .unwrap_err();

    assert_eq!(transport.calls(), 3);
    match &err {
        PolyError::UpstreamUnavailable {
            attempts,
            url,
            last_error,
        } => {
            assert_eq!(*attempts, 3);
            assert!(url.ends_with("/v2/aggs/ticker/AAPL/prev"), "{url}");
            assert!(!url.contains("apiKey"));
            assert_eq!(last_error, "connection refused");
        }
        other => panic!("expected UpstreamUnavailable, got {other:?}"),
    }
    assert!(err.is_upstream_unavailable());
    assert_eq!(err.status_hint(), 503);
    // linear backoff: 1s after the first attempt, 2s after the second
    let waited = start.elapsed();
    assert!(
        waited >= Duration::from_secs(3) && waited < Duration::from_secs(4),
        "{waited:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn server_errors_are_retried() {
    let transport = ScriptedTransport::new(
        [
            Ok(TransportResponse::status(500, "oops")),
            Ok(TransportResponse::status(502, "bad gateway")),
        ],
        Ok(TransportResponse::ok(r#"{"ok":true}"#)),
    );
    let client = common::scripted_client(transport.clone());

    let value = client.fetch(&prev(), CacheMode::Use, None).await.unwrap();

    assert_eq!(value["ok"], true);
    assert_eq!(transport.calls(), 3);
    // each admitted attempt takes a token
    assert_eq!(client.rate_limit_status().remaining, 2);
}

#[tokio::test(start_paused = true)]
async fn malformed_payload_is_retryable() {
    let transport = ScriptedTransport::new(
        [Ok(TransportResponse::ok("<html>maintenance</html>"))],
        Ok(TransportResponse::ok("[]")),
    );
    let client = common::scripted_client(transport.clone());

    let value = client.fetch(&prev(), CacheMode::Use, None).await.unwrap();

    assert_eq!(value, serde_json::json!([]));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn last_error_describes_the_final_status() {
    let transport = ScriptedTransport::new([], Ok(TransportResponse::status(404, "not found")));
    let client = common::scripted_client(transport.clone());

    let err = client
        .fetch(&prev(), CacheMode::Use, None)
        .await
        .unwrap_err();

    match err {
        PolyError::UpstreamUnavailable { last_error, .. } => {
            assert_eq!(last_error, "unexpected response status 404");
        }
        other => panic!("expected UpstreamUnavailable, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn per_call_override_replaces_the_default_policy() {
    let transport = ScriptedTransport::new([], Err(TransportError::timeout("request timeout")));
    let client = common::scripted_client(transport.clone());

    let err = client
        .fetch(&prev(), CacheMode::Use, Some(&RetryConfig::no_retry()))
        .await
        .unwrap_err();

    assert!(matches!(err, PolyError::UpstreamUnavailable { attempts: 1, .. }));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_max_attempts_still_dispatches_once() {
    let transport = ScriptedTransport::new([], Err(TransportError::timeout("request timeout")));
    let client = common::scripted_builder(transport.clone())
        .max_attempts(0)
        .build()
        .unwrap();

    let err = client
        .fetch(&prev(), CacheMode::Use, None)
        .await
        .unwrap_err();

    assert!(matches!(err, PolyError::UpstreamUnavailable { attempts: 1, .. }));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn request_carries_the_credential() {
    let transport = ScriptedTransport::always_ok("{}");
    let client = common::scripted_client(transport.clone());

    client.fetch(&prev(), CacheMode::Use, None).await.unwrap();

    let urls = transport.urls();
    assert_eq!(urls.len(), 1);
    assert_eq!(
        urls[0].as_str(),
        format!(
            "https://api.polygon.io/v2/aggs/ticker/AAPL/prev?apiKey={}",
            common::API_KEY
        )
    );
}

use httpmock::Method::GET;
use polygon_gate::{MarketData, PolyError};

use crate::common::{self, API_KEY};

#[tokio::test]
async fn current_quote_prefixes_crypto_and_caches() {
    let server = common::setup_server();
    let body = common::prev_close_body("X:BTC", 64_000.0);
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v2/aggs/ticker/X:BTC/prev")
            .query_param("apiKey", API_KEY);
        then.status(200)
            .header("content-type", "application/json")
            .body(body.clone());
    });

    let client = common::mock_client(&server);
    let market = MarketData::new(&client);

    let first = market.current_quote("BTC", "crypto").await.unwrap();
    let second = market.current_quote("X:BTC", "crypto").await.unwrap();

    mock.assert_calls(1);
    assert_eq!(first, second);
    assert_eq!(first["results"][0]["c"], 64_000.0);
}

#[tokio::test]
async fn current_bar_decodes_the_first_result() {
    let server = common::setup_server();
    let body = common::prev_close_body("AAPL", 190.5);
    let mock = server.mock(|when, then| {
        when.method(GET).path("/v2/aggs/ticker/AAPL/prev");
        then.status(200).body(body.clone());
    });

    let client = common::mock_client(&server);
    let bar = MarketData::new(&client)
        .current_bar("AAPL", "stocks")
        .await
        .unwrap()
        .expect("one bar");

    mock.assert();
    assert_eq!(bar.close, 190.5);
    assert_eq!(bar.ticker.as_deref(), Some("AAPL"));
    assert_eq!(bar.transactions, Some(42));
    assert_eq!(bar.timestamp().unwrap().to_rfc3339(), "2024-01-02T00:00:00+00:00");
}

#[tokio::test]
async fn historical_range_builds_the_range_path() {
    let server = common::setup_server();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v2/aggs/ticker/AAPL/range/5/minute/2024-01-02/2024-01-03")
            .query_param("apiKey", API_KEY);
        then.status(200)
            .body(r#"{"ticker":"AAPL","status":"OK","resultsCount":0,"results":[]}"#);
    });

    let client = common::mock_client(&server);
    let value = MarketData::new(&client)
        .historical_range("AAPL", "stocks", "5/minute", "2024-01-02", "2024-01-03")
        .await
        .unwrap();

    mock.assert();
    assert_eq!(value["resultsCount"], 0);
}

#[tokio::test]
async fn day_bar_is_a_single_day_range() {
    let server = common::setup_server();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v2/aggs/ticker/C:EURUSD/range/1/day/2024-03-01/2024-03-01");
        then.status(200).body(r#"{"status":"OK","results":[]}"#);
    });

    let client = common::mock_client(&server);
    MarketData::new(&client)
        .day_bar("EURUSD", "forex", "2024-03-01")
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn grouped_daily_uses_the_global_locale() {
    let server = common::setup_server();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v2/grouped/locale/global/market/crypto/2024-01-02");
        then.status(200).body(r#"{"status":"OK","results":[]}"#);
    });

    let client = common::mock_client(&server);
    MarketData::new(&client)
        .grouped_daily("Crypto", "2024-01-02")
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn live_calls_skip_the_cache() {
    let server = common::setup_server();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/v2/aggs/ticker/AAPL/prev");
        then.status(200).body("{}");
    });

    let client = common::mock_client(&server);
    let market = MarketData::new(&client).live();
    market.current_quote("AAPL", "stocks").await.unwrap();
    market.current_quote("AAPL", "stocks").await.unwrap();

    mock.assert_calls(2);
    assert_eq!(client.cache_stats().await.entries, 0);
}

#[tokio::test]
async fn provider_errors_exhaust_retries_without_leaking_the_key() {
    let server = common::setup_server();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/v2/aggs/ticker/AAPL/prev");
        then.status(503).body("Service Unavailable");
    });

    let client = common::mock_builder(&server).max_attempts(2).build().unwrap();
    let err = MarketData::new(&client)
        .current_quote("AAPL", "stocks")
        .await
        .unwrap_err();

    mock.assert_calls(2);
    match &err {
        PolyError::UpstreamUnavailable { attempts, url, .. } => {
            assert_eq!(*attempts, 2);
            assert!(!url.contains(API_KEY), "{url}");
        }
        other => panic!("expected UpstreamUnavailable, got {other:?}"),
    }
    assert!(!err.to_string().contains(API_KEY));
}

#[tokio::test]
async fn repeated_rate_limits_end_in_rate_limited() {
    let server = common::setup_server();
    let limited = server.mock(|when, then| {
        when.method(GET).path("/v2/aggs/ticker/MSFT/prev");
        then.status(429).header("retry-after", "0");
    });

    let client = common::mock_builder(&server)
        .retry_config(polygon_gate::RetryConfig {
            max_rate_limit_recoveries: Some(1),
            ..Default::default()
        })
        .build()
        .unwrap();
    let err = MarketData::new(&client)
        .current_quote("MSFT", "stocks")
        .await
        .unwrap_err();

    limited.assert_calls(2);
    assert!(matches!(err, PolyError::RateLimited { .. }), "{err:?}");
}

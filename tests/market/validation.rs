use polygon_gate::{MarketData, PolyError};

use crate::common::{self, ScriptedTransport};

fn market() -> (std::sync::Arc<ScriptedTransport>, MarketData) {
    let transport = ScriptedTransport::always_ok("{}");
    let client = common::scripted_client(transport.clone());
    (transport, MarketData::new(&client))
}

#[tokio::test]
async fn unknown_timeframe_is_rejected_before_dispatch() {
    let (transport, market) = market();

    let err = market
        .historical_range("AAPL", "stocks", "2/day", "2024-01-01", "2024-01-31")
        .await
        .unwrap_err();

    assert!(matches!(err, PolyError::InvalidArgument(_)), "{err:?}");
    assert_eq!(err.status_hint(), 400);
    assert_eq!(transport.calls(), 0);
    assert_eq!(market.client().rate_limit_status().remaining, 5);
}

#[tokio::test]
async fn aliases_are_not_wire_timeframes() {
    let (transport, market) = market();
    let err = market
        .historical_range("AAPL", "stocks", "1d", "2024-01-01", "2024-01-31")
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let (transport, market) = market();
    let err = market
        .historical_range("AAPL", "stocks", "1/day", "2024-02-01", "2024-01-01")
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn malformed_dates_are_rejected() {
    let (transport, market) = market();
    for (from, to) in [
        ("2024/01/01", "2024-01-31"),
        ("2024-01-01", "Jan 31"),
        ("2024-02-30", "2024-03-01"),
    ] {
        let err = market
            .historical_range("AAPL", "stocks", "1/day", from, to)
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument(), "{from}..{to}");
    }
    assert!(market.day_bar("AAPL", "stocks", "yesterday").await.is_err());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn grouped_daily_requires_a_known_market() {
    let (transport, market) = market();

    let err = market
        .grouped_daily("futures", "2024-01-02")
        .await
        .unwrap_err();

    assert!(err.is_invalid_argument());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn single_day_range_is_allowed() {
    let (transport, market) = market();
    market
        .historical_range("EURUSD", "forex", "1/hour", "2024-03-01", "2024-03-01")
        .await
        .unwrap();
    assert_eq!(
        transport.paths(),
        vec!["/v2/aggs/ticker/C:EURUSD/range/1/hour/2024-03-01/2024-03-01".to_string()]
    );
}

#[tokio::test]
async fn unknown_market_type_sends_symbol_verbatim() {
    let (transport, market) = market();
    market.current_quote("I:SPX", "indices").await.unwrap();
    market
        .historical_range("I:SPX", "indices", "1/day", "2024-01-01", "2024-01-05")
        .await
        .unwrap();
    assert_eq!(
        transport.paths(),
        vec![
            "/v2/aggs/ticker/I:SPX/prev".to_string(),
            "/v2/aggs/ticker/I:SPX/range/1/day/2024-01-01/2024-01-05".to_string(),
        ]
    );
}

#[tokio::test]
async fn symbols_that_would_rewrite_the_path_are_rejected() {
    let (transport, market) = market();
    for symbol in [
        "BTC/USD",
        "AAPL#",
        "AAPL?limit=5000",
        "",
        "   ",
        "X:",
        "BRK B",
        "AAPL%2F",
    ] {
        let err = market.current_quote(symbol, "stocks").await.unwrap_err();
        assert!(err.is_invalid_argument(), "{symbol:?}: {err:?}");

        let err = market
            .historical_range(symbol, "crypto", "1/day", "2024-01-01", "2024-01-05")
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument(), "{symbol:?}: {err:?}");

        let err = market
            .day_bar(symbol, "forex", "2024-01-02")
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument(), "{symbol:?}: {err:?}");
    }
    assert_eq!(transport.calls(), 0);
    assert_eq!(market.client().rate_limit_status().remaining, 5);
}

#[tokio::test]
async fn builder_rejects_invalid_symbols() {
    let (transport, market) = market();
    let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

    let err = polygon_gate::AggregatesBuilder::new(market.client(), "X:BTC/USD")
        .verbatim()
        .on(day)
        .fetch()
        .await
        .unwrap_err();

    assert!(err.is_invalid_argument());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn surrounding_whitespace_is_tolerated() {
    let (transport, market) = market();
    market.current_quote("  AAPL ", "stocks").await.unwrap();
    assert_eq!(transport.paths(), vec!["/v2/aggs/ticker/AAPL/prev".to_string()]);
}

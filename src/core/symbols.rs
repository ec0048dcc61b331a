//! Symbol, market-type and timeframe vocabulary.
//!
//! Everything here is pure: mapping a user-facing symbol onto the provider's wire
//! format never fails and never touches shared state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::PolyError;

/// Separator between a market prefix and the bare ticker (`X:BTCUSD`).
pub const PREFIX_DELIMITER: char = ':';

/// The market segments the provider serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    /// Equities. Tickers are sent bare.
    Stocks,
    /// Crypto pairs, sent with the `X:` prefix.
    Crypto,
    /// Currency pairs, sent with the `C:` prefix.
    Forex,
    /// Option contracts. Sent bare.
    Options,
}

impl MarketType {
    /// Every supported market type, in declaration order.
    pub const ALL: [Self; 4] = [Self::Stocks, Self::Crypto, Self::Forex, Self::Options];

    /// The lowercase token used in paths and query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stocks => "stocks",
            Self::Crypto => "crypto",
            Self::Forex => "forex",
            Self::Options => "options",
        }
    }

    /// The canonical wire prefix for this market, if any.
    #[must_use]
    pub const fn wire_prefix(self) -> Option<&'static str> {
        match self {
            Self::Crypto => Some("X:"),
            Self::Forex => Some("C:"),
            Self::Stocks | Self::Options => None,
        }
    }

    /// Maps the single-letter tag used in free-text mentions (`(X:BTCUSD)`).
    #[must_use]
    pub const fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'X' => Some(Self::Crypto),
            'S' => Some(Self::Stocks),
            'C' => Some(Self::Forex),
            _ => None,
        }
    }

    /// Formats `raw` into the provider symbol for this market.
    ///
    /// Any existing prefix is stripped first, so the result is the same whether the
    /// caller passes `BTCUSD` or `X:BTCUSD`.
    #[must_use]
    pub fn provider_symbol(self, raw: &str) -> String {
        let bare = strip_prefix(raw);
        match self.wire_prefix() {
            Some(prefix) => format!("{prefix}{bare}"),
            None => bare.to_string(),
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketType {
    type Err = PolyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| PolyError::invalid(format!("invalid market type: {s}")))
    }
}

/// Aggregation windows accepted by the ranged aggregate endpoint.
///
/// The wire token is `{multiplier}/{timespan}` and is substituted directly into the
/// path, e.g. `/range/5/minute/...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1/minute")]
    Minute1,
    #[serde(rename = "5/minute")]
    Minute5,
    #[serde(rename = "15/minute")]
    Minute15,
    #[serde(rename = "30/minute")]
    Minute30,
    #[serde(rename = "1/hour")]
    Hour1,
    #[serde(rename = "4/hour")]
    Hour4,
    #[serde(rename = "1/day")]
    Day1,
    #[serde(rename = "1/week")]
    Week1,
    #[serde(rename = "1/month")]
    Month1,
}

impl Timeframe {
    /// The closed set of valid timeframes.
    pub const ALL: [Self; 9] = [
        Self::Minute1,
        Self::Minute5,
        Self::Minute15,
        Self::Minute30,
        Self::Hour1,
        Self::Hour4,
        Self::Day1,
        Self::Week1,
        Self::Month1,
    ];

    /// The `{multiplier}/{timespan}` wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute1 => "1/minute",
            Self::Minute5 => "5/minute",
            Self::Minute15 => "15/minute",
            Self::Minute30 => "30/minute",
            Self::Hour1 => "1/hour",
            Self::Hour4 => "4/hour",
            Self::Day1 => "1/day",
            Self::Week1 => "1/week",
            Self::Month1 => "1/month",
        }
    }

    /// The short alias (`5m`, `1h`, `1M`, ...).
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::Minute1 => "1m",
            Self::Minute5 => "5m",
            Self::Minute15 => "15m",
            Self::Minute30 => "30m",
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Day1 => "1d",
            Self::Week1 => "1w",
            Self::Month1 => "1M",
        }
    }

    /// Accepts either the wire token or its short alias.
    ///
    /// # Errors
    ///
    /// Returns `PolyError::InvalidArgument` when `token` names neither.
    pub fn parse_lenient(token: &str) -> Result<Self, PolyError> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == token || t.alias() == token)
            .ok_or_else(|| PolyError::invalid(format!("invalid timeframe: {token}")))
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = PolyError;

    /// Strict: only the wire tokens are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| PolyError::invalid(format!("invalid timeframe: {s}")))
    }
}

/// A raw symbol resolved against a market type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedSymbol {
    /// The symbol as the caller supplied it.
    pub raw: String,
    /// The market it was resolved against.
    pub market: MarketType,
    /// The symbol in the provider's wire format.
    pub provider_symbol: String,
}

impl NormalizedSymbol {
    #[must_use]
    pub fn new(raw: impl Into<String>, market: MarketType) -> Self {
        let raw = raw.into();
        let provider_symbol = market.provider_symbol(&raw);
        Self {
            raw,
            market,
            provider_symbol,
        }
    }
}

/// Maps a symbol and a market-type token into the provider's wire format.
///
/// Unknown market types pass the symbol through unchanged.
#[must_use]
pub fn format_for_api(raw: &str, market_type: &str) -> String {
    match market_type.parse::<MarketType>() {
        Ok(market) => market.provider_symbol(raw),
        Err(_) => raw.to_string(),
    }
}

/// Membership test against the closed timeframe set (wire tokens only).
#[must_use]
pub fn is_valid_timeframe(token: &str) -> bool {
    token.parse::<Timeframe>().is_ok()
}

/// Membership test against the closed market-type set (case-insensitive).
#[must_use]
pub fn is_valid_market_type(token: &str) -> bool {
    token.parse::<MarketType>().is_ok()
}

/// Checks that `raw` can be substituted into an endpoint path as one segment.
///
/// Rejects blank symbols, a bare market prefix (`X:`), and symbols containing `/`,
/// `?`, `#`, `%` or whitespace.
///
/// # Errors
///
/// Returns `PolyError::InvalidArgument` describing the offending symbol.
pub fn validate_symbol(raw: &str) -> Result<(), PolyError> {
    let trimmed = raw.trim();
    if strip_prefix(trimmed).is_empty() {
        return Err(PolyError::invalid(format!("empty symbol: {raw:?}")));
    }
    if trimmed
        .chars()
        .any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace())
    {
        return Err(PolyError::invalid(format!("invalid symbol: {raw:?}")));
    }
    Ok(())
}

/// Membership test for [`validate_symbol`].
#[must_use]
pub fn is_valid_symbol(raw: &str) -> bool {
    validate_symbol(raw).is_ok()
}

// Keeps everything after the first delimiter, so `X:BTC:USD` becomes `BTC:USD`.
fn strip_prefix(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.split_once(PREFIX_DELIMITER) {
        Some((_, bare)) => bare,
        None => raw,
    }
}

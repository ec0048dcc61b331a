use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::{MarketType, is_valid_symbol};

// `(X:BTCUSD)`, `(S:AAPL)`, `(C:EURUSD)`
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((X|S|C):([^)]+)\)").expect("Invalid regex pattern"));

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}-\d{2}-\d{2}\b|\b\d{2}/\d{2}/\d{4}\b").expect("Invalid regex pattern")
});

/// A tagged symbol found in free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mention {
    /// The bare symbol inside the parentheses.
    pub symbol: String,
    pub market: MarketType,
}

/// Everything [`extract_mentions`] pulls out of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDetails {
    /// Mentions in order of appearance. Duplicates are kept.
    pub mentions: Vec<Mention>,
    /// The first valid date in the message.
    pub date: Option<NaiveDate>,
}

impl QueryDetails {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }
}

/// Extracts `(P:SYMBOL)` mentions and the first date from a chat message.
///
/// `P` is `X` for crypto, `S` for stocks and `C` for forex. Dates may be written
/// `YYYY-MM-DD` or `MM/DD/YYYY`; matches that are not real calendar dates are skipped.
/// Mentions whose symbol could not form a path segment (`(X:BTC/USD)`) are dropped.
#[must_use]
pub fn extract_mentions(text: &str) -> QueryDetails {
    let mentions = MENTION_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let tag = caps.get(1)?.as_str().chars().next()?;
            let symbol = caps.get(2)?.as_str().trim();
            if !is_valid_symbol(symbol) {
                return None;
            }
            Some(Mention {
                symbol: symbol.to_string(),
                market: MarketType::from_tag(tag)?,
            })
        })
        .collect();

    let date = DATE_RE
        .find_iter(text)
        .find_map(|m| parse_loose_date(m.as_str()));

    QueryDetails { mentions, date }
}

fn parse_loose_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
}

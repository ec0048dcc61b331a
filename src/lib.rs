//! polygon-gate: rate-limited, cached access to the Polygon.io market data REST API.
//!
//! Every call goes through one executor that checks a TTL cache, takes a token from the
//! provider's admission bucket, waits out HTTP 429 replies for the advised delay, and
//! retries other failures a bounded number of times with linear backoff.
//!
//! ```no_run
//! # use polygon_gate::{MarketData, PolyClient, Tier};
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PolyClient::builder()
//!     .api_key(std::env::var("POLYGON_API_KEY")?)
//!     .tier(Tier::Starter)
//!     .build()?;
//!
//! let quote = MarketData::new(&client).current_quote("BTCUSD", "crypto").await?;
//! println!("{quote}");
//! # Ok(())
//! # }
//! ```

pub mod aggregates;
pub mod core;
pub mod digest;
pub mod market;
pub mod search;

pub use aggregates::AggregatesBuilder;
pub use crate::core::{
    CacheMode, MarketType, PolyClient, PolyClientBuilder, PolyError, RateLimit, RequestIdentity,
    RetryConfig, Tier, Timeframe, format_for_api, is_valid_market_type, is_valid_symbol,
    is_valid_timeframe,
};
pub use digest::{SnapshotBuilder, extract_mentions, summarize};
pub use market::MarketData;
pub use search::{SearchBuilder, TickerResult};

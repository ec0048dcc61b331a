//! Core components of the `polygon-gate` client.
//!
//! This module contains the market data access core:
//! - The main [`PolyClient`] and its builder.
//! - The primary [`PolyError`] type.
//! - Symbol, market-type and timeframe normalization.
//! - The admission bucket, the response cache and the request executor.

/// Token-bucket admission control.
pub mod admission;
/// TTL-bounded response cache.
pub mod cache;
/// The main client (`PolyClient`), builder, and configuration.
pub mod client;
/// Time source abstraction.
pub mod clock;
/// Date parsing and validation helpers.
pub mod dates;
/// The primary error type (`PolyError`) for the crate.
pub mod error;
/// Cache-check, admission, dispatch and retry state machine.
pub mod executor;
/// Canonical, credential-free request identities used as cache keys.
pub mod identity;
/// Symbol / market type / timeframe vocabulary.
pub mod symbols;
/// HTTP transport abstraction and the reqwest implementation.
pub mod transport;
/// Wire models of the aggregate endpoints.
pub mod wire;

// convenient re-exports so most code can just `use crate::core::PolyClient`
pub use admission::{RateLimit, RateLimitStatus, TokenBucket};
pub use cache::{CacheMode, CacheStats, ResponseCache};
pub use client::{PolyClient, PolyClientBuilder, RetryConfig, Tier};
pub use clock::{Clock, ManualClock, TokioClock};
pub use error::PolyError;
pub use executor::Executor;
pub use identity::RequestIdentity;
pub use symbols::{
    MarketType, NormalizedSymbol, Timeframe, format_for_api, is_valid_market_type, is_valid_symbol,
    is_valid_timeframe, validate_symbol,
};
pub use transport::{
    ReqwestTransport, Transport, TransportError, TransportErrorKind, TransportFuture,
    TransportResponse,
};
pub use wire::{AggBar, AggregatesResponse};

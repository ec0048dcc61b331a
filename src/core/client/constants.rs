//! Centralized constants for default endpoints, limits and UA.

use std::time::Duration;

/// Identifies this crate to the provider.
pub(crate) const USER_AGENT: &str = concat!("polygon-gate/", env!("CARGO_PKG_VERSION"));

/// Provider REST base. Endpoint paths are joined onto it.
pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io/v2/";

/// Per-dispatch transport timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifetime of a cached payload.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);

/// Entry-count ceiling of the response cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Environment variable holding the provider credential.
pub const ENV_API_KEY: &str = "POLYGON_API_KEY";

/// Environment variable selecting the subscription [`Tier`](super::Tier).
pub const ENV_TIER: &str = "POLYGON_TIER";

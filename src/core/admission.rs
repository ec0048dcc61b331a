//! Token-bucket admission control for outbound provider calls.
//!
//! Tokens accrue continuously at `refill / per`, capped at `capacity`. Refill is computed
//! from elapsed time whenever the bucket is touched; nothing runs in the background.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::core::PolyError;
use crate::core::clock::{Clock, TokioClock};

/// Shape of a token bucket: `capacity` burst, `refill` tokens every `per`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub capacity: u32,
    pub refill: u32,
    pub per: Duration,
}

impl RateLimit {
    /// `n` requests per minute with a burst of `n`.
    #[must_use]
    pub const fn per_minute(n: u32) -> Self {
        Self {
            capacity: n,
            refill: n,
            per: Duration::from_secs(60),
        }
    }

    /// True when capacity, refill and window are all non-zero.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.capacity > 0 && self.refill > 0 && !self.per.is_zero()
    }

    fn tokens_per_sec(&self) -> f64 {
        f64::from(self.refill) / self.per.as_secs_f64()
    }
}

/// Snapshot returned by [`TokenBucket::status`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitStatus {
    /// Whole tokens available right now.
    pub remaining: u32,
    pub capacity: u32,
    /// Time until the next whole token accrues; zero when the bucket is full.
    pub next_token_in: Duration,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl BucketState {
    fn refill(&mut self, now: Instant, limit: &RateLimit) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        let capacity = f64::from(limit.capacity);
        self.tokens = (self.tokens + elapsed * limit.tokens_per_sec()).min(capacity);
        self.last_refill = now;
    }

    fn wait_for(&self, n: f64, limit: &RateLimit) -> Duration {
        let missing = (n - self.tokens).max(0.0);
        Duration::try_from_secs_f64(missing / limit.tokens_per_sec()).unwrap_or(Duration::MAX)
    }
}

/// Token bucket shared by every in-flight request of one client.
///
/// Refill and decrement happen inside one short critical section. Waiters queue on a
/// fair (FIFO) async mutex, so a steady stream of new callers cannot starve an older one.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    limit: RateLimit,
    state: Arc<Mutex<BucketState>>,
    queue: Arc<tokio::sync::Mutex<()>>,
    clock: Arc<dyn Clock>,
}

impl TokenBucket {
    /// Creates a full bucket on the runtime clock.
    ///
    /// # Errors
    ///
    /// Returns `PolyError::InvalidArgument` if the limit has a zero capacity, refill or window.
    pub fn new(limit: RateLimit) -> Result<Self, PolyError> {
        Self::with_clock(limit, Arc::new(TokioClock))
    }

    /// Creates a full bucket on the given clock.
    ///
    /// [`acquire`](Self::acquire) sleeps on tokio time, so the clock must advance with it
    /// for waits to make progress; [`try_acquire`](Self::try_acquire) works with any clock.
    ///
    /// # Errors
    ///
    /// Returns `PolyError::InvalidArgument` if the limit has a zero capacity, refill or window.
    pub fn with_clock(limit: RateLimit, clock: Arc<dyn Clock>) -> Result<Self, PolyError> {
        if !limit.is_valid() {
            return Err(PolyError::invalid(format!(
                "rate limit must have a non-zero capacity, refill and window: {limit:?}"
            )));
        }
        let now = clock.now();
        Ok(Self {
            limit,
            state: Arc::new(Mutex::new(BucketState {
                tokens: f64::from(limit.capacity),
                last_refill: now,
            })),
            queue: Arc::new(tokio::sync::Mutex::new(())),
            clock,
        })
    }

    #[must_use]
    pub const fn limit(&self) -> RateLimit {
        self.limit
    }

    fn lock_state(&self) -> MutexGuard<'_, BucketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Requests larger than the bucket could never be granted; they are capped at capacity.
    fn clamp(&self, n: u32) -> f64 {
        f64::from(n.min(self.limit.capacity))
    }

    /// Suspends until `n` tokens are available, then consumes them. Never fails.
    pub async fn acquire(&self, n: u32) {
        let want = self.clamp(n);
        let _turn = self.queue.lock().await;
        loop {
            let wait = {
                let mut state = self.lock_state();
                state.refill(self.clock.now(), &self.limit);
                if state.tokens >= want {
                    state.tokens -= want;
                    return;
                }
                state.wait_for(want, &self.limit)
            };
            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }

    /// Consumes `n` tokens if they are available right now.
    pub fn try_acquire(&self, n: u32) -> bool {
        let want = self.clamp(n);
        let mut state = self.lock_state();
        state.refill(self.clock.now(), &self.limit);
        if state.tokens >= want {
            state.tokens -= want;
            true
        } else {
            false
        }
    }

    /// Whole tokens available right now.
    #[must_use]
    pub fn available(&self) -> u32 {
        let mut state = self.lock_state();
        state.refill(self.clock.now(), &self.limit);
        // tokens is kept within [0, capacity]
        state.tokens.floor() as u32
    }

    #[must_use]
    pub fn status(&self) -> RateLimitStatus {
        let mut state = self.lock_state();
        state.refill(self.clock.now(), &self.limit);
        let remaining = state.tokens.floor() as u32;
        let next_token_in = if remaining >= self.limit.capacity {
            Duration::ZERO
        } else {
            state.wait_for(f64::from(remaining + 1), &self.limit)
        };
        RateLimitStatus {
            remaining,
            capacity: self.limit.capacity,
            next_token_in,
        }
    }
}

//! Token-bucket rate limiting for classifier calls.
//!
//! One limiter instance is shared across all calls to the relevance
//! classifier. The orchestrator currently calls it sequentially, but the
//! state sits behind a mutex so a future worker pool can share a single
//! bucket across tasks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Token bucket: sustained rate of `calls_per_minute` with short bursts
/// up to `burst` tokens.
#[derive(Clone)]
pub struct RateLimiter {
    /// Time to accrue one token.
    interval: Duration,
    max_tokens: f64,
    state: Arc<Mutex<BucketState>>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(calls_per_minute: u32, burst: u32) -> Self {
        let calls_per_minute = calls_per_minute.max(1);
        Self {
            interval: Duration::from_secs_f64(60.0 / f64::from(calls_per_minute)),
            max_tokens: f64::from(burst.max(1)),
            state: Arc::new(Mutex::new(BucketState {
                tokens: f64::from(burst.max(1)),
                last_refill: Instant::now(),
            })),
        }
    }

    /// Take one token, sleeping exactly as long as needed to accrue it.
    ///
    /// The lock is held across the sleep so concurrent waiters are
    /// admitted in acquisition order against a single bucket.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);
        state.tokens = (state.tokens + elapsed.as_secs_f64() / self.interval.as_secs_f64())
            .min(self.max_tokens);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return;
        }

        let wait = self.interval.mul_f64(1.0 - state.tokens);
        tracing::debug!(wait_ms = %wait.as_millis(), "Rate limit reached, waiting for token");
        tokio::time::sleep(wait).await;
        state.tokens = 0.0;
        state.last_refill = Instant::now();
    }
}

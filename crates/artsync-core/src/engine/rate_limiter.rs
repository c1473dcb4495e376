//! Token bucket rate limiter for outbound request pacing
//!
//! One limiter instance is shared by every request the engine makes:
//! discovery page fetches, cache probes and downloads alike. The bucket
//! holds at most a single token, so a configured rate of R requests per
//! second admits one request every 1/R seconds with no initial burst.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Shared request-rate limiter using a token bucket.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<RateLimiterState>>,
}

struct RateLimiterState {
    /// Current available tokens, capped at 1.0.
    tokens: f64,
    /// Last token refill time.
    last_refill: Instant,
    /// Tokens added per second (the request rate).
    refill_rate: f64,
    /// Whether this is an unlimited limiter.
    is_unlimited: bool,
}

impl RateLimiter {
    /// Create a limiter admitting `requests_per_second` requests.
    /// A rate of 0 means unlimited.
    pub fn new(requests_per_second: u32) -> Self {
        if requests_per_second == 0 {
            return Self::unlimited();
        }

        Self {
            state: Arc::new(Mutex::new(RateLimiterState {
                tokens: 1.0,
                last_refill: Instant::now(),
                refill_rate: f64::from(requests_per_second),
                is_unlimited: false,
            })),
        }
    }

    /// Create an unlimited limiter (acquire never waits).
    pub fn unlimited() -> Self {
        Self {
            state: Arc::new(Mutex::new(RateLimiterState {
                tokens: 1.0,
                last_refill: Instant::now(),
                refill_rate: f64::MAX,
                is_unlimited: true,
            })),
        }
    }

    /// Acquire one request token, waiting until it is available.
    ///
    /// Waits happen in short slices outside the lock so every caller keeps
    /// getting a chance at the next token and none starves.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;

                if state.is_unlimited {
                    return;
                }

                Self::refill_tokens(&mut state);

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }

                let needed = 1.0 - state.tokens;
                let wait_secs = needed / state.refill_rate;

                // Cap wait time to 50ms so concurrent callers interleave
                Duration::from_secs_f64(wait_secs.min(0.05))
            };

            if wait > Duration::ZERO {
                tokio::time::sleep(wait).await;
            }
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill_tokens(state: &mut RateLimiterState) {
        let now = Instant::now();
        let elapsed_secs = now.duration_since(state.last_refill).as_secs_f64();

        if elapsed_secs > 0.001 {
            state.tokens = (state.tokens + elapsed_secs * state.refill_rate).min(1.0);
            state.last_refill = now;
        }
    }
}

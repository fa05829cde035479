//! Token-bucket admission control for outbound integration calls.
//!
//! One bucket exists per service tag (`whois`, `dns`, `http`, `llm`, …) and
//! is shared by every concurrent pipeline run in the process. Buckets refill
//! linearly with elapsed wall-clock time; acquisition is refill-then-check
//! under a single critical section, with a short poll sleep while blocking.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// How long `acquire` may wait for tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Fail immediately when the bucket cannot satisfy the request.
    NonBlocking,
    /// Wait up to the given duration.
    Timeout(Duration),
    /// Block until tokens become available.
    Forever,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_update: Instant,
}

/// Thread-safe token bucket.
#[derive(Debug)]
pub struct TokenBucket {
    /// Refill rate in tokens per second.
    rate: f64,
    /// Maximum token balance.
    burst: f64,
    state: Mutex<BucketState>,
}

/// Sleep granularity while waiting for tokens.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl TokenBucket {
    /// Create a bucket with the given refill rate; burst defaults to the
    /// rate when not provided.
    #[must_use]
    pub fn new(rate: f64, burst: Option<f64>) -> Self {
        let burst = burst.unwrap_or(rate);
        Self {
            rate,
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                last_update: Instant::now(),
            }),
        }
    }

    /// Refill from elapsed time, then take `tokens` if the balance allows.
    fn try_take(&self, tokens: f64) -> bool {
        let mut state = self.state.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_update).as_secs_f64();
        state.tokens = self.burst.min(state.tokens + elapsed * self.rate);
        state.last_update = now;

        if state.tokens >= tokens {
            state.tokens -= tokens;
            true
        } else {
            false
        }
    }

    /// Acquire `tokens`, waiting according to `wait`.
    ///
    /// Returns `true` iff the tokens were taken within the allowed wait.
    pub async fn acquire(&self, tokens: u32, wait: Wait) -> bool {
        let tokens = f64::from(tokens);
        let started = Instant::now();

        loop {
            if self.try_take(tokens) {
                return true;
            }

            match wait {
                Wait::NonBlocking => return false,
                Wait::Timeout(limit) if started.elapsed() >= limit => return false,
                Wait::Timeout(_) | Wait::Forever => {}
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Convenience: block until a single token is available.
    pub async fn wait(&self) {
        self.acquire(1, Wait::Forever).await;
    }
}

/// Process-wide registry of per-service buckets.
///
/// Created once at startup and passed through the orchestration context;
/// buckets are created lazily on first use and shared thereafter.
#[derive(Debug, Default)]
pub struct RateLimiterRegistry {
    limiters: Mutex<HashMap<String, Arc<TokenBucket>>>,
}

impl RateLimiterRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the bucket for a service tag.
    ///
    /// The rate and burst apply only when the bucket is first created;
    /// later calls return the existing bucket unchanged.
    pub fn get(&self, service: &str, rate: f64, burst: Option<f64>) -> Arc<TokenBucket> {
        let mut limiters = self.limiters.lock();
        limiters
            .entry(service.to_owned())
            .or_insert_with(|| Arc::new(TokenBucket::new(rate, burst)))
            .clone()
    }
}

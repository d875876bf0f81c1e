//! Client-side throttle on GitHub API calls.
//!
//! A token bucket: `burst` calls may go out back to back, after which calls
//! are spaced to `per_hour`. Callers wait for a token instead of being
//! rejected, so a long scan slows down rather than exhausting the hourly
//! budget.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Rate and burst for [`Throttle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Sustained calls per hour. Zero disables throttling.
    pub per_hour: u32,
    /// Calls allowed without waiting when the bucket is full.
    pub burst: u32,
}

impl ThrottleConfig {
    /// 360 calls per hour with a burst of 360.
    pub const DEFAULT: Self = Self {
        per_hour: 360,
        burst: 360,
    };

    pub fn is_enabled(&self) -> bool {
        self.per_hour > 0
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct Throttle {
    bucket: Mutex<Bucket>,
    capacity: f64,
    /// Tokens per second.
    refill_rate: f64,
}

impl Throttle {
    /// Returns `None` when `config` disables throttling.
    pub fn new(config: ThrottleConfig) -> Option<Self> {
        if !config.is_enabled() {
            return None;
        }
        let capacity = f64::from(config.burst.max(1));
        Some(Throttle {
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_rate: f64::from(config.per_hour) / 3600.0,
        })
    }

    /// Waits until a call may go out, then consumes one token.
    ///
    /// The lock is held while waiting, so waiters are served in order.
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;
        self.refill(&mut bucket);

        if bucket.tokens < 1.0 {
            let wait = Duration::from_secs_f64((1.0 - bucket.tokens) / self.refill_rate);
            debug!(wait_ms = wait.as_millis() as u64, "Throttling GitHub call");
            tokio::time::sleep(wait).await;
            self.refill(&mut bucket);
        }

        bucket.tokens = (bucket.tokens - 1.0).max(0.0);
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.capacity);
        bucket.last_refill = now;
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("capacity", &self.capacity)
            .field("refill_rate", &self.refill_rate)
            .finish_non_exhaustive()
    }
}

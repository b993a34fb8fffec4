//! Token-bucket rate gate for outbound requests.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Mutable bucket state, guarded by the limiter's lock.
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// A token-bucket rate limiter.
///
/// The bucket holds up to `burst` tokens and refills at `rate` tokens per
/// second. One token is consumed per permitted request. The limiter is
/// consulted by the polling loop but owned by the caller, so several loops
/// may share one budget through an `Arc`.
pub struct RateLimiter {
    rate: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter refilling `rate` tokens per second with a burst
    /// capacity of `burst`. A non-positive rate falls back to 1/s.
    pub fn new(rate: f64, burst: u32) -> Self {
        let rate = if rate > 0.0 { rate } else { 1.0 };
        Self {
            rate,
            burst: f64::from(burst),
            bucket: Mutex::new(Bucket {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Try to consume one token without waiting.
    pub fn allow(&self) -> bool {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// How long until the next token becomes available.
    ///
    /// Zero when a token is already available. Does not consume anything.
    pub fn reserve_delay(&self) -> Duration {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket);
        if bucket.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate)
        }
    }

    /// Wait until one token can be consumed, honoring cancellation.
    ///
    /// Returns `true` once a token was consumed, `false` if `cancel` fired
    /// first.
    pub async fn wait(&self, cancel: &CancellationToken) -> bool {
        loop {
            let delay = {
                let mut bucket = self.bucket.lock();
                self.refill(&mut bucket);
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return true;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate)
            };
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return false,
            }
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill);
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * self.rate).min(self.burst);
        bucket.last_refill = now;
    }
}

impl Default for RateLimiter {
    /// One request per second with a burst of three.
    fn default() -> Self {
        Self::new(1.0, 3)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rate", &self.rate)
            .field("burst", &self.burst)
            .finish_non_exhaustive()
    }
}

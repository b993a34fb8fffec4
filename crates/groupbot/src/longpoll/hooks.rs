//! Policy hooks consulted by the update loop.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use super::overheat::Overheater;
use crate::error::Error;
use crate::limiter::RateLimiter;

/// Strategy object deciding how the update loop reacts to overheat,
/// rate-limit and error conditions.
///
/// Production behavior lives in [`DefaultHooks`]. Tests inject their own
/// implementation to steer every path deterministically, without timers or
/// sockets.
#[async_trait]
pub trait Hooks: Send + Sync {
    /// Called when the failure-burst detector has tripped.
    ///
    /// Returning `true` terminates the update loop.
    async fn on_overheat(&self, cancel: &CancellationToken) -> bool;

    /// Called when the rate gate denies the next request.
    async fn on_rate_limited(&self, cancel: &CancellationToken, gate: &RateLimiter);

    /// Called when a fetch cycle ends in an error.
    async fn on_fetch_error(&self, detector: &Overheater, err: &Error);

    /// Called when a fetched body fails batch decoding.
    async fn on_decode_error(&self, detector: &Overheater, err: &Error);
}

/// Production policies: back off on overheat, wait on the gate when rate
/// limited, log and record failures otherwise.
pub struct DefaultHooks {
    /// Pause after the breaker trips before polling resumes.
    pub overheat_pause: Duration,
}

impl Default for DefaultHooks {
    fn default() -> Self {
        Self {
            overheat_pause: Duration::from_secs(3),
        }
    }
}

#[async_trait]
impl Hooks for DefaultHooks {
    async fn on_overheat(&self, cancel: &CancellationToken) -> bool {
        error!(
            pause_ms = self.overheat_pause.as_millis() as u64,
            "too many errors occurred, backing off"
        );
        tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(self.overheat_pause) => false,
        }
    }

    async fn on_rate_limited(&self, cancel: &CancellationToken, gate: &RateLimiter) {
        warn!(
            delay_ms = gate.reserve_delay().as_millis() as u64,
            "too many requests, waiting for the rate gate"
        );
        gate.wait(cancel).await;
    }

    async fn on_fetch_error(&self, detector: &Overheater, err: &Error) {
        error!(misc = ?err.misc(), "response with error: {err}");
        detector.record(Instant::now());
    }

    async fn on_decode_error(&self, detector: &Overheater, err: &Error) {
        error!(misc = ?err.misc(), "error while decoding update batch: {err}");
        detector.record(Instant::now());
    }
}

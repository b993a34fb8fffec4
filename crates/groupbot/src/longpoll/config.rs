//! Long-poll engine configuration.

use std::sync::Arc;

use crate::limiter::RateLimiter;

/// Shortest server-side hold time, in seconds.
pub const MIN_WAIT: u64 = 1;
/// Longest server-side hold time, in seconds.
pub const MAX_WAIT: u64 = 90;
/// Default server-side hold time, in seconds.
pub const DEFAULT_WAIT: u64 = 25;

/// Largest accepted update channel capacity.
pub const MAX_UPDATE_BUFFER: usize = 1000;
/// Default update channel capacity.
pub const DEFAULT_UPDATE_BUFFER: usize = 10;

/// Configuration of the long-poll engine.
#[derive(Debug, Clone)]
pub struct LongPollConfig {
    /// How long the server may hold one poll request, in seconds.
    /// Out-of-range values fall back to [`DEFAULT_WAIT`].
    pub wait: u64,

    /// Capacity of the outbound update channel. Values above
    /// [`MAX_UPDATE_BUFFER`] fall back to [`DEFAULT_UPDATE_BUFFER`].
    pub update_buffer_size: usize,

    /// Shared request rate gate, consulted before every fetch.
    pub limiter: Arc<RateLimiter>,
}

impl Default for LongPollConfig {
    fn default() -> Self {
        Self {
            wait: DEFAULT_WAIT,
            update_buffer_size: DEFAULT_UPDATE_BUFFER,
            limiter: Arc::new(RateLimiter::default()),
        }
    }
}

impl LongPollConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server-side hold time, falling back to the default when
    /// outside 1..=90 seconds.
    pub fn with_wait(mut self, wait: u64) -> Self {
        self.wait = if (MIN_WAIT..=MAX_WAIT).contains(&wait) {
            wait
        } else {
            DEFAULT_WAIT
        };
        self
    }

    /// Set the update channel capacity, falling back to the default when
    /// above 1000.
    pub fn with_update_buffer_size(mut self, size: usize) -> Self {
        self.update_buffer_size = if size <= MAX_UPDATE_BUFFER {
            size
        } else {
            DEFAULT_UPDATE_BUFFER
        };
        self
    }

    /// Share an externally owned rate gate.
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Re-apply the range fallbacks to the current values.
    pub(crate) fn normalized(self) -> Self {
        let wait = self.wait;
        let size = self.update_buffer_size;
        self.with_wait(wait).with_update_buffer_size(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LongPollConfig::default();
        assert_eq!(config.wait, 25);
        assert_eq!(config.update_buffer_size, 10);
    }

    #[test]
    fn test_wait_fallback() {
        assert_eq!(LongPollConfig::new().with_wait(0).wait, DEFAULT_WAIT);
        assert_eq!(LongPollConfig::new().with_wait(91).wait, DEFAULT_WAIT);
        assert_eq!(LongPollConfig::new().with_wait(90).wait, 90);
        assert_eq!(LongPollConfig::new().with_wait(1).wait, 1);
    }

    #[test]
    fn test_buffer_fallback() {
        assert_eq!(
            LongPollConfig::new()
                .with_update_buffer_size(1001)
                .update_buffer_size,
            DEFAULT_UPDATE_BUFFER
        );
        assert_eq!(
            LongPollConfig::new()
                .with_update_buffer_size(0)
                .update_buffer_size,
            0
        );
    }

    #[test]
    fn test_normalized() {
        let config = LongPollConfig {
            wait: 1000,
            update_buffer_size: 5000,
            limiter: Arc::new(RateLimiter::default()),
        }
        .normalized();
        assert_eq!(config.wait, DEFAULT_WAIT);
        assert_eq!(config.update_buffer_size, DEFAULT_UPDATE_BUFFER);
    }
}

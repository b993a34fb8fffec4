//! Bot runtime configuration.

use serde::{Deserialize, Serialize};

/// Sizing of the dispatcher and its worker pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotConfig {
    /// Number of persistent worker tasks.
    pub workers: usize,

    /// Input buffer of each worker channel.
    pub worker_buffer: usize,

    /// Buffer of the flattened event channel feeding the dispatcher.
    pub events_buffer: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            workers: 16,
            worker_buffer: 4,
            events_buffer: 16,
        }
    }
}

impl BotConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the per-worker input buffer.
    pub fn with_worker_buffer(mut self, buffer: usize) -> Self {
        self.worker_buffer = buffer;
        self
    }

    /// Set the event channel buffer.
    pub fn with_events_buffer(mut self, buffer: usize) -> Self {
        self.events_buffer = buffer;
        self
    }

    /// Re-apply the floor on the worker count.
    pub(crate) fn normalized(mut self) -> Self {
        self.workers = self.workers.max(1);
        self
    }
}

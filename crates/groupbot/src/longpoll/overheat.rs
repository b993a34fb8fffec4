//! Failure-burst detection for the update loop.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Mutable detector state, guarded by the detector's lock.
struct State {
    counter: i64,
    first: Option<Instant>,
    last: Option<Instant>,
}

/// A failure-burst circuit breaker.
///
/// [`record`](Overheater::record) charges one failure against a budget of
/// `capacity`. While the budget is not overdrawn,
/// [`is_overheated`](Overheater::is_overheated) reports `false`. Once it
/// is overdrawn, the span between the first and the last recorded failure
/// decides: a span shorter than `threshold` trips the breaker and re-arms
/// the budget for the next burst.
///
/// A span of at least `threshold` (failures trickling in slowly) does NOT
/// re-arm the budget: the counter keeps decreasing on every further
/// failure and the span check repeats on every call. Slow failure
/// sequences therefore never trip the breaker and never reset it.
pub struct Overheater {
    capacity: i64,
    threshold: Duration,
    state: Mutex<State>,
}

impl Overheater {
    /// Create a detector tripping on more than `capacity` failures inside
    /// a window shorter than `threshold`.
    pub fn new(threshold: Duration, capacity: u32) -> Self {
        Self {
            capacity: i64::from(capacity),
            threshold,
            state: Mutex::new(State {
                counter: i64::from(capacity),
                first: None,
                last: None,
            }),
        }
    }

    /// Record one failure observed at `at`.
    pub fn record(&self, at: Instant) {
        let mut state = self.state.lock();
        if state.counter == self.capacity {
            // First failure since the last reset opens the window.
            state.first = Some(at);
            state.counter -= 1;
            return;
        }
        state.last = Some(at);
        state.counter -= 1;
    }

    /// Evaluate the breaker.
    ///
    /// Reports `true` at most once per detected burst; detection re-arms
    /// the failure budget.
    pub fn is_overheated(&self) -> bool {
        let mut state = self.state.lock();
        if state.counter >= 0 {
            return false;
        }

        let (Some(first), Some(last)) = (state.first, state.last) else {
            return false;
        };
        if last.saturating_duration_since(first) < self.threshold {
            state.counter = self.capacity;
            return true;
        }
        false
    }

    /// Current failure budget; negative once overdrawn.
    #[cfg(test)]
    pub(crate) fn counter(&self) -> i64 {
        self.state.lock().counter
    }
}

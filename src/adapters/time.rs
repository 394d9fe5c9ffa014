//! Monotonic clock adapter.
//!
//! Wraps `std::time::Instant`; time is reported relative to construction.

use std::time::{Duration, Instant};

use crate::app::ports::ClockPort;

/// Process-lifetime monotonic clock.
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl ClockPort for MonotonicClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

//! Fill interval statistics.
//!
//! The mean of consecutive deltas over an ordered timestamp sequence
//! telescopes to `(last - first) / (count - 1)`, so only the first and last
//! fill-start times and a count are kept.  Memory stays constant for the
//! life of the process.

use std::time::Duration;

/// Lifetime average of the interval between fill-cycle starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillIntervalTracker {
    first: Option<Duration>,
    last: Option<Duration>,
    count: u64,
}

impl FillIntervalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a fill cycle at monotonic time `at`.
    pub fn record(&mut self, at: Duration) {
        if self.first.is_none() {
            self.first = Some(at);
        }
        self.last = Some(at);
        self.count += 1;
    }

    /// Number of fill starts recorded.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean interval between consecutive fill starts.
    ///
    /// `None` with fewer than two starts recorded.
    pub fn average(&self) -> Option<Duration> {
        match (self.first, self.last) {
            (Some(first), Some(last)) if self.count >= 2 => {
                let span = last.saturating_sub(first);
                Some(span.div_f64((self.count - 1) as f64))
            }
            _ => None,
        }
    }

    /// [`average`](Self::average) in seconds.
    pub fn average_secs(&self) -> Option<f64> {
        self.average().map(|d| d.as_secs_f64())
    }
}

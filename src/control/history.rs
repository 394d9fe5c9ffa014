//! Rolling flow history.
//!
//! Fixed-capacity ring of the most recent flow samples, stack-allocated via
//! [`heapless::HistoryBuffer`].  Statistics are only reported once the ring
//! is full; a partially filled window would bias the setpoint adapter.

use heapless::HistoryBuffer;

/// Number of samples in the rolling window.
pub const FLOW_HISTORY_LEN: usize = 20;

/// Rolling window of flow samples (L/min).
pub struct FlowHistory {
    samples: HistoryBuffer<f64, FLOW_HISTORY_LEN>,
}

impl Default for FlowHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowHistory {
    pub fn new() -> Self {
        Self {
            samples: HistoryBuffer::new(),
        }
    }

    /// Append a sample, evicting the oldest once full.
    pub fn push(&mut self, flow: f64) {
        self.samples.write(flow);
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == FLOW_HISTORY_LEN
    }

    /// Rolling mean, `None` until the window is full.
    pub fn average(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        let sum: f64 = self.samples.as_slice().iter().sum();
        Some(sum / FLOW_HISTORY_LEN as f64)
    }

    /// Rolling maximum, `None` until the window is full.
    pub fn max(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        self.samples
            .as_slice()
            .iter()
            .copied()
            .reduce(f64::max)
    }
}

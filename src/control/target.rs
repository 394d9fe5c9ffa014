//! Slow setpoint adaptation above the flow regulator.
//!
//! The proportional regulator alone settles with a steady offset.  Once per
//! cycle (after the flow history is full) the setpoint is nudged by one
//! step so that the rolling-average flow drifts back inside the tolerance
//! band.

use crate::config::SystemConfig;

/// Target flow adapter
#[derive(Debug, Clone)]
pub struct TargetAdapter {
    target: f64,
    min: f64,
    max: f64,
    step: f64,
    band_low: f64,
    band_high: f64,
}

impl TargetAdapter {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            target: config.target_initial.clamp(config.target_min, config.target_max),
            min: config.target_min,
            max: config.target_max,
            step: config.target_step,
            band_low: config.band_low,
            band_high: config.band_high,
        }
    }

    /// Adjust the setpoint from the rolling-average flow and return it.
    pub fn adapt(&mut self, avg_flow: f64) -> f64 {
        if avg_flow < self.band_low {
            self.target = (self.target + self.step).min(self.max);
        } else if avg_flow > self.band_high {
            self.target = (self.target - self.step).max(self.min);
        }
        self.target
    }

    /// Current flow setpoint (L/min).
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Take new limits from `config`, keeping the current setpoint
    /// (clamped into the new range).
    pub fn reconfigure(&mut self, config: &SystemConfig) {
        let target = self.target;
        *self = Self::from_config(config);
        self.target = target.clamp(self.min, self.max);
    }
}

//! Incremental proportional regulator for the discharge flow valve
//!
//! Each cycle nudges the previous valve command by `gain × error` rather
//! than recomputing it from zero, so the valve position carries over
//! between cycles without explicit integral state.

use crate::config::SystemConfig;

/// Flow regulator
#[derive(Debug, Clone)]
pub struct FlowRegulator {
    gain: f64,
    deadband: f64,
    /// Command assumed when the valve has never been written.
    start: u16,
    output_max: u16,
}

impl FlowRegulator {
    pub fn new(gain: f64, deadband: f64, start: u16, output_max: u16) -> Self {
        Self {
            gain,
            deadband,
            start: start.min(output_max),
            output_max,
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(
            config.regulator_gain,
            config.regulator_deadband,
            config.regulator_start,
            config.valve_max,
        )
    }

    /// Compute the next valve command.
    ///
    /// `last` is the last command written to the valve, `None` if it has
    /// never been written.  Inside the deadband the previous command is
    /// returned unchanged; the caller's write cache then suppresses the
    /// bus write.
    pub fn command(&self, measured_flow: f64, target_flow: f64, last: Option<u16>) -> u16 {
        let previous = last.unwrap_or(self.start).min(self.output_max);
        let error = target_flow - measured_flow;

        if !error.is_finite() || error.abs() < self.deadband {
            return previous;
        }

        // Truncate toward zero: a correction under one count is no correction.
        // Representation noise (2.0 - 1.8 = 0.1999..) is rounded off first.
        let step = ((self.gain * error * 1e6).round() / 1e6).trunc();
        let next = (f64::from(previous) + step).clamp(0.0, f64::from(self.output_max));
        next as u16
    }
}

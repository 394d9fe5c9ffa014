//! System configuration parameters
//!
//! All tunable parameters for the coolant tank controller.  Defaults match
//! the commissioned plant; values can be overridden from a JSON file or
//! replaced at runtime through [`AppCommand::UpdateConfig`](crate::app::commands::AppCommand).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Timing ---
    /// Poll cycle period (milliseconds)
    pub poll_interval_ms: u64,
    /// Delay between opening a valve and starting its pump (milliseconds)
    pub pump_start_delay_ms: u64,

    // --- Level hysteresis (tank units, 0–10 nominal) ---
    /// Start filling below this level
    pub level_low: f64,
    /// Stop filling at or above this level
    pub level_high: f64,

    // --- Register map ---
    /// Raw register value per engineering unit
    pub register_scale: f64,
    /// First of the two consecutive measurement input registers (level, flow)
    pub measurement_base: u16,
    /// First of the four consecutive actuator coils
    /// (fill valve, fill pump, discharge valve, discharge pump)
    pub coil_base: u16,
    /// Holding register for the fill modulating-flow command
    pub fill_flow_register: u16,
    /// Holding register for the discharge modulating-flow command
    pub disch_flow_register: u16,

    // --- Flow setpoint adaptation (L/min) ---
    pub target_initial: f64,
    pub target_min: f64,
    pub target_max: f64,
    /// Setpoint change per adaptation cycle
    pub target_step: f64,
    /// Rolling-average tolerance band
    pub band_low: f64,
    pub band_high: f64,

    // --- Flow regulator ---
    /// Proportional gain (valve counts per L/min of error)
    pub regulator_gain: f64,
    /// Error magnitude below which the valve command is held
    pub regulator_deadband: f64,
    /// Valve command assumed when none has been written yet
    pub regulator_start: u16,
    /// Full-scale modulating valve command
    pub valve_max: u16,
    /// Fill valve command asserted on fill entry
    pub fill_valve_command: u16,

    // --- Field bus ---
    pub bus: BusConfig,
}

/// Field-device connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: "192.168.0.149".into(),
            port: 502,
            unit_id: 1,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Timing
            poll_interval_ms: 1000,    // 1 Hz
            pump_start_delay_ms: 3000, // pump lags valve by 3 s

            // Level hysteresis
            level_low: 3.0,
            level_high: 10.0,

            // Register map
            register_scale: 100.0,
            measurement_base: 0,
            coil_base: 0,
            fill_flow_register: 0,
            disch_flow_register: 1,

            // Setpoint adaptation
            target_initial: 2.0,
            target_min: 1.8,
            target_max: 2.2,
            target_step: 0.01,
            band_low: 1.95,
            band_high: 2.05,

            // Regulator
            regulator_gain: 100.0,
            regulator_deadband: 0.01,
            regulator_start: 500,
            valve_max: 1000,
            fill_valve_command: 1000,

            bus: BusConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Poll period as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Pump soft-start delay as a [`Duration`].
    pub fn pump_start_delay(&self) -> Duration {
        Duration::from_millis(self.pump_start_delay_ms)
    }

    /// Reject inconsistent parameter sets.
    ///
    /// Values are never clamped into range here: a bad file or a bad runtime
    /// update is refused as a whole.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll_interval_ms must be > 0"));
        }
        if !(self.level_low < self.level_high) {
            return Err(ConfigError::ValidationFailed("level_low must be below level_high"));
        }
        if !(self.register_scale > 0.0) {
            return Err(ConfigError::ValidationFailed("register_scale must be > 0"));
        }
        if !(self.target_min <= self.target_initial && self.target_initial <= self.target_max) {
            return Err(ConfigError::ValidationFailed(
                "target_initial must lie within [target_min, target_max]",
            ));
        }
        if !(self.target_step > 0.0) {
            return Err(ConfigError::ValidationFailed("target_step must be > 0"));
        }
        if !(self.band_low <= self.band_high)
            || self.band_low < self.target_min
            || self.band_high > self.target_max
        {
            return Err(ConfigError::ValidationFailed(
                "tolerance band must be ordered and inside the target range",
            ));
        }
        if !(self.regulator_deadband >= 0.0) || !self.regulator_gain.is_finite() {
            return Err(ConfigError::ValidationFailed(
                "regulator gain must be finite and deadband non-negative",
            ));
        }
        if self.regulator_start > self.valve_max || self.fill_valve_command > self.valve_max {
            return Err(ConfigError::ValidationFailed(
                "valve commands must not exceed valve_max",
            ));
        }
        if self.disch_flow_register == self.fill_flow_register {
            return Err(ConfigError::ValidationFailed(
                "fill and discharge flow registers must differ",
            ));
        }
        Ok(())
    }
}

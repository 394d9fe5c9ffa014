//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to.  It contains the latest measurement, the desired actuator
//! outputs, the operator enable, configuration, and the fill bookkeeping
//! that only the state handlers mutate.  Think of it as the "blackboard"
//! in a blackboard architecture.

use std::time::Duration;

use crate::config::SystemConfig;
use crate::control::deferred::DeferredStarts;
use crate::control::fill::FillIntervalTracker;

// ---------------------------------------------------------------------------
// Measurement (read-only to state handlers; written by the poll cycle)
// ---------------------------------------------------------------------------

/// One (level, flow) sample from the field device.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurement {
    /// Tank level (tank units, 0.0–10.0 nominal).
    pub level: f64,
    /// Discharge flow (L/min).
    pub flow: f64,
}

impl Measurement {
    /// Scale raw register values to engineering units.
    ///
    /// Values are divided by `scale` and rounded to 0.1, the resolution
    /// the plant instruments are trusted to.
    pub fn from_raw(level_raw: u16, flow_raw: u16, scale: f64) -> Self {
        Self {
            level: round_tenth(f64::from(level_raw) / scale),
            flow: round_tenth(f64::from(flow_raw) / scale),
        }
    }
}

fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Actuator command (written by state handlers; applied by the service)
// ---------------------------------------------------------------------------

/// Desired state of every controllable output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub fill_valve: bool,
    pub fill_pump: bool,
    pub disch_valve: bool,
    pub disch_pump: bool,
    /// Fill modulating-flow command (0–1000).
    pub fill_position: u16,
    /// Discharge modulating-flow command (0–1000).
    pub disch_position: u16,
}

impl ActuatorCommand {
    /// All actuators off, both valves closed.
    pub fn all_off() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Monotonic time of the current cycle.
    pub now: Duration,

    // -- Inputs --
    /// Latest measurement.  Updated before each FSM tick.
    pub sample: Measurement,
    /// Operator enable.  Only operator commands change it.
    pub enabled: bool,

    // -- Outputs --
    /// Desired outputs, applied to the bus after the FSM tick.
    pub commands: ActuatorCommand,
    /// Set when a handler wants every output forced off before
    /// `commands` is applied.  Cleared by the service once applied.
    pub full_stop: bool,
    /// Pending pump soft-starts.
    pub starts: DeferredStarts,

    // -- Fill bookkeeping --
    pub fill_intervals: FillIntervalTracker,
    /// Last published average fill interval (seconds).
    pub avg_fill_interval_secs: Option<f64>,

    // -- Configuration --
    pub config: SystemConfig,
}

impl FsmContext {
    /// Create a new context with the given configuration.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            now: Duration::ZERO,
            sample: Measurement::default(),
            enabled: false,
            commands: ActuatorCommand::all_off(),
            full_stop: false,
            starts: DeferredStarts::new(config.pump_start_delay()),
            fill_intervals: FillIntervalTracker::new(),
            avg_fill_interval_secs: None,
            config,
        }
    }

    /// Force every output off and cancel pending pump starts.
    ///
    /// Handlers may set individual outputs again afterwards; the stop is
    /// still written to the bus first.
    pub fn request_full_stop(&mut self) {
        self.commands = ActuatorCommand::all_off();
        self.full_stop = true;
        self.starts.cancel_all();
    }
}

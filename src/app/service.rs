//! Application service, the hexagonal core.
//!
//! [`AppService`] owns the FSM, the controller context, the write cache and
//! the discharge loop (rolling history, setpoint adapter, regulator).  It is
//! hardware-agnostic: the bus and the display are injected at call sites as
//! port implementations, making the entire service testable with mocks.
//!
//! ```text
//!  Measurement ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                  │          AppService           │
//! RegisterPort ◀── │ FSM · Regulator · Outputs     │
//!                  └──────────────────────────────┘
//! ```
//!
//! One control cycle, in order:
//!
//! 1. FSM tick (operator stop, fill hysteresis).
//! 2. Full stop written, if any handler requested one.
//! 3. Discharge valve asserted, discharge pump start armed.
//! 4. Due pump starts asserted.
//! 5. Flow history updated (setpoint adapted once it is full), then the regulator run.
//! 6. Remaining command differences written.
//! 7. Events emitted.

use std::time::Duration;

use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::control::deferred::Pump;
use crate::control::history::FlowHistory;
use crate::control::regulator::FlowRegulator;
use crate::control::target::TargetAdapter;
use crate::fsm::context::{FsmContext, Measurement};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, Mode, StateId};
use crate::outputs::{AddressMap, Coil, Outputs, Register};

use super::commands::AppCommand;
use super::events::{AppEvent, DisplaySnapshot};
use super::ports::{ConfigError, EventSink, RegisterPort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    outputs: Outputs,
    history: FlowHistory,
    target: TargetAdapter,
    regulator: FlowRegulator,
    cycle_count: u64,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: SystemConfig) -> Self {
        let outputs = Outputs::new(AddressMap::from_config(&config));
        let target = TargetAdapter::from_config(&config);
        let regulator = FlowRegulator::from_config(&config);
        let ctx = FsmContext::new(config);
        let fsm = Fsm::new(build_state_table(), StateId::Disabled);

        Self {
            fsm,
            ctx,
            outputs,
            history: FlowHistory::new(),
            target,
            regulator,
            cycle_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the FSM in `Disabled` and drive every output to its safe state.
    pub fn start(&mut self, bus: &mut impl RegisterPort, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        self.flush(bus);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("AppService started in {:?}", self.fsm.current_state());
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one control cycle on a freshly read sample.
    ///
    /// `now` is monotonic time from the injected clock.  Must only be called
    /// with a valid sample; a failed read skips the call entirely.
    pub fn control_cycle(
        &mut self,
        sample: Measurement,
        now: Duration,
        bus: &mut impl RegisterPort,
        sink: &mut impl EventSink,
    ) {
        self.cycle_count += 1;
        let prev_state = self.fsm.current_state();

        self.ctx.sample = sample;
        self.ctx.now = now;

        // 1–2. Mode logic, then any stop it requested goes out first.
        self.fsm.tick(&mut self.ctx);
        self.write_pending_stop(bus);

        if self.ctx.enabled {
            // 3–4. Discharge runs in every enabled mode.
            self.ctx.commands.disch_valve = true;
            if !self.ctx.commands.disch_pump {
                self.ctx.starts.schedule(Pump::Discharge, now);
            }
            for pump in self.ctx.starts.take_due(now) {
                info!("{:?} pump start delay elapsed", pump);
                match pump {
                    Pump::Fill => self.ctx.commands.fill_pump = true,
                    Pump::Discharge => self.ctx.commands.disch_pump = true,
                }
            }

            // 5. Rolling statistics drive the setpoint and the valve.
            self.regulate_discharge(sample.flow);
        }

        // 6.
        self.outputs.apply(bus, &self.ctx.commands);

        // 7.
        let state = self.fsm.current_state();
        if state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: state,
            });
            if prev_state == StateId::Filling && state == StateId::Idle {
                if let Some(avg_secs) = self.ctx.avg_fill_interval_secs {
                    sink.emit(&AppEvent::FillIntervalPublished { avg_secs });
                }
            }
        }
        sink.emit(&AppEvent::Snapshot(self.snapshot()));

        debug!(
            "cycle {}: {:?} level={:.1} flow={:.1} target={:.2} valve={:?}",
            self.cycle_count,
            state,
            sample.level,
            sample.flow,
            self.target.target(),
            self.outputs.register(Register::DischFlow)
        );
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an operator command.
    ///
    /// Disabling takes effect on the bus immediately, not on the next cycle.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        bus: &mut impl RegisterPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            AppCommand::ToggleSystem => {
                let enabled = !self.ctx.enabled;
                self.set_enabled(enabled, bus, sink);
            }
            AppCommand::SetEnabled(enabled) => self.set_enabled(enabled, bus, sink),
            AppCommand::UpdateConfig(config) => {
                if let Err(e) = self.update_config(*config) {
                    warn!("Configuration update rejected: {}", e);
                    let reason = match e {
                        ConfigError::ValidationFailed(reason) => reason,
                        _ => "invalid configuration",
                    };
                    sink.emit(&AppEvent::ConfigRejected(reason));
                }
            }
            AppCommand::Shutdown => {
                // Handled by the poll loop.
            }
        }
    }

    fn set_enabled(&mut self, enabled: bool, bus: &mut impl RegisterPort, sink: &mut impl EventSink) {
        if self.ctx.enabled == enabled {
            debug!("System already {}", if enabled { "enabled" } else { "disabled" });
            return;
        }

        let prev = self.fsm.current_state();
        self.ctx.enabled = enabled;
        let next = if enabled { StateId::Idle } else { StateId::Disabled };
        self.fsm.force_transition(next, &mut self.ctx);

        if !enabled {
            self.flush(bus);
        }

        info!("System {}", if enabled { "STARTED" } else { "STOPPED" });
        sink.emit(&AppEvent::SystemToggled { enabled });
        if prev != next {
            sink.emit(&AppEvent::StateChanged { from: prev, to: next });
        }
    }

    /// Validate and install a new configuration.
    ///
    /// The current flow setpoint, fill statistics and write cache survive
    /// unless the address map changed.
    pub fn update_config(&mut self, config: SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;

        self.regulator = FlowRegulator::from_config(&config);
        self.target.reconfigure(&config);
        self.ctx.starts.set_delay(config.pump_start_delay());
        self.outputs.set_address_map(AddressMap::from_config(&config));
        self.ctx.config = config;
        info!("Configuration updated at runtime");
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a display snapshot from the current context.
    pub fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            state: self.fsm.current_state(),
            enabled: self.ctx.enabled,
            level: self.ctx.sample.level,
            flow: self.ctx.sample.flow,
            valve_command: self.outputs.register(Register::DischFlow),
            target_flow: self.target.target(),
            max_flow: self.history.max(),
            avg_flow: self.history.average(),
            avg_fill_interval_secs: self.ctx.avg_fill_interval_secs,
            fill_valve: self.outputs.coil(Coil::FillValve),
            fill_pump: self.outputs.coil(Coil::FillPump),
            disch_valve: self.outputs.coil(Coil::DischValve),
            disch_pump: self.outputs.coil(Coil::DischPump),
        }
    }

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Current fill sub-mode.
    pub fn mode(&self) -> Mode {
        self.fsm.current_state().mode()
    }

    pub fn is_enabled(&self) -> bool {
        self.ctx.enabled
    }

    /// Current flow setpoint (L/min).
    pub fn target_flow(&self) -> f64 {
        self.target.target()
    }

    /// Whether a soft-start is waiting for `pump`.
    pub fn start_pending(&self, pump: Pump) -> bool {
        self.ctx.starts.is_pending(pump)
    }

    /// Write cache and bus write counters.
    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    /// Successful control cycles since startup.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// The live configuration.
    pub fn config(&self) -> &SystemConfig {
        &self.ctx.config
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> SystemConfig {
        self.ctx.config.clone()
    }

    // ── Internal ──────────────────────────────────────────────

    fn regulate_discharge(&mut self, flow: f64) {
        self.history.push(flow);
        // The setpoint only moves on a full window; the valve follows every cycle.
        let target = match self.history.average() {
            Some(avg) => self.target.adapt(avg),
            None => self.target.target(),
        };
        let last = self.outputs.register(Register::DischFlow);
        self.ctx.commands.disch_position = self.regulator.command(flow, target, last);
    }

    fn write_pending_stop(&mut self, bus: &mut impl RegisterPort) {
        if self.ctx.full_stop {
            self.outputs.stop_all(bus);
            self.ctx.full_stop = false;
        }
    }

    fn flush(&mut self, bus: &mut impl RegisterPort) {
        self.write_pending_stop(bus);
        self.outputs.apply(bus, &self.ctx.commands);
    }
}

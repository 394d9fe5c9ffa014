//! Poll cycle: the fixed-period driver.
//!
//! Each tick reads the two measurement registers in one transaction and,
//! only if that succeeds, runs one control cycle on the sample.  A failed
//! read skips the tick: nothing is written, nothing is displayed, and the
//! next tick simply tries again.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;

use log::{debug, info, warn};

use crate::app::commands::AppCommand;
use crate::app::ports::{ClockPort, EventSink, RegisterPort};
use crate::app::service::AppService;
use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::fsm::context::Measurement;

/// Number of consecutive measurement registers (level, flow).
const MEASUREMENT_REGISTERS: usize = 2;

/// Read and scale one (level, flow) sample.
pub fn read_measurement(bus: &mut impl RegisterPort, config: &SystemConfig) -> Result<Measurement> {
    let mut raw = [0u16; MEASUREMENT_REGISTERS];
    bus.read_input_registers(config.measurement_base, &mut raw)?;
    Ok(Measurement::from_raw(raw[0], raw[1], config.register_scale))
}

/// What happened on one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The sample was read and fed to the controller.
    Controlled(Measurement),
    /// The read failed; the controller was not invoked.
    Skipped(Error),
}

/// Owns the service and every adapter it talks to.
pub struct PollCycle<B, S, C> {
    app: AppService,
    bus: B,
    sink: S,
    clock: C,
    skipped: u64,
}

impl<B, S, C> PollCycle<B, S, C>
where
    B: RegisterPort,
    S: EventSink,
    C: ClockPort,
{
    /// Wire the adapters to `app` and start it (outputs driven to safe state).
    pub fn new(mut app: AppService, mut bus: B, mut sink: S, clock: C) -> Self {
        app.start(&mut bus, &mut sink);
        Self {
            app,
            bus,
            sink,
            clock,
            skipped: 0,
        }
    }

    /// Run a single tick.
    pub fn tick(&mut self) -> TickOutcome {
        match read_measurement(&mut self.bus, self.app.config()) {
            Ok(sample) => {
                let now = self.clock.now();
                self.app
                    .control_cycle(sample, now, &mut self.bus, &mut self.sink);
                TickOutcome::Controlled(sample)
            }
            Err(e) => {
                self.skipped += 1;
                warn!("Measurement read failed, skipping tick: {}", e);
                TickOutcome::Skipped(e)
            }
        }
    }

    /// Forward an operator command to the service.
    pub fn handle_command(&mut self, cmd: AppCommand) {
        self.app.handle_command(cmd, &mut self.bus, &mut self.sink);
    }

    /// Tick at the configured period until [`AppCommand::Shutdown`] arrives.
    ///
    /// Pending commands are drained before every tick.  A disconnected
    /// command channel does not stop the loop.
    pub fn run(&mut self, commands: &Receiver<AppCommand>) {
        info!(
            "Poll loop running every {} ms",
            self.app.config().poll_interval_ms
        );
        let mut inbox_open = true;

        loop {
            let started = self.clock.now();

            while inbox_open {
                match commands.try_recv() {
                    Ok(AppCommand::Shutdown) => {
                        info!("Shutdown requested");
                        return;
                    }
                    Ok(cmd) => self.handle_command(cmd),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        debug!("Command channel closed");
                        inbox_open = false;
                    }
                }
            }

            self.tick();

            let period = self.app.config().poll_interval();
            let elapsed = self.clock.now().saturating_sub(started);
            match period.checked_sub(elapsed) {
                Some(remaining) => thread::sleep(remaining),
                None => debug!("Tick overran period by {:?}", elapsed - period),
            }
        }
    }

    pub fn app(&self) -> &AppService {
        &self.app
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Ticks skipped because the measurement read failed.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped
    }
}

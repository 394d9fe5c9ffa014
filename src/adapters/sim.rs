//! Simulated tank adapter.
//!
//! An in-memory register bank with a crude first-order tank model behind
//! it, so the controller can run end-to-end without a field device.  The
//! plant advances one step per measurement read.
//!
//! - Fill valve and fill pump on: level rises with the fill command.
//! - Discharge valve and pump on: flow settles toward
//!   `max_flow * command / 1000` and drains the tank.

use log::debug;

use crate::app::ports::RegisterPort;
use crate::config::SystemConfig;
use crate::error::BusError;
use crate::outputs::{AddressMap, Coil};

/// Tank units gained per step at full fill command.
const FILL_RATE: f64 = 0.5;
/// Tank units lost per step per L/min of discharge.
const DRAIN_RATE: f64 = 0.02;
/// Discharge flow at full valve command (L/min).
const MAX_FLOW: f64 = 4.0;
/// Fraction of the flow error closed each step.
const FLOW_LAG: f64 = 0.5;
const LEVEL_MAX: f64 = 10.0;

pub struct SimulatedTank {
    map: AddressMap,
    measurement_base: u16,
    scale: f64,
    level: f64,
    flow: f64,
    coils: [bool; 4],
    fill_command: u16,
    disch_command: u16,
    fail_reads: u32,
    steps: u64,
}

impl SimulatedTank {
    /// A tank at `level` with every actuator off.
    pub fn new(config: &SystemConfig, level: f64) -> Self {
        Self {
            map: AddressMap::from_config(config),
            measurement_base: config.measurement_base,
            scale: config.register_scale,
            level: level.clamp(0.0, LEVEL_MAX),
            flow: 0.0,
            coils: [false; 4],
            fill_command: 0,
            disch_command: 0,
            fail_reads: 0,
            steps: 0,
        }
    }

    /// Make the next `n` measurement reads fail with a transport error.
    pub fn fail_next_reads(&mut self, n: u32) {
        self.fail_reads = n;
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn flow(&self) -> f64 {
        self.flow
    }

    pub fn set_level(&mut self, level: f64) {
        self.level = level.clamp(0.0, LEVEL_MAX);
    }

    pub fn coil(&self, coil: Coil) -> bool {
        self.coils[coil.index()]
    }

    pub fn fill_command(&self) -> u16 {
        self.fill_command
    }

    pub fn disch_command(&self) -> u16 {
        self.disch_command
    }

    /// Plant steps simulated so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn coil_index(&self, address: u16) -> Option<usize> {
        let index = address.checked_sub(self.map.coil_base)? as usize;
        (index < self.coils.len()).then_some(index)
    }

    fn step(&mut self) {
        self.steps += 1;
        let [fill_valve, fill_pump, disch_valve, disch_pump] = self.coils;

        if fill_valve && fill_pump {
            self.level += FILL_RATE * f64::from(self.fill_command) / 1000.0;
        }

        let flow_target = if disch_valve && disch_pump {
            MAX_FLOW * f64::from(self.disch_command) / 1000.0
        } else {
            0.0
        };
        self.flow += (flow_target - self.flow) * FLOW_LAG;
        self.level -= self.flow * DRAIN_RATE;
        self.level = self.level.clamp(0.0, LEVEL_MAX);

        debug!("sim: level={:.2} flow={:.2}", self.level, self.flow);
    }

    fn raw(&self, value: f64) -> u16 {
        (value * self.scale).round().clamp(0.0, f64::from(u16::MAX)) as u16
    }
}

impl RegisterPort for SimulatedTank {
    fn read_input_registers(&mut self, address: u16, buf: &mut [u16]) -> Result<(), BusError> {
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(BusError::Transport("simulated read failure".into()));
        }
        if address != self.measurement_base || buf.len() > 2 {
            return Err(BusError::Exception("illegal data address".into()));
        }

        self.step();
        let values = [self.raw(self.level), self.raw(self.flow)];
        buf.copy_from_slice(&values[..buf.len()]);
        Ok(())
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), BusError> {
        if address == self.map.fill_flow_register {
            self.fill_command = value;
        } else if address == self.map.disch_flow_register {
            self.disch_command = value;
        } else {
            return Err(BusError::Exception("illegal data address".into()));
        }
        Ok(())
    }

    fn write_coil(&mut self, address: u16, value: bool) -> Result<(), BusError> {
        let index = self
            .coil_index(address)
            .ok_or_else(|| BusError::Exception("illegal data address".into()))?;
        self.coils[index] = value;
        Ok(())
    }

    fn write_coils(&mut self, address: u16, values: &[bool]) -> Result<(), BusError> {
        let start = self
            .coil_index(address)
            .filter(|&i| i + values.len() <= self.coils.len())
            .ok_or_else(|| BusError::Exception("illegal data address".into()))?;
        self.coils[start..start + values.len()].copy_from_slice(values);
        Ok(())
    }
}

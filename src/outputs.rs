//! Actuator outputs and the last-written cache.
//!
//! Every coil and holding register the controller drives goes through
//! [`Outputs`].  A value is only sent when it differs from the last value
//! the bus *accepted* for that address; a failed write leaves the cache
//! untouched so the next cycle offers the same value again.

use log::{debug, warn};

use crate::app::ports::RegisterPort;
use crate::config::SystemConfig;
use crate::fsm::context::ActuatorCommand;

/// The four on/off actuators, in coil order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coil {
    FillValve,
    FillPump,
    DischValve,
    DischPump,
}

impl Coil {
    pub const ALL: [Coil; 4] = [
        Coil::FillValve,
        Coil::FillPump,
        Coil::DischValve,
        Coil::DischPump,
    ];

    /// Offset from the coil base address.
    pub fn index(self) -> usize {
        match self {
            Self::FillValve => 0,
            Self::FillPump => 1,
            Self::DischValve => 2,
            Self::DischPump => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FillValve => "fill valve",
            Self::FillPump => "fill pump",
            Self::DischValve => "discharge valve",
            Self::DischPump => "discharge pump",
        }
    }
}

/// The two modulating valve command registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    FillFlow,
    DischFlow,
}

impl Register {
    fn index(self) -> usize {
        match self {
            Self::FillFlow => 0,
            Self::DischFlow => 1,
        }
    }
}

/// Bus addresses of every output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressMap {
    pub coil_base: u16,
    pub fill_flow_register: u16,
    pub disch_flow_register: u16,
}

impl AddressMap {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            coil_base: config.coil_base,
            fill_flow_register: config.fill_flow_register,
            disch_flow_register: config.disch_flow_register,
        }
    }

    pub fn coil(&self, coil: Coil) -> u16 {
        self.coil_base + coil.index() as u16
    }

    pub fn register(&self, register: Register) -> u16 {
        match register {
            Register::FillFlow => self.fill_flow_register,
            Register::DischFlow => self.disch_flow_register,
        }
    }
}

/// Write-suppressing view of the actuator outputs.
pub struct Outputs {
    map: AddressMap,
    coils: [Option<bool>; 4],
    registers: [Option<u16>; 2],
    writes: u64,
    failed_writes: u64,
}

impl Outputs {
    pub fn new(map: AddressMap) -> Self {
        Self {
            map,
            coils: [None; 4],
            registers: [None; 2],
            writes: 0,
            failed_writes: 0,
        }
    }

    /// Drive one coil.  Returns `true` if a write reached the bus.
    pub fn set_coil(&mut self, bus: &mut impl RegisterPort, coil: Coil, on: bool) -> bool {
        if self.coils[coil.index()] == Some(on) {
            return false;
        }
        let address = self.map.coil(coil);
        match bus.write_coil(address, on) {
            Ok(()) => {
                debug!("coil {} ({}) <- {}", address, coil.label(), on);
                self.coils[coil.index()] = Some(on);
                self.writes += 1;
                true
            }
            Err(e) => {
                warn!("write {} (coil {}) failed: {}", coil.label(), address, e);
                self.failed_writes += 1;
                false
            }
        }
    }

    /// Drive one valve command register.  Returns `true` if a write reached the bus.
    pub fn set_register(&mut self, bus: &mut impl RegisterPort, register: Register, value: u16) -> bool {
        if self.registers[register.index()] == Some(value) {
            return false;
        }
        let address = self.map.register(register);
        match bus.write_register(address, value) {
            Ok(()) => {
                debug!("register {} <- {}", address, value);
                self.registers[register.index()] = Some(value);
                self.writes += 1;
                true
            }
            Err(e) => {
                warn!("write register {} failed: {}", address, e);
                self.failed_writes += 1;
                false
            }
        }
    }

    /// Force every coil off and both valve commands to zero.
    ///
    /// Only outputs not already confirmed off are written.  When all four
    /// coils need changing they go out as one multi-coil transaction.
    pub fn stop_all(&mut self, bus: &mut impl RegisterPort) {
        let stale: heapless::Vec<Coil, 4> = Coil::ALL
            .into_iter()
            .filter(|c| self.coils[c.index()] != Some(false))
            .collect();

        if stale.len() == Coil::ALL.len() {
            match bus.write_coils(self.map.coil_base, &[false; 4]) {
                Ok(()) => {
                    debug!("coils {}..{} <- all off", self.map.coil_base, self.map.coil_base + 3);
                    self.coils = [Some(false); 4];
                    self.writes += 1;
                }
                Err(e) => {
                    warn!("write all coils off failed: {}", e);
                    self.failed_writes += 1;
                }
            }
        } else {
            for coil in stale {
                self.set_coil(bus, coil, false);
            }
        }

        self.set_register(bus, Register::FillFlow, 0);
        self.set_register(bus, Register::DischFlow, 0);
    }

    /// Bring every output in line with `cmd`, coils first.
    pub fn apply(&mut self, bus: &mut impl RegisterPort, cmd: &ActuatorCommand) {
        self.set_coil(bus, Coil::FillValve, cmd.fill_valve);
        self.set_coil(bus, Coil::FillPump, cmd.fill_pump);
        self.set_register(bus, Register::FillFlow, cmd.fill_position);
        self.set_coil(bus, Coil::DischValve, cmd.disch_valve);
        self.set_coil(bus, Coil::DischPump, cmd.disch_pump);
        self.set_register(bus, Register::DischFlow, cmd.disch_position);
    }

    /// Last value the bus accepted for `coil` (off if never written).
    pub fn coil(&self, coil: Coil) -> bool {
        self.coils[coil.index()].unwrap_or(false)
    }

    /// Last value the bus accepted for `register`, `None` if never written.
    pub fn register(&self, register: Register) -> Option<u16> {
        self.registers[register.index()]
    }

    /// Total successful bus writes.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Total rejected bus writes.
    pub fn failed_write_count(&self) -> u64 {
        self.failed_writes
    }

    pub fn set_address_map(&mut self, map: AddressMap) {
        if map != self.map {
            // New addresses: nothing is known about what they hold.
            self.coils = [None; 4];
            self.registers = [None; 2];
            self.map = map;
        }
    }
}

//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the coolant tank: mode
//! sequencing, flow regulation, setpoint adaptation and fill statistics.
//! All interaction with the field device happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without a bus.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;

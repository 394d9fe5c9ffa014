//! Coolant tank controller library.
//!
//! Exposes the pure-logic modules (FSM, regulator, setpoint adaptation,
//! write cache) together with the adapters the binary wires to them.
//! Everything that touches a bus, a clock or a display sits behind a
//! port trait in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod fsm;
pub mod outputs;
pub mod poll;

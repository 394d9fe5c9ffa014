//! Unified error types for the coolant controller.
//!
//! Bus failures are the only errors the control loop ever sees at runtime;
//! they are tolerated by skipping a tick, never escalated.  Configuration
//! errors only occur at startup or on a runtime config update.

use core::fmt;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the library funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The register bus failed a read or write.
    Bus(BusError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// A single register-bus transaction failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The transport (socket, serial line) failed or timed out.
    Transport(String),
    /// The device answered with a protocol exception.
    Exception(String),
    /// The device returned fewer registers than requested.
    ShortRead { expected: usize, got: usize },
    /// No connection to the device is available.
    NotConnected,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Exception(code) => write!(f, "device exception: {code}"),
            Self::ShortRead { expected, got } => {
                write!(f, "short read: expected {expected} registers, got {got}")
            }
            Self::NotConnected => write!(f, "not connected"),
        }
    }
}

impl std::error::Error for BusError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

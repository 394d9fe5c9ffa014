//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (register bus, display, config store, clock) implement
//! these traits.  The [`AppService`](super::service::AppService) and the
//! [`PollCycle`](crate::poll::PollCycle) consume them via generics, so the
//! control core never touches a socket directly.

use std::time::Duration;

use crate::config::SystemConfig;
use crate::error::BusError;

// ───────────────────────────────────────────────────────────────
// Register port (driven adapter: field device ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Register-based field bus.
///
/// Every call is one synchronous transaction and may fail transiently.
/// Implementations must not retry internally; the poll cycle decides what
/// a failure means.
pub trait RegisterPort {
    /// Read `buf.len()` consecutive input registers starting at `address`.
    fn read_input_registers(&mut self, address: u16, buf: &mut [u16]) -> Result<(), BusError>;

    /// Write one holding register.
    fn write_register(&mut self, address: u16, value: u16) -> Result<(), BusError>;

    /// Write one coil.
    fn write_coil(&mut self, address: u16, value: bool) -> Result<(), BusError>;

    /// Write consecutive coils starting at `address` in one transaction.
    fn write_coils(&mut self, address: u16, values: &[bool]) -> Result<(), BusError>;
}

impl<P: RegisterPort + ?Sized> RegisterPort for Box<P> {
    fn read_input_registers(&mut self, address: u16, buf: &mut [u16]) -> Result<(), BusError> {
        (**self).read_input_registers(address, buf)
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), BusError> {
        (**self).write_register(address, value)
    }

    fn write_coil(&mut self, address: u16, value: bool) -> Result<(), BusError> {
        (**self).write_coil(address, value)
    }

    fn write_coils(&mut self, address: u16, values: &[bool]) -> Result<(), BusError> {
        (**self).write_coils(address, values)
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → display / logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  It is write-only: nothing an adapter does here can
/// feed back into control.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.
pub trait ClockPort {
    /// Time elapsed since an arbitrary fixed origin (process start).
    fn now(&self) -> Duration;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting and after loading.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations and config validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage.
    NotFound,
    /// Stored config could not be parsed.
    Corrupted(String),
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    Io(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted(msg) => write!(f, "config corrupted: {}", msg),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

//! Inbound commands to the application service.
//!
//! These represent actions requested by the operator (panel button,
//! console) that the [`AppService`](super::service::AppService) interprets
//! and acts upon.

use crate::config::SystemConfig;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Flip the system enable (the START/STOP button).
    ToggleSystem,

    /// Set the system enable explicitly.
    SetEnabled(bool),

    /// Hot-reload configuration.  Rejected if it fails validation.
    UpdateConfig(Box<SystemConfig>),

    /// Stop the poll loop after the current tick.
    Shutdown,
}

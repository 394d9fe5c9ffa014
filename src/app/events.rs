//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to console, update a dashboard,
//! publish to a historian.

use crate::fsm::StateId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Per-cycle display snapshot.
    Snapshot(DisplaySnapshot),

    /// The state machine transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// The operator enabled or disabled the system.
    SystemToggled { enabled: bool },

    /// A fill cycle completed and the average fill interval was updated.
    FillIntervalPublished { avg_secs: f64 },

    /// A runtime configuration update was refused.
    ConfigRejected(&'static str),

    /// The application service has started (carries initial state).
    Started(StateId),
}

/// A point-in-time view of everything the dashboard shows.
///
/// Rolling statistics and the fill interval are `None` until they have
/// been computed at least once.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySnapshot {
    pub state: StateId,
    pub enabled: bool,
    /// Tank level (tank units).
    pub level: f64,
    /// Discharge flow (L/min).
    pub flow: f64,
    /// Last discharge valve command written (0–1000).
    pub valve_command: Option<u16>,
    /// Current flow setpoint (L/min).
    pub target_flow: f64,
    pub max_flow: Option<f64>,
    pub avg_flow: Option<f64>,
    pub avg_fill_interval_secs: Option<f64>,
    pub fill_valve: bool,
    pub fill_pump: bool,
    pub disch_valve: bool,
    pub disch_pump: bool,
}

//! Log-based display adapter.
//!
//! Implements [`EventSink`] by rendering application events as log lines,
//! formatted the way the operator panel shows them.  A GUI or historian
//! adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::{AppEvent, DisplaySnapshot};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

fn or_dash(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "-".into(),
    }
}

/// One display line for a snapshot.
pub fn format_snapshot(s: &DisplaySnapshot) -> String {
    let valve = match s.valve_command {
        Some(v) => format!("{v} / 1000"),
        None => "- / 1000".into(),
    };
    let fill_interval = match s.avg_fill_interval_secs {
        Some(secs) => format!("{secs:.1} sec"),
        None => "-".into(),
    };
    format!(
        "level {:.1} / 10.0 | flow {:.1} L/min | valve {} | target {:.2} | \
         max {} | avg {} | fill interval {} | \
         fill valve {} fill pump {} disch valve {} disch pump {}",
        s.level,
        s.flow,
        valve,
        s.target_flow,
        or_dash(s.max_flow, 1),
        or_dash(s.avg_flow, 2),
        fill_interval,
        on_off(s.fill_valve),
        on_off(s.fill_pump),
        on_off(s.disch_valve),
        on_off(s.disch_pump),
    )
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Snapshot(s) => {
                info!("TANK  | {:?} | {}", s.state, format_snapshot(s));
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::SystemToggled { enabled } => {
                info!("OPER  | system {}", if *enabled { "STARTED" } else { "STOPPED" });
            }
            AppEvent::FillIntervalPublished { avg_secs } => {
                info!("FILL  | average interval {:.1} sec", avg_secs);
            }
            AppEvent::ConfigRejected(reason) => {
                warn!("CONFIG| rejected: {}", reason);
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
        }
    }
}

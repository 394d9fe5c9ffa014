//! Integration tests for the AppService → FSM → outputs pipeline.
//!
//! Samples are fed straight into `control_cycle` with explicit timestamps,
//! and every bus transaction is checked against the recording mock.

use std::time::Duration;

use coolant::app::commands::AppCommand;
use coolant::app::events::AppEvent;
use coolant::app::service::AppService;
use coolant::config::SystemConfig;
use coolant::control::deferred::Pump;
use coolant::control::history::FLOW_HISTORY_LEN;
use coolant::fsm::context::Measurement;
use coolant::fsm::{Mode, StateId};

use crate::mock_bus::{BusCall, RecordingBus, RecordingSink};

const FILL_VALVE: u16 = 0;
const FILL_PUMP: u16 = 1;
const DISCH_VALVE: u16 = 2;
const DISCH_PUMP: u16 = 3;

fn make_app() -> (AppService, RecordingBus, RecordingSink) {
    let mut app = AppService::new(SystemConfig::default());
    let mut bus = RecordingBus::new();
    let mut sink = RecordingSink::new();
    app.start(&mut bus, &mut sink);
    (app, bus, sink)
}

fn enabled_app() -> (AppService, RecordingBus, RecordingSink) {
    let (mut app, mut bus, mut sink) = make_app();
    app.handle_command(AppCommand::SetEnabled(true), &mut bus, &mut sink);
    (app, bus, sink)
}

fn cycle(app: &mut AppService, bus: &mut RecordingBus, sink: &mut RecordingSink, level: f64, flow: f64, t: u64) {
    app.control_cycle(
        Measurement { level, flow },
        Duration::from_secs(t),
        bus,
        sink,
    );
}

fn register_writes(bus: &RecordingBus, address: u16) -> Vec<u16> {
    bus.calls
        .iter()
        .filter_map(|c| match c {
            BusCall::WriteRegister { address: a, value } if *a == address => Some(*value),
            _ => None,
        })
        .collect()
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn startup_drives_every_output_off_in_one_coil_transaction() {
    let (app, bus, sink) = make_app();

    assert_eq!(app.state(), StateId::Disabled);
    assert_eq!(
        bus.calls,
        vec![
            BusCall::WriteCoils {
                address: 0,
                values: vec![false; 4]
            },
            BusCall::WriteRegister { address: 0, value: 0 },
            BusCall::WriteRegister { address: 1, value: 0 },
        ]
    );
    assert!(matches!(sink.events[0], AppEvent::Started(StateId::Disabled)));
}

// ── Fill hysteresis ───────────────────────────────────────────

#[test]
fn low_level_opens_fill_valve_same_tick_and_pump_after_delay() {
    let (mut app, mut bus, mut sink) = enabled_app();
    let mark = bus.calls.len();

    cycle(&mut app, &mut bus, &mut sink, 2.9, 2.0, 10);

    assert_eq!(app.state(), StateId::Filling);
    assert_eq!(app.mode(), Mode::Filling);
    assert_eq!(
        bus.writes_since(mark),
        vec![
            BusCall::WriteCoil {
                address: FILL_VALVE,
                value: true
            },
            BusCall::WriteRegister {
                address: 0,
                value: 1000
            },
            BusCall::WriteCoil {
                address: DISCH_VALVE,
                value: true
            },
        ]
    );
    assert!(!bus.coil(FILL_PUMP));
    assert!(app.start_pending(Pump::Fill));

    cycle(&mut app, &mut bus, &mut sink, 3.5, 2.0, 11);
    cycle(&mut app, &mut bus, &mut sink, 4.0, 2.0, 12);
    assert!(!bus.coil(FILL_PUMP), "pump must lag the valve by the full delay");

    cycle(&mut app, &mut bus, &mut sink, 4.5, 2.0, 13);
    assert!(bus.coil(FILL_PUMP));
    assert!(bus.coil(DISCH_PUMP));
    assert!(!app.start_pending(Pump::Fill));

    let snap = sink.last_snapshot().unwrap();
    assert!(snap.fill_valve && snap.fill_pump && snap.disch_valve && snap.disch_pump);
}

#[test]
fn level_between_thresholds_keeps_current_mode() {
    let (mut app, mut bus, mut sink) = enabled_app();

    cycle(&mut app, &mut bus, &mut sink, 3.0, 2.0, 0);
    assert_eq!(app.state(), StateId::Idle, "3.0 is not below the low threshold");

    cycle(&mut app, &mut bus, &mut sink, 2.9, 2.0, 1);
    cycle(&mut app, &mut bus, &mut sink, 9.9, 2.0, 2);
    assert_eq!(app.state(), StateId::Filling);

    cycle(&mut app, &mut bus, &mut sink, 10.0, 2.0, 3);
    assert_eq!(app.state(), StateId::Idle);

    cycle(&mut app, &mut bus, &mut sink, 5.0, 2.0, 4);
    assert_eq!(app.state(), StateId::Idle);
}

#[test]
fn full_tank_stops_fill_and_restarts_discharge() {
    let (mut app, mut bus, mut sink) = enabled_app();

    cycle(&mut app, &mut bus, &mut sink, 2.0, 2.0, 0);
    for t in 1..=5 {
        cycle(&mut app, &mut bus, &mut sink, 6.0, 2.0, t);
    }
    assert!(bus.coil(FILL_PUMP) && bus.coil(DISCH_PUMP));

    let mark = bus.calls.len();
    cycle(&mut app, &mut bus, &mut sink, 10.0, 2.0, 6);

    assert_eq!(app.state(), StateId::Idle);
    let writes = bus.writes_since(mark);
    assert_eq!(
        writes[0],
        BusCall::WriteCoils {
            address: 0,
            values: vec![false; 4]
        }
    );
    assert!(!bus.coil(FILL_VALVE));
    assert!(!bus.coil(FILL_PUMP));
    assert!(bus.coil(DISCH_VALVE), "discharge valve reasserted after the stop");
    assert!(!bus.coil(DISCH_PUMP));
    assert_eq!(bus.register(0), 0);
    assert!(app.start_pending(Pump::Discharge));

    for t in 7..=9 {
        cycle(&mut app, &mut bus, &mut sink, 9.8, 2.0, t);
    }
    assert!(bus.coil(DISCH_PUMP));
    assert!(!bus.coil(FILL_PUMP));
}

#[test]
fn discharge_runs_while_filling() {
    let (mut app, mut bus, mut sink) = enabled_app();

    cycle(&mut app, &mut bus, &mut sink, 1.0, 0.0, 0);
    assert_eq!(app.state(), StateId::Filling);
    assert!(bus.coil(DISCH_VALVE));
    assert!(app.start_pending(Pump::Discharge));
}

// ── Fill interval statistics ──────────────────────────────────

#[test]
fn second_completed_fill_publishes_interval() {
    let (mut app, mut bus, mut sink) = enabled_app();

    cycle(&mut app, &mut bus, &mut sink, 2.9, 2.0, 100);
    cycle(&mut app, &mut bus, &mut sink, 10.0, 2.0, 150);
    assert!(sink.fill_intervals().is_empty(), "one fill start is not an interval");
    assert_eq!(sink.last_snapshot().unwrap().avg_fill_interval_secs, None);

    cycle(&mut app, &mut bus, &mut sink, 2.5, 2.0, 400);
    cycle(&mut app, &mut bus, &mut sink, 10.0, 2.0, 460);

    assert_eq!(sink.fill_intervals(), vec![300.0]);
    assert_eq!(sink.last_snapshot().unwrap().avg_fill_interval_secs, Some(300.0));
}

#[test]
fn interval_average_spans_whole_history() {
    let (mut app, mut bus, mut sink) = enabled_app();

    for (start, end) in [(0, 20), (100, 130), (400, 420)] {
        cycle(&mut app, &mut bus, &mut sink, 2.0, 2.0, start);
        cycle(&mut app, &mut bus, &mut sink, 10.0, 2.0, end);
    }

    // Deltas 100 and 300.
    assert_eq!(sink.fill_intervals(), vec![100.0, 200.0]);
}

// ── Operator enable ───────────────────────────────────────────

#[test]
fn disable_forces_full_stop_immediately_and_only_once() {
    let (mut app, mut bus, mut sink) = enabled_app();
    cycle(&mut app, &mut bus, &mut sink, 2.9, 2.0, 0);
    cycle(&mut app, &mut bus, &mut sink, 5.0, 2.0, 3);
    assert!(bus.coil(FILL_PUMP) && bus.coil(DISCH_PUMP));

    let mark = bus.calls.len();
    app.handle_command(AppCommand::SetEnabled(false), &mut bus, &mut sink);

    assert_eq!(app.state(), StateId::Disabled);
    assert_eq!(app.mode(), Mode::Idle);
    assert_eq!(
        bus.writes_since(mark),
        vec![
            BusCall::WriteCoils {
                address: 0,
                values: vec![false; 4]
            },
            BusCall::WriteRegister { address: 0, value: 0 },
        ]
    );

    let mark = bus.calls.len();
    for t in 4..10 {
        cycle(&mut app, &mut bus, &mut sink, 2.0, 2.0, t);
    }
    assert!(bus.writes_since(mark).is_empty(), "repeated stops must not reach the bus");
    assert_eq!(app.state(), StateId::Disabled);
}

#[test]
fn disable_cancels_pending_pump_starts() {
    let (mut app, mut bus, mut sink) = enabled_app();
    cycle(&mut app, &mut bus, &mut sink, 2.9, 2.0, 0);
    assert!(app.start_pending(Pump::Fill));

    app.handle_command(AppCommand::SetEnabled(false), &mut bus, &mut sink);
    assert!(!app.start_pending(Pump::Fill));
    assert!(!app.start_pending(Pump::Discharge));

    app.handle_command(AppCommand::SetEnabled(true), &mut bus, &mut sink);
    cycle(&mut app, &mut bus, &mut sink, 5.0, 2.0, 3);
    cycle(&mut app, &mut bus, &mut sink, 5.0, 2.0, 4);

    assert!(!bus.coil(FILL_PUMP), "cancelled start must never fire");
    assert!(!bus.coil(DISCH_PUMP), "discharge was re-armed at t=3");
}

#[test]
fn toggle_flips_enable_and_resets_mode() {
    let (mut app, mut bus, mut sink) = make_app();

    app.handle_command(AppCommand::ToggleSystem, &mut bus, &mut sink);
    assert!(app.is_enabled());
    cycle(&mut app, &mut bus, &mut sink, 1.0, 2.0, 0);
    assert_eq!(app.mode(), Mode::Filling);

    app.handle_command(AppCommand::ToggleSystem, &mut bus, &mut sink);
    assert!(!app.is_enabled());
    assert_eq!(app.mode(), Mode::Idle);

    let toggles: Vec<bool> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::SystemToggled { enabled } => Some(*enabled),
            _ => None,
        })
        .collect();
    assert_eq!(toggles, vec![true, false]);
}

#[test]
fn redundant_enable_is_ignored() {
    let (mut app, mut bus, mut sink) = enabled_app();
    let events = sink.events.len();
    app.handle_command(AppCommand::SetEnabled(true), &mut bus, &mut sink);
    assert_eq!(sink.events.len(), events);
    assert_eq!(app.state(), StateId::Idle);
}

// ── Flow history, setpoint, regulator ─────────────────────────

fn run_constant_flow(flow: f64) -> (AppService, RecordingBus, RecordingSink) {
    let (mut app, mut bus, mut sink) = enabled_app();
    for t in 0..FLOW_HISTORY_LEN as u64 {
        cycle(&mut app, &mut bus, &mut sink, 5.0, flow, t);
    }
    (app, bus, sink)
}

#[test]
fn valve_regulates_before_history_is_full() {
    let (mut app, mut bus, mut sink) = enabled_app();
    for t in 0..(FLOW_HISTORY_LEN as u64 - 1) {
        cycle(&mut app, &mut bus, &mut sink, 5.0, 0.0, t);
    }
    let snap = sink.last_snapshot().unwrap();
    assert_eq!(snap.avg_flow, None);
    assert_eq!(snap.max_flow, None);
    assert!((app.target_flow() - 2.0).abs() < f64::EPSILON);
    // error 2.0 → +200 per cycle from the stopped valve, saturating.
    assert_eq!(register_writes(&bus, 1), vec![0, 200, 400, 600, 800, 1000]);
    assert_eq!(snap.valve_command, Some(1000));
}

#[test]
fn low_average_raises_target() {
    let (app, _bus, sink) = run_constant_flow(1.9);
    assert!((app.target_flow() - 2.01).abs() < 1e-9);
    let snap = sink.last_snapshot().unwrap();
    assert!((snap.avg_flow.unwrap() - 1.9).abs() < 1e-9);
    assert!((snap.max_flow.unwrap() - 1.9).abs() < 1e-9);
}

#[test]
fn high_average_lowers_target() {
    let (app, _bus, _sink) = run_constant_flow(2.1);
    assert!((app.target_flow() - 1.99).abs() < 1e-9);
}

#[test]
fn in_band_average_holds_target() {
    let (app, _bus, _sink) = run_constant_flow(2.0);
    assert!((app.target_flow() - 2.0).abs() < f64::EPSILON);
}

#[test]
fn regulator_integrates_from_last_written_command() {
    let (mut app, mut bus, mut sink) = run_constant_flow(1.8);
    // 19 partial-window cycles at target 2.0 (+20 each), then the window
    // fills: target 2.01, error 0.21 → 380 + 21.
    assert_eq!(bus.register(1), 401);

    cycle(&mut app, &mut bus, &mut sink, 5.0, 1.8, 20);
    // target 2.02, error 0.22 → 401 + 22
    assert_eq!(bus.register(1), 423);

    let mut expected: Vec<u16> = (0..20).map(|i| i * 20).collect();
    expected.extend([401, 423]);
    assert_eq!(register_writes(&bus, 1), expected);
    assert_eq!(sink.last_snapshot().unwrap().valve_command, Some(423));
}

#[test]
fn unchanged_valve_command_written_once() {
    let (mut app, mut bus, mut sink) = enabled_app();
    for t in 0..(FLOW_HISTORY_LEN as u64 - 1) {
        cycle(&mut app, &mut bus, &mut sink, 5.0, 2.0, t);
    }
    // Average stays in band; error 0.1 → +10.
    cycle(&mut app, &mut bus, &mut sink, 5.0, 1.9, FLOW_HISTORY_LEN as u64 - 1);
    assert_eq!(bus.register(1), 10);

    // Inside the deadband the same command is computed again.
    cycle(&mut app, &mut bus, &mut sink, 5.0, 2.0, 20);
    cycle(&mut app, &mut bus, &mut sink, 5.0, 2.0, 21);

    assert_eq!(register_writes(&bus, 1), vec![0, 10]);
    assert_eq!(sink.last_snapshot().unwrap().valve_command, Some(10));
}

#[test]
fn valve_command_never_leaves_range() {
    let (mut app, mut bus, mut sink) = enabled_app();
    for t in 0..200 {
        cycle(&mut app, &mut bus, &mut sink, 5.0, 0.0, t);
    }
    assert_eq!(bus.register(1), 1000);
    for t in 200..400 {
        cycle(&mut app, &mut bus, &mut sink, 5.0, 9.0, t);
    }
    assert_eq!(bus.register(1), 0);
    assert!((1.8..=2.2).contains(&app.target_flow()));
}

// ── Bus write failures ────────────────────────────────────────

#[test]
fn failed_write_is_retried_next_cycle() {
    let (mut app, mut bus, mut sink) = enabled_app();

    bus.fail_writes = true;
    cycle(&mut app, &mut bus, &mut sink, 5.0, 2.0, 0);
    assert!(!bus.coil(DISCH_VALVE));
    assert!(!sink.last_snapshot().unwrap().disch_valve);
    assert_eq!(app.outputs().failed_write_count(), 1);

    bus.fail_writes = false;
    cycle(&mut app, &mut bus, &mut sink, 5.0, 2.0, 1);
    assert!(bus.coil(DISCH_VALVE));

    let attempts = bus
        .calls
        .iter()
        .filter(|c| {
            **c == BusCall::WriteCoil {
                address: DISCH_VALVE,
                value: true,
            }
        })
        .count();
    assert_eq!(attempts, 2);
}

// ── Runtime configuration ─────────────────────────────────────

#[test]
fn config_update_changes_pump_delay() {
    let (mut app, mut bus, mut sink) = enabled_app();
    let faster = SystemConfig {
        pump_start_delay_ms: 1000,
        ..SystemConfig::default()
    };
    app.handle_command(AppCommand::UpdateConfig(Box::new(faster)), &mut bus, &mut sink);

    cycle(&mut app, &mut bus, &mut sink, 2.0, 2.0, 0);
    assert!(!bus.coil(FILL_PUMP));
    cycle(&mut app, &mut bus, &mut sink, 2.5, 2.0, 1);
    assert!(bus.coil(FILL_PUMP));
}

#[test]
fn invalid_config_update_is_reported_and_ignored() {
    let (mut app, mut bus, mut sink) = enabled_app();
    let bad = SystemConfig {
        target_initial: 5.0,
        ..SystemConfig::default()
    };
    app.handle_command(AppCommand::UpdateConfig(Box::new(bad)), &mut bus, &mut sink);

    assert!(matches!(sink.events.last(), Some(AppEvent::ConfigRejected(_))));
    assert_eq!(app.current_config(), SystemConfig::default());
}

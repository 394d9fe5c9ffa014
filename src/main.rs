//! Coolant controller entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  ModbusTcpBus /     LogEventSink   JsonConfigFile  Monotonic-  │
//! │  SimulatedTank      (EventSink)    (ConfigPort)    Clock       │
//! │  (RegisterPort)                                    (ClockPort) │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  FSM · Regulator · Target adapter · Write cache        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  PollCycle (fixed period) ◀── operator commands (stdin)        │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::{Context as _, Result};
use clap::Parser;
use log::{info, warn};
use tracing_subscriber::EnvFilter;

use coolant::adapters::config_file::JsonConfigFile;
use coolant::adapters::log_sink::LogEventSink;
use coolant::adapters::sim::SimulatedTank;
use coolant::adapters::time::MonotonicClock;
use coolant::app::commands::AppCommand;
use coolant::app::ports::{ConfigPort, RegisterPort};
use coolant::app::service::AppService;
use coolant::poll::PollCycle;

#[derive(Parser)]
#[command(name = "coolant")]
#[command(about = "Coolant tank closed-loop controller", long_about = None)]
struct Cli {
    /// JSON configuration file (missing file = defaults)
    #[arg(short, long, default_value = "coolant.json")]
    config: PathBuf,

    /// Run against the in-memory tank model instead of a field device
    #[arg(long)]
    simulate: bool,

    /// Initial tank level for --simulate
    #[arg(long, default_value_t = 5.0)]
    sim_level: f64,

    /// Field device host (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Field device port (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Start with the system enabled
    #[arg(long)]
    enable: bool,
}

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    info!("Coolant controller v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let store = JsonConfigFile::new(&cli.config);
    let mut config = store
        .load()
        .with_context(|| format!("loading {}", store.path().display()))?;
    if let Some(host) = cli.host {
        config.bus.host = host;
    }
    if let Some(port) = cli.port {
        config.bus.port = port;
    }
    config.validate().context("validating configuration")?;

    // ── 3. Operator input ─────────────────────────────────────
    let (tx, rx) = mpsc::channel();
    if cli.enable {
        tx.send(AppCommand::SetEnabled(true))?;
    }
    spawn_operator_console(tx);

    // ── 4. Bus adapter + poll loop ────────────────────────────
    let app = AppService::new(config.clone());

    if cli.simulate {
        info!("Simulation mode, initial level {:.1}", cli.sim_level);
        run(app, SimulatedTank::new(&config, cli.sim_level), &rx);
        return Ok(());
    }

    connect_and_run(app, &config, &rx)
}

#[cfg(feature = "modbus")]
fn connect_and_run(
    app: AppService,
    config: &coolant::config::SystemConfig,
    rx: &Receiver<AppCommand>,
) -> Result<()> {
    let bus = coolant::adapters::modbus::ModbusTcpBus::connect(&config.bus)
        .with_context(|| format!("connecting to {}:{}", config.bus.host, config.bus.port))?;
    run(app, bus, rx);
    Ok(())
}

#[cfg(not(feature = "modbus"))]
fn connect_and_run(
    _app: AppService,
    _config: &coolant::config::SystemConfig,
    _rx: &Receiver<AppCommand>,
) -> Result<()> {
    anyhow::bail!("built without the `modbus` feature; use --simulate")
}

/// Drive the poll loop until the operator quits, then stop everything.
fn run<B: RegisterPort>(app: AppService, bus: B, rx: &Receiver<AppCommand>) {
    let mut poll = PollCycle::new(app, bus, LogEventSink::new(), MonotonicClock::new());
    info!("Controls: [Enter]/t toggle, on, off, q quit");
    poll.run(rx);
    poll.handle_command(AppCommand::SetEnabled(false));
    info!(
        "Stopped after {} cycles ({} skipped, {} bus writes)",
        poll.app().cycle_count(),
        poll.skipped_ticks(),
        poll.app().outputs().write_count()
    );
}

/// Read operator commands from stdin on a helper thread.
fn spawn_operator_console(tx: Sender<AppCommand>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let cmd = match line.trim() {
                "" | "t" | "toggle" => AppCommand::ToggleSystem,
                "on" | "start" => AppCommand::SetEnabled(true),
                "off" | "stop" => AppCommand::SetEnabled(false),
                "q" | "quit" => AppCommand::Shutdown,
                other => {
                    warn!("Unknown command '{}'", other);
                    continue;
                }
            };
            let quit = matches!(cmd, AppCommand::Shutdown);
            if tx.send(cmd).is_err() || quit {
                break;
            }
        }
    });
}

//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers: no closures, no
//! dynamic dispatch.  Level hysteresis is explicit: the tank starts
//! filling strictly below `level_low` and stops at or above `level_high`.
//!
//! ```text
//!                 [enabled]
//!   DISABLED ─────────────────▶ IDLE ──[level < low]──▶ FILLING
//!      ▲                         ▲                         │
//!      │                         └──[level >= high]────────┘
//!      │
//!      └────────[disabled]──── any state
//! ```
//!
//! Discharge regulation is not a state: it runs on every enabled cycle in
//! both `Idle` and `Filling` (see [`AppService`](crate::app::service::AppService)).

use log::info;

use super::context::FsmContext;
use super::{StateDescriptor, StateId};
use crate::control::deferred::Pump;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Disabled
        StateDescriptor {
            name: "Disabled",
            on_enter: Some(disabled_enter),
            on_exit: None,
            on_update: disabled_update,
        },
        // Index 1: Idle
        StateDescriptor {
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 2: Filling
        StateDescriptor {
            name: "Filling",
            on_enter: Some(filling_enter),
            on_exit: Some(filling_exit),
            on_update: filling_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISABLED state: operator stop, everything off
// ═══════════════════════════════════════════════════════════════════════════

fn disabled_enter(ctx: &mut FsmContext) {
    ctx.request_full_stop();
    info!("DISABLED: all actuators off");
}

fn disabled_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.enabled {
        return Some(StateId::Idle);
    }
    // Level-triggered: re-assert every cycle.  The write cache keeps this
    // from reaching the bus once the outputs are confirmed off.
    ctx.request_full_stop();
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state: enabled, level above the fill threshold
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    info!("IDLE: level {:.1}", ctx.sample.level);
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    if !ctx.enabled {
        return Some(StateId::Disabled);
    }

    if ctx.sample.level < ctx.config.level_low {
        return Some(StateId::Filling);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  FILLING state: fill valve open, fill pump soft-started
// ═══════════════════════════════════════════════════════════════════════════

fn filling_enter(ctx: &mut FsmContext) {
    // Start from a known-off plant before opening anything.
    ctx.request_full_stop();

    ctx.commands.fill_valve = true;
    ctx.commands.fill_position = ctx.config.fill_valve_command;
    ctx.starts.schedule(Pump::Fill, ctx.now);
    ctx.fill_intervals.record(ctx.now);

    info!(
        "FILLING: level {:.1} < {:.1}, fill valve open, pump in {} ms",
        ctx.sample.level, ctx.config.level_low, ctx.config.pump_start_delay_ms
    );
}

fn filling_exit(ctx: &mut FsmContext) {
    ctx.request_full_stop();
}

fn filling_update(ctx: &mut FsmContext) -> Option<StateId> {
    if !ctx.enabled {
        return Some(StateId::Disabled);
    }

    if ctx.sample.level >= ctx.config.level_high {
        if let Some(avg) = ctx.fill_intervals.average_secs() {
            ctx.avg_fill_interval_secs = Some(avg);
            info!(
                "FILLING: complete, average fill interval {:.1} s over {} fills",
                avg,
                ctx.fill_intervals.count()
            );
        } else {
            info!("FILLING: complete at level {:.1}", ctx.sample.level);
        }
        return Some(StateId::Idle);
    }

    None
}

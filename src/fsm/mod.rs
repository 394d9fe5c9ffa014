//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌──────────┬───────────┬──────────┬─────────────────┐   │
//! │  │ StateId  │ on_enter  │ on_exit  │ on_update       │   │
//! │  ├──────────┼───────────┼──────────┼─────────────────┤   │
//! │  │ Disabled │ fn(ctx)   │ -        │ fn(ctx)->Option │   │
//! │  │ Idle     │ fn(ctx)   │ -        │ fn(ctx)->Option │   │
//! │  │ Filling  │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option │   │
//! │  └──────────┴───────────┴──────────┴─────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current state.  All functions receive `&mut FsmContext`, which holds
//! the measurement, desired outputs, config and the cycle time.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all controller states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    /// Operator has the system stopped; every output held off.
    Disabled = 0,
    /// Enabled, not filling.  Discharge regulation runs.
    Idle = 1,
    /// Enabled, fill valve open between the low and high level thresholds.
    Filling = 2,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// The fill sub-mode this state corresponds to.
    pub fn mode(self) -> Mode {
        match self {
            Self::Filling => Mode::Filling,
            Self::Disabled | Self::Idle => Mode::Idle,
        }
    }
}

/// Fill sub-mode.  `Filling` is only reachable while the system is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Idle,
    Filling,
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the per-cycle update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Handlers for one state.  The row's position in the table is its `StateId`.
pub struct StateDescriptor {
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table; the mutable [`FsmContext`] is threaded through
/// every handler call.  Timing lives in the context (`ctx.now`), not here.
pub struct Fsm {
    table: [StateDescriptor; StateId::COUNT],
    current: StateId,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial,
        }
    }

    /// Run `on_enter` for the starting state.  Call once, before the first
    /// [`tick`](Self::tick).
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.row(self.current).name);
        if let Some(enter) = self.row(self.current).on_enter {
            enter(ctx);
        }
    }

    /// Evaluate the current state against the sample in `ctx` and follow
    /// the transition it asks for, if any.
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        if let Some(next) = (self.row(self.current).on_update)(ctx) {
            self.transition(next, ctx);
        }
    }

    /// Move to `next` without consulting `on_update` (operator enable and
    /// disable).  No-op if already there.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        self.current
    }

    fn row(&self, id: StateId) -> &StateDescriptor {
        &self.table[id as usize]
    }

    fn transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        info!(
            "FSM transition: {} -> {}",
            self.row(self.current).name,
            self.row(next).name
        );

        if let Some(exit) = self.row(self.current).on_exit {
            exit(ctx);
        }
        self.current = next;
        if let Some(enter) = self.row(next).on_enter {
            enter(ctx);
        }
    }
}

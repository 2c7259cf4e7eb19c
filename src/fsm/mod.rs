//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  StateTable                                                │
//! │  ┌───────────┬───────────┬──────────┬───────────────────┐  │
//! │  │ StateId   │ on_enter  │ on_exit  │ on_update         │  │
//! │  ├───────────┼───────────┼──────────┼───────────────────┤  │
//! │  │ Idle      │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  │ Flushing  │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  │ Disposing │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  │ Filtering │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  │ Saving    │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  └───────────┴───────────┴──────────┴───────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! `on_update` runs for the **current** state whenever time advances
//! ([`Fsm::tick`]) or an input arrives ([`Fsm::dispatch`]).  If it returns
//! `Some(next_id)` the engine runs `on_exit` for the current state, then
//! `on_enter` for the next, and updates the current pointer.  A whole
//! transition completes inside one call, so no input is ever serviced
//! half-way through a phase change.

pub mod context;
pub mod states;

use context::{FsmContext, Input};
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Phases of the rig.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Flushing = 1,
    Disposing = 2,
    Filtering = 3,
    /// Momentary: persists the new filter length, then falls to `Idle`.
    Saving = 4,
}

impl StateId {
    /// Total number of states — used to size the table array.
    pub const COUNT: usize = 5;

    /// Convert an index back to `StateId`.  Out-of-range indices trip a
    /// debug assertion and map to `Idle` (all valves closed) in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Flushing,
            2 => Self::Disposing,
            3 => Self::Filtering,
            4 => Self::Saving,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
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
/// Owns the state table and the index of the current state.  The
/// [`FsmContext`] (the Run State) is owned by the caller and lent to every
/// handler by exclusive reference.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance phase time by `delta_ms` and let the current state react.
    pub fn tick(&mut self, ctx: &mut FsmContext, delta_ms: u64) {
        ctx.ms_in_state = ctx.ms_in_state.saturating_add(delta_ms);
        ctx.total_ms = ctx.total_ms.saturating_add(delta_ms);
        self.update(ctx);
    }

    /// Deliver one input to the current state.  Inputs the state does not
    /// handle are dropped, never queued.
    pub fn dispatch(&mut self, ctx: &mut FsmContext, input: Input) {
        ctx.input = Some(input);
        self.update(ctx);
        ctx.input = None;
    }

    /// Force an immediate transition (used on actuator faults to drop back
    /// to `Idle` regardless of what `on_update` would return).
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn update(&mut self, ctx: &mut FsmContext) {
        if let Some(next_id) = (self.table[self.current].on_update)(ctx) {
            self.transition(next_id, ctx);
        }
    }

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        ctx.ms_in_state = 0;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

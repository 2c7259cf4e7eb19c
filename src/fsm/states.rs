//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers — no closures, no
//! dynamic dispatch, no heap.
//!
//! ```text
//!            short / long / auto
//!  IDLE ──────────────────────────▶ FLUSHING ──[flush_sec]──▶ DISPOSING
//!   ▲  │                                                         │
//!   │  └──[short / long, membrane rinsed]──▶ FILTERING ◀──────────┘
//!   │                                          │    (button run)
//!   │        [target reached | short press]    │
//!   ├──────────────────────────────────────────┤
//!   │                                          │ [long press, >= 30s]
//!   └───────────────── SAVING ◀────────────────┘
//!
//!  DISPOSING ──[disposal_sec, auto-flush run]──▶ IDLE
//! ```
//!
//! Button presses during FLUSHING and DISPOSING are ignored.

use super::context::{Cue, FsmContext, Input, RunEnd, RunKind, RunState};
use super::{StateDescriptor, StateId};
use crate::config::MIN_FILTER_SECS;
use crate::valves::ValveSet;
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1 — Flushing
        StateDescriptor {
            id: StateId::Flushing,
            name: "Flushing",
            on_enter: Some(flushing_enter),
            on_exit: None,
            on_update: flushing_update,
        },
        // Index 2 — Disposing
        StateDescriptor {
            id: StateId::Disposing,
            name: "Disposing",
            on_enter: Some(disposing_enter),
            on_exit: None,
            on_update: disposing_update,
        },
        // Index 3 — Filtering
        StateDescriptor {
            id: StateId::Filtering,
            name: "Filtering",
            on_enter: Some(filtering_enter),
            on_exit: Some(filtering_exit),
            on_update: filtering_update,
        },
        // Index 4 — Saving
        StateDescriptor {
            id: StateId::Saving,
            name: "Saving",
            on_enter: Some(saving_enter),
            on_exit: None,
            on_update: saving_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.commands.valves = ValveSet::for_phase(StateId::Idle);
    ctx.run = RunState::default();
    info!("IDLE: all valves closed");
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    let kind = match ctx.input? {
        Input::ShortPress => {
            ctx.commands.cue(Cue::ShortAck);
            RunKind::Standard
        }
        Input::LongPress => {
            ctx.commands.cue(Cue::LongAck);
            RunKind::Extended
        }
        Input::AutoFlush => RunKind::AutoFlush,
    };

    ctx.run = RunState::begin(kind, &ctx.config);

    if kind != RunKind::AutoFlush && ctx.membrane_rinsed {
        info!("IDLE: {:?} run, membrane still rinsed, skipping pre-flush", kind);
        return Some(StateId::Filtering);
    }
    info!("IDLE: {:?} run requested", kind);
    Some(StateId::Flushing)
}

// ═══════════════════════════════════════════════════════════════════════════
//  FLUSHING state — full flow through the concentrate line
// ═══════════════════════════════════════════════════════════════════════════

fn flushing_enter(ctx: &mut FsmContext) {
    ctx.commands.valves = ValveSet::for_phase(StateId::Flushing);
    info!("FLUSHING: {}s", ctx.config.flush_sec);
}

fn flushing_update(ctx: &mut FsmContext) -> Option<StateId> {
    if let Some(input) = ctx.input {
        info!("FLUSHING: {:?} ignored", input);
        return None;
    }

    if ctx.ms_in_state >= u64::from(ctx.config.flush_sec) * 1000 {
        return Some(StateId::Disposing);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISPOSING state — first permeate to drain
// ═══════════════════════════════════════════════════════════════════════════

fn disposing_enter(ctx: &mut FsmContext) {
    ctx.commands.valves = ValveSet::for_phase(StateId::Disposing);
    info!("DISPOSING: {}s", ctx.config.disposal_sec);
}

fn disposing_update(ctx: &mut FsmContext) -> Option<StateId> {
    if let Some(input) = ctx.input {
        info!("DISPOSING: {:?} ignored", input);
        return None;
    }

    if ctx.ms_in_state < u64::from(ctx.config.disposal_sec) * 1000 {
        return None;
    }

    if ctx.run.kind == Some(RunKind::AutoFlush) {
        info!("DISPOSING: maintenance flush complete");
        ctx.commands.cue(Cue::FlushDone);
        ctx.finish_run(RunEnd::Completed);
        return Some(StateId::Idle);
    }
    Some(StateId::Filtering)
}

// ═══════════════════════════════════════════════════════════════════════════
//  FILTERING state — permeate to the tap
// ═══════════════════════════════════════════════════════════════════════════

fn filtering_enter(ctx: &mut FsmContext) {
    ctx.commands.valves = ValveSet::for_phase(StateId::Filtering);
    ctx.run.filtered_ms = 0;
    info!("FILTERING: target {}s", ctx.run.target_ms / 1000);
}

fn filtering_exit(ctx: &mut FsmContext) {
    info!("FILTERING: stopped after {}s", ctx.run.filtered_ms / 1000);
}

fn filtering_update(ctx: &mut FsmContext) -> Option<StateId> {
    ctx.run.filtered_ms = ctx.ms_in_state;

    match ctx.input {
        Some(Input::ShortPress) => {
            info!("FILTERING: aborted by short press");
            ctx.commands.cue(Cue::ShortAck);
            ctx.finish_run(RunEnd::Aborted);
            return Some(StateId::Idle);
        }
        Some(Input::LongPress) => {
            ctx.commands.cue(Cue::LongAck);
            if ctx.secs_in_state() >= u64::from(MIN_FILTER_SECS) {
                return Some(StateId::Saving);
            }
            warn!(
                "FILTERING: {}s is below the {}s minimum, not saving",
                ctx.secs_in_state(),
                MIN_FILTER_SECS
            );
            ctx.finish_run(RunEnd::Aborted);
            return Some(StateId::Idle);
        }
        Some(Input::AutoFlush) => {
            info!("FILTERING: auto-flush ignored");
            return None;
        }
        None => {}
    }

    if ctx.run.filtered_ms >= ctx.run.target_ms {
        ctx.commands.cue(Cue::Completed);
        ctx.finish_run(RunEnd::Completed);
        return Some(StateId::Idle);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SAVING state — valves closed while the new filter length is persisted
// ═══════════════════════════════════════════════════════════════════════════

fn saving_enter(ctx: &mut FsmContext) {
    ctx.commands.valves = ValveSet::for_phase(StateId::Saving);
    let secs = (ctx.run.filtered_ms / 1000) as u32;
    ctx.pending_save = Some(secs);
    info!("SAVING: new filter length {}s", secs);
}

fn saving_update(ctx: &mut FsmContext) -> Option<StateId> {
    // The service clears `pending_save` once it has been handed to storage.
    if ctx.pending_save.is_some() {
        return None;
    }
    ctx.finish_run(RunEnd::Saved);
    Some(StateId::Idle)
}

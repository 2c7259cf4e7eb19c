//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the Run State: the single struct that state handlers
//! read from and write to.  It holds the pending input, the commands the
//! handlers want applied (valve set, buzzer cues), phase timing, the live
//! configuration and the bookkeeping of the run in progress.

use crate::config::{EXTENDED_RUN_SECS, FilterConfig};
use crate::valves::ValveSet;

// ---------------------------------------------------------------------------
// Inputs (written by the service before a dispatch; consumed by on_update)
// ---------------------------------------------------------------------------

/// A discrete stimulus delivered to the FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Button released after a short hold.
    ShortPress,
    /// Button released after a long hold.
    LongPress,
    /// Maintenance flush requested by the scheduler.
    AutoFlush,
}

// ---------------------------------------------------------------------------
// Actuator commands (written by state handlers; consumed by the service)
// ---------------------------------------------------------------------------

/// Audible feedback patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Played once at boot.
    Greeting,
    /// Short press accepted.
    ShortAck,
    /// Long press accepted.
    LongAck,
    /// Maintenance flush finished.
    FlushDone,
    /// New filtration length persisted.
    Saved,
    /// New filtration length could not be persisted.
    SaveFailed,
    /// Filtration ran to its target.
    Completed,
    /// A valve refused its command.
    Fault,
}

/// Upper bound on cues a single transition may request.
pub const MAX_CUES: usize = 4;

/// Commands that state handlers write to request actuator actions.
/// The service applies these to the ports after every FSM call.
#[derive(Debug, Clone, Default)]
pub struct Commands {
    /// Valves that must be open in the current phase.
    pub valves: ValveSet,
    /// Cues to play, oldest first.  Drained by the service.
    pub cues: heapless::Vec<Cue, MAX_CUES>,
}

impl Commands {
    /// Queue a cue.  Overflow drops the newest request.
    pub fn cue(&mut self, cue: Cue) {
        if self.cues.push(cue).is_err() {
            log::warn!("cue queue full, dropping {:?}", cue);
        }
    }
}

// ---------------------------------------------------------------------------
// Run bookkeeping
// ---------------------------------------------------------------------------

/// What started the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Short press: filtration target is `filter_sec`.
    Standard,
    /// Long press: filtration target is the extended cap.
    Extended,
    /// Scheduler: flush and disposal only.
    AutoFlush,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    Completed,
    Aborted,
    Saved,
    Faulted,
}

/// The run in progress, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunState {
    pub kind: Option<RunKind>,
    /// Filtration target for this run.
    pub target_ms: u64,
    /// Filtration time accumulated so far.  Only advances in `Filtering`.
    pub filtered_ms: u64,
}

impl RunState {
    pub fn begin(kind: RunKind, config: &FilterConfig) -> Self {
        let target_secs = match kind {
            RunKind::Standard => config.filter_sec,
            RunKind::Extended => EXTENDED_RUN_SECS,
            RunKind::AutoFlush => 0,
        };
        Self {
            kind: Some(kind),
            target_ms: u64::from(target_secs) * 1000,
            filtered_ms: 0,
        }
    }
}

/// Summary of a run that has just returned the rig to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishedRun {
    pub kind: RunKind,
    pub end: RunEnd,
    pub filtered_secs: u32,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Milliseconds elapsed since the current state was entered.
    pub ms_in_state: u64,
    /// Monotonic total of all ticked time.
    pub total_ms: u64,

    // -- Input --
    /// Set for the duration of one dispatch.
    pub input: Option<Input>,
    /// The membrane was rinsed recently enough that a button-started run
    /// may go straight to filtration.  Refreshed by the service.
    pub membrane_rinsed: bool,

    // -- Outputs --
    pub commands: Commands,
    /// Filtration length (seconds) waiting to be persisted by `Saving`.
    pub pending_save: Option<u32>,
    /// Set when a run ends; taken by the service.
    pub finished: Option<FinishedRun>,

    // -- Run --
    pub run: RunState,

    // -- Configuration --
    pub config: FilterConfig,
}

impl FsmContext {
    /// Create a new context with the given configuration.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            ms_in_state: 0,
            total_ms: 0,
            input: None,
            membrane_rinsed: false,
            commands: Commands::default(),
            pending_save: None,
            finished: None,
            run: RunState::default(),
            config,
        }
    }

    /// Close out the current run.  No-op when nothing is running.
    pub fn finish_run(&mut self, end: RunEnd) {
        if let Some(kind) = self.run.kind.take() {
            self.finished = Some(FinishedRun {
                kind,
                end,
                filtered_secs: (self.run.filtered_ms / 1000) as u32,
            });
        }
    }

    /// Whole seconds spent in the current state.
    pub fn secs_in_state(&self) -> u64 {
        self.ms_in_state / 1000
    }
}

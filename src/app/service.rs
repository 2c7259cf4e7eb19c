//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the FSM, the Run State and the run history.  It is
//! the only component that commands valves.  All I/O flows through port
//! traits injected at call sites, making the entire service testable with
//! mock adapters.
//!
//! ```text
//!  AppCommand ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │       AppService        │
//!  ValvePort  ◀── │  FSM · Saving · Faults  │ ──▶ ConfigPort
//!  CuePort    ◀── └────────────────────────┘
//! ```
//!
//! Every public entry point runs to completion: a phase change, its valve
//! commands, a pending save and the resulting cues all happen before the
//! call returns.

use log::{info, warn};

use crate::config::FilterConfig;
use crate::drivers::button::PressEvent;
use crate::error::ActuatorError;
use crate::fsm::context::{Cue, FinishedRun, FsmContext, Input, RunEnd};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::history::{RunHistory, RunRecord};
use crate::valves::ValveSet;

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{ConfigError, ConfigPort, CuePort, EventSink, ValvePort};

/// Loop time between attempts to re-persist a config that failed to save.
pub const SAVE_RETRY_MS: u64 = 5_000;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    history: RunHistory,
    /// Service clock: sum of all ticked time.
    now_ms: u64,
    run_started_ms: u64,
    /// Set when a run ends, taken by the control loop.
    finished: Option<FinishedRun>,
    config_dirty: bool,
    dirty_since_ms: u64,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM — call [`start`](Self::start) next.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            ctx: FsmContext::new(config),
            history: RunHistory::new(),
            now_ms: 0,
            run_started_ms: 0,
            finished: None,
            config_dirty: false,
            dirty_since_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the FSM in `Idle`, command every valve closed and greet.
    pub fn start(&mut self, hw: &mut (impl ValvePort + CuePort), sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        if let Err(e) = hw.close_all() {
            self.actuator_fault(e, hw, sink);
        }
        self.ctx.commands.cue(Cue::Greeting);
        self.flush_cues(hw);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("AppService started in {:?}", self.fsm.current_state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Advance phase time by `delta_ms`, then retry a failed save if due.
    ///
    /// The `hw` parameter satisfies **both** [`ValvePort`] and [`CuePort`]
    /// — this avoids a double mutable borrow while keeping the port
    /// boundary explicit.
    pub fn tick(
        &mut self,
        delta_ms: u32,
        hw: &mut (impl ValvePort + CuePort),
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) {
        self.now_ms = self.now_ms.saturating_add(u64::from(delta_ms));
        let prev = self.fsm.current_state();
        self.fsm.tick(&mut self.ctx, u64::from(delta_ms));
        self.settle(prev, hw, store, sink);
        self.retry_pending_save(store, sink);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process one inbound command to completion.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut (impl ValvePort + CuePort),
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) {
        let prev = self.fsm.current_state();

        let input = match cmd {
            AppCommand::Press(PressEvent::PressStarted) => {
                info!("Button down in {:?}", prev);
                return;
            }
            AppCommand::Press(press) => {
                if matches!(prev, StateId::Flushing | StateId::Disposing) {
                    sink.emit(&AppEvent::PressIgnored { state: prev, press });
                }
                if press == PressEvent::LongPressReleased {
                    Input::LongPress
                } else {
                    Input::ShortPress
                }
            }
            AppCommand::AutoFlush => {
                if prev != StateId::Idle {
                    info!("Auto-flush dropped, rig busy in {:?}", prev);
                    sink.emit(&AppEvent::AutoFlushSkipped(prev));
                    return;
                }
                Input::AutoFlush
            }
        };

        self.ctx.membrane_rinsed = self
            .history
            .membrane_rinsed(self.now_ms, self.ctx.config.water_clean_sec);
        self.fsm.dispatch(&mut self.ctx, input);
        self.settle(prev, hw, store, sink);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Valves the current phase requires open.
    pub fn valves(&self) -> ValveSet {
        self.ctx.commands.valves
    }

    /// The live configuration.
    pub fn config(&self) -> &FilterConfig {
        &self.ctx.config
    }

    pub fn history(&self) -> &RunHistory {
        &self.history
    }

    /// Milliseconds ticked since startup.
    pub fn uptime_ms(&self) -> u64 {
        self.now_ms
    }

    /// Take the most recently finished run, if one ended since the last call.
    pub fn take_finished_run(&mut self) -> Option<FinishedRun> {
        self.finished.take()
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    // ── Config dirty-flag management ──────────────────────────

    /// Re-attempt a failed save once [`SAVE_RETRY_MS`] have passed since
    /// the last attempt.  Returns `true` if the config was saved.
    pub fn retry_pending_save(&mut self, store: &mut impl ConfigPort, sink: &mut impl EventSink) -> bool {
        if !self.config_dirty {
            return false;
        }
        if self.now_ms.saturating_sub(self.dirty_since_ms) < SAVE_RETRY_MS {
            return false;
        }
        match store.save(&self.ctx.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config saved on retry");
                sink.emit(&AppEvent::ConfigSaved {
                    filter_sec: self.ctx.config.filter_sec,
                });
                true
            }
            Err(e) => {
                warn!("Config save retry failed: {}", e);
                self.dirty_since_ms = self.now_ms;
                false
            }
        }
    }

    // ── Internal ──────────────────────────────────────────────

    /// Bring the outside world in line with whatever the FSM just did.
    fn settle(
        &mut self,
        prev: StateId,
        hw: &mut (impl ValvePort + CuePort),
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) {
        let mut from = prev;
        loop {
            let to = self.fsm.current_state();
            if to == from {
                break;
            }
            sink.emit(&AppEvent::StateChanged { from, to });

            if from == StateId::Idle {
                self.run_started_ms = self.now_ms;
                if let Some(kind) = self.ctx.run.kind {
                    sink.emit(&AppEvent::RunStarted(kind));
                }
            }

            if let Err(e) = hw.apply(self.ctx.commands.valves) {
                self.actuator_fault(e, hw, sink);
                break;
            }

            if to == StateId::Saving {
                self.persist_pending(store, sink);
                self.fsm.tick(&mut self.ctx, 0);
            }
            from = to;
        }

        self.record_finished(sink);
        self.flush_cues(hw);
    }

    /// Hand the Saving state's value to the config store.
    fn persist_pending(&mut self, store: &mut impl ConfigPort, sink: &mut impl EventSink) {
        let Some(filter_sec) = self.ctx.pending_save.take() else {
            return;
        };
        let candidate = FilterConfig {
            filter_sec,
            ..self.ctx.config
        };

        match store.save(&candidate) {
            Ok(()) => {
                self.ctx.config = candidate;
                self.config_dirty = false;
                info!("filter_sec saved: {}s", filter_sec);
                self.ctx.commands.cue(Cue::Saved);
                sink.emit(&AppEvent::ConfigSaved { filter_sec });
            }
            Err(e @ ConfigError::ValidationFailed(_)) => {
                warn!("filter_sec {}s rejected: {}", filter_sec, e);
                self.ctx.commands.cue(Cue::SaveFailed);
                sink.emit(&AppEvent::ConfigSaveFailed(e));
            }
            Err(e) => {
                // Keep the new value in memory and retry from the loop.
                warn!("filter_sec {}s not persisted: {}, will retry", filter_sec, e);
                self.ctx.config = candidate;
                self.config_dirty = true;
                self.dirty_since_ms = self.now_ms;
                self.ctx.commands.cue(Cue::SaveFailed);
                sink.emit(&AppEvent::ConfigSaveFailed(e));
            }
        }
    }

    /// Fatal to the current phase: back to `Idle`, everything closed.
    fn actuator_fault(
        &mut self,
        err: ActuatorError,
        hw: &mut (impl ValvePort + CuePort),
        sink: &mut impl EventSink,
    ) {
        warn!("Actuator fault: {}", err);
        sink.emit(&AppEvent::ActuatorFault(err));

        let prev = self.fsm.current_state();
        self.ctx.pending_save = None;
        self.ctx.finish_run(RunEnd::Faulted);
        self.fsm.force_transition(StateId::Idle, &mut self.ctx);
        if prev != StateId::Idle {
            sink.emit(&AppEvent::StateChanged {
                from: prev,
                to: StateId::Idle,
            });
        }

        if let Err(e) = hw.close_all() {
            warn!("close-all after fault also failed: {}", e);
        }
        self.ctx.commands.cue(Cue::Fault);
    }

    fn record_finished(&mut self, sink: &mut impl EventSink) {
        let Some(run) = self.ctx.finished.take() else {
            return;
        };
        let rec = RunRecord::new(run, self.run_started_ms, self.now_ms);
        info!(
            "Run finished: {:?} {:?} after {}s, filtered {}s",
            rec.kind,
            rec.end,
            rec.duration_ms() / 1000,
            rec.filtered_secs
        );
        self.history.record(rec);
        self.finished = Some(run);
        sink.emit(&AppEvent::RunFinished(run));
    }

    fn flush_cues(&mut self, hw: &mut impl CuePort) {
        for cue in self.ctx.commands.cues.iter() {
            hw.play_cue(*cue);
        }
        self.ctx.commands.cues.clear();
    }
}

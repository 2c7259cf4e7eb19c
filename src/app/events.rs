//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them; on the rig they go to the serial log.

use crate::drivers::button::PressEvent;
use crate::error::ActuatorError;
use crate::fsm::StateId;
use crate::fsm::context::{FinishedRun, RunKind};

use super::ports::ConfigError;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A run left `Idle`.
    RunStarted(RunKind),

    /// A run returned the rig to `Idle`.
    RunFinished(FinishedRun),

    /// A button event arrived while the current phase does not accept it.
    PressIgnored { state: StateId, press: PressEvent },

    /// The auto-flush timer fired while a run was active.
    AutoFlushSkipped(StateId),

    /// `filter_sec` was persisted.
    ConfigSaved { filter_sec: u32 },

    /// Persisting the config failed; a retry is pending unless the value
    /// was rejected.
    ConfigSaveFailed(ConfigError),

    /// A valve refused its command.  All valves were commanded closed.
    ActuatorFault(ActuatorError),
}

//! Inbound commands to the application service.
//!
//! These represent stimuli from the outside world (button, auto-flush
//! timer) that the [`AppService`](super::service::AppService) interprets
//! and acts upon.  Phase time is not a command; it advances through
//! [`AppService::tick`](super::service::AppService::tick).

use crate::drivers::button::PressEvent;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// A classified button event.
    Press(PressEvent),

    /// The auto-flush timer fired.  Honoured only in `Idle`.
    AutoFlush,
}

impl From<PressEvent> for AppCommand {
    fn from(press: PressEvent) -> Self {
        Self::Press(press)
    }
}

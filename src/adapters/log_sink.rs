//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every application event as one
//! structured line to the `log` facade (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::RunStarted(kind) => {
                info!("RUN | started kind={:?}", kind);
            }
            AppEvent::RunFinished(run) => {
                info!(
                    "RUN | finished kind={:?} end={:?} filtered={}s",
                    run.kind, run.end, run.filtered_secs
                );
            }
            AppEvent::PressIgnored { state, press } => {
                info!("RUN | {:?} ignored in {:?}", press, state);
            }
            AppEvent::AutoFlushSkipped(state) => {
                info!("RUN | auto-flush skipped, busy in {:?}", state);
            }
            AppEvent::ConfigSaved { filter_sec } => {
                info!("SAVE | filter_sec={}", filter_sec);
            }
            AppEvent::ConfigSaveFailed(e) => {
                warn!("SAVE | failed: {}", e);
            }
            AppEvent::ActuatorFault(e) => {
                warn!("FAULT | {}", e);
            }
        }
    }
}

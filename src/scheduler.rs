//! Auto-flush timer.
//!
//! A single periodic timer of period `auto_flush_sec`.  The scheduler
//! notifies a [`SchedulerDelegate`] when it fires; the control loop
//! implements the delegate to push an event into the
//! [`EventQueue`](crate::events::EventQueue).
//!
//! ```text
//!   ControlLoop ──tick(delta)──▶ AutoFlushScheduler
//!                                      │ period elapsed
//!                                      ▼
//!                              SchedulerDelegate
//!                                      │
//!                                      ▼
//!                          EventQueue ─▶ AppService.handle_command()
//! ```
//!
//! The timer restarts from zero every time it fires and every time a run
//! ends ([`restart`](AutoFlushScheduler::restart)).  Whether the rig was
//! free to honour a fire is the service's business, not the timer's:
//! a dropped request is never retried early.

use crate::app::ports::SchedulerDelegate;
use log::info;

/// Label passed to the delegate on each fire.
pub const AUTO_FLUSH_LABEL: &str = "auto-flush";

pub struct AutoFlushScheduler {
    period_ms: u64,
    elapsed_ms: u64,
    enabled: bool,
    fire_count: u32,
}

impl AutoFlushScheduler {
    pub fn new(period_secs: u32) -> Self {
        info!("Scheduler: auto-flush every {}s", period_secs);
        Self {
            period_ms: u64::from(period_secs) * 1000,
            elapsed_ms: 0,
            enabled: period_secs > 0,
            fire_count: 0,
        }
    }

    /// Start a fresh interval.
    pub fn restart(&mut self) {
        self.elapsed_ms = 0;
    }

    /// Time left until the next fire.
    pub fn remaining_ms(&self) -> u64 {
        self.period_ms.saturating_sub(self.elapsed_ms)
    }

    /// Number of times the timer has fired since construction.
    pub fn fire_count(&self) -> u32 {
        self.fire_count
    }

    /// Advance by `delta_ms`.  Fires at most once per call.
    pub fn tick(&mut self, delta_ms: u32, delegate: &mut dyn SchedulerDelegate) {
        if !self.enabled {
            return;
        }

        self.elapsed_ms = self.elapsed_ms.saturating_add(u64::from(delta_ms));
        if self.elapsed_ms < self.period_ms {
            return;
        }

        self.elapsed_ms = 0;
        self.fire_count = self.fire_count.saturating_add(1);
        info!("Scheduler: '{}' fired (#{})", AUTO_FLUSH_LABEL, self.fire_count);
        delegate.on_schedule_fired(AUTO_FLUSH_LABEL);
    }
}

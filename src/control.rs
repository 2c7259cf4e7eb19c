//! Cooperative control loop.
//!
//! One logical thread multiplexes the three activities of the rig:
//! button monitoring, the active-phase timer and the auto-flush timer.
//! Each [`ControlLoop::step`] call samples the world once, queues what
//! happened in arrival order, and then services the queue one event at a
//! time against the [`AppService`].
//!
//! ```text
//!  step(now, level)
//!    ├─ ControlTick{delta}      time that passed since the last step
//!    ├─ Button(event)           edge classified at `now`
//!    ├─ AutoFlushDue            scheduler fired during `delta`
//!    └─ drain ──▶ AppService ──▶ run ended? ──▶ scheduler.restart()
//!                                                 + cancel queued AutoFlushDue
//! ```
//!
//! Nothing in here blocks.  The caller owns the pacing (20 ms on the rig,
//! arbitrary in tests).

use log::info;

use crate::app::commands::AppCommand;
use crate::app::ports::{ConfigPort, CuePort, EventSink, ValvePort};
use crate::app::service::AppService;
use crate::config::FilterConfig;
use crate::drivers::button::ButtonDriver;
use crate::events::{Event, EventQueue};
use crate::scheduler::AutoFlushScheduler;

pub struct ControlLoop {
    app: AppService,
    button: ButtonDriver,
    scheduler: AutoFlushScheduler,
    queue: EventQueue,
    last_ms: Option<u32>,
}

impl ControlLoop {
    pub fn new(config: FilterConfig, button: ButtonDriver) -> Self {
        Self {
            scheduler: AutoFlushScheduler::new(config.auto_flush_sec),
            app: AppService::new(config),
            button,
            queue: EventQueue::new(),
            last_ms: None,
        }
    }

    /// Start the service: valves closed, greeting cue.
    pub fn start(&mut self, hw: &mut (impl ValvePort + CuePort), sink: &mut impl EventSink) {
        self.app.start(hw, sink);
    }

    /// Run one loop iteration.
    ///
    /// * `now_ms` — monotonic milliseconds (wrapping).
    /// * `pressed` — logical button level sampled at `now_ms`.
    pub fn step(
        &mut self,
        now_ms: u32,
        pressed: bool,
        hw: &mut (impl ValvePort + CuePort),
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) {
        let delta_ms = self.last_ms.map_or(0, |last| now_ms.wrapping_sub(last));
        self.last_ms = Some(now_ms);

        if delta_ms > 0 {
            self.queue.push(Event::ControlTick { delta_ms });
        }
        if let Some(press) = self.button.tick(now_ms, pressed) {
            self.queue.push(Event::Button(press));
        }
        self.scheduler.tick(delta_ms, &mut self.queue);

        while let Some(event) = self.queue.pop() {
            self.dispatch(event, hw, store, sink);
        }
    }

    pub fn app(&self) -> &AppService {
        &self.app
    }

    pub fn scheduler(&self) -> &AutoFlushScheduler {
        &self.scheduler
    }

    pub fn button(&self) -> &ButtonDriver {
        &self.button
    }

    fn dispatch(
        &mut self,
        event: Event,
        hw: &mut (impl ValvePort + CuePort),
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) {
        match event {
            Event::ControlTick { delta_ms } => self.app.tick(delta_ms, hw, store, sink),
            Event::Button(press) => self.app.handle_command(press.into(), hw, store, sink),
            Event::AutoFlushDue => self.app.handle_command(AppCommand::AutoFlush, hw, store, sink),
        }

        if let Some(run) = self.app.take_finished_run() {
            info!("Run ended ({:?}), auto-flush timer restarted", run.end);
            self.scheduler.restart();
            // A fire queued in this same step predates the restart.
            if self.queue.cancel(Event::AutoFlushDue) > 0 {
                info!("Stale auto-flush request dropped");
            }
        }
    }
}

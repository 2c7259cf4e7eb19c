//! Control-loop event queue.
//!
//! Events are produced by:
//! - the button driver (classified presses)
//! - the auto-flush scheduler (through [`SchedulerDelegate`])
//! - the loop itself (elapsed phase time)
//!
//! and consumed one at a time, strictly in arrival order, against the
//! single Run State owned by the [`AppService`](crate::app::service::AppService).
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Button      │────▶│              │     │              │
//! │ Auto-flush  │────▶│  EventQueue  │────▶│  AppService  │
//! │ Phase timer │────▶│    (FIFO)    │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use heapless::Deque;
use log::warn;

use crate::app::ports::SchedulerDelegate;
use crate::drivers::button::PressEvent;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A classified button event.
    Button(PressEvent),
    /// The auto-flush timer fired.
    AutoFlushDue,
    /// Phase time advanced.
    ControlTick { delta_ms: u32 },
}

/// Bounded FIFO.  Overflow drops the newest event and counts it.
#[derive(Debug, Default)]
pub struct EventQueue {
    queue: Deque<Event, EVENT_QUEUE_CAP>,
    dropped: u32,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: Deque::new(),
            dropped: 0,
        }
    }

    /// Push an event.  Returns `false` if the queue is full (event dropped).
    pub fn push(&mut self, event: Event) -> bool {
        if self.queue.push_back(event).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            warn!("Event queue full, dropping {:?}", event);
            return false;
        }
        true
    }

    /// Pop the oldest event.
    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    /// Remove every pending copy of `event`, keeping the others in order.
    /// Returns how many were removed.
    pub fn cancel(&mut self, event: Event) -> usize {
        let mut removed = 0;
        for _ in 0..self.queue.len() {
            let Some(pending) = self.queue.pop_front() else {
                break;
            };
            if pending == event {
                removed += 1;
                continue;
            }
            let requeued = self.queue.push_back(pending);
            debug_assert!(requeued.is_ok());
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Events lost to overflow since construction.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl SchedulerDelegate for EventQueue {
    fn on_schedule_fired(&mut self, _label: &str) {
        self.push(Event::AutoFlushDue);
    }
}

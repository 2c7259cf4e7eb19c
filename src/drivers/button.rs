//! Polled, debounced button driver with short / long press classification.
//!
//! ## Hardware
//!
//! Active-low momentary switch with internal pull-up.  The main loop
//! samples the level every [`POLL_INTERVAL_MS`](crate::config::POLL_INTERVAL_MS)
//! and feeds it to [`ButtonDriver::tick`], which runs the debounce +
//! classification state machine.
//!
//! ## Events
//!
//! | Event                | Condition                                   |
//! |----------------------|---------------------------------------------|
//! | `PressStarted`       | Level held pressed for `DEBOUNCE_MS`        |
//! | `ShortPressReleased` | Debounced release, held < `LONG_PRESS_MS`   |
//! | `LongPressReleased`  | Debounced release, held >= `LONG_PRESS_MS`  |
//!
//! Both edges are debounced: a level change only counts once it has been
//! stable for `DEBOUNCE_MS`.  A release is only ever emitted after its
//! matching `PressStarted`.

use crate::config::{DEBOUNCE_MS, LONG_PRESS_MS};

/// Classified button events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressEvent {
    PressStarted,
    ShortPressReleased,
    LongPressReleased,
}

/// Internal state machine for debounce and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressState {
    Released,
    PressDebounce { since_ms: u32 },
    Pressed { since_ms: u32 },
    ReleaseDebounce { pressed_ms: u32, since_ms: u32 },
}

pub struct ButtonDriver {
    gpio: i32,
    state: PressState,
}

impl ButtonDriver {
    pub fn new(gpio: i32) -> Self {
        Self {
            gpio,
            state: PressState::Released,
        }
    }

    /// True while a debounced press is in progress.
    pub fn is_held(&self) -> bool {
        matches!(
            self.state,
            PressState::Pressed { .. } | PressState::ReleaseDebounce { .. }
        )
    }

    /// Feed one sample.  `now_ms` is monotonic time, `pressed` the logical
    /// (already inverted) button level.  Returns at most one event.
    pub fn tick(&mut self, now_ms: u32, pressed: bool) -> Option<PressEvent> {
        match self.state {
            PressState::Released => {
                if pressed {
                    self.state = PressState::PressDebounce { since_ms: now_ms };
                }
                None
            }

            PressState::PressDebounce { since_ms } => {
                if !pressed {
                    self.state = PressState::Released;
                    return None;
                }
                if now_ms.wrapping_sub(since_ms) >= DEBOUNCE_MS {
                    self.state = PressState::Pressed { since_ms };
                    return Some(PressEvent::PressStarted);
                }
                None
            }

            PressState::Pressed { since_ms } => {
                if !pressed {
                    self.state = PressState::ReleaseDebounce {
                        pressed_ms: since_ms,
                        since_ms: now_ms,
                    };
                }
                None
            }

            PressState::ReleaseDebounce { pressed_ms, since_ms } => {
                if pressed {
                    // Bounce on release: still the same press.
                    self.state = PressState::Pressed { since_ms: pressed_ms };
                    return None;
                }
                if now_ms.wrapping_sub(since_ms) < DEBOUNCE_MS {
                    return None;
                }
                self.state = PressState::Released;
                let held_ms = since_ms.wrapping_sub(pressed_ms);
                if held_ms >= LONG_PRESS_MS {
                    Some(PressEvent::LongPressReleased)
                } else {
                    Some(PressEvent::ShortPressReleased)
                }
            }
        }
    }

    /// Lazily classify a stream of `(now_ms, pressed)` samples.
    ///
    /// The returned iterator is as long as `samples`; over an endless
    /// sampler it never ends.  Dropping it and calling `events` again
    /// resumes from the driver's current state.
    pub fn events<I>(&mut self, samples: I) -> PressEvents<'_, I::IntoIter>
    where
        I: IntoIterator<Item = (u32, bool)>,
    {
        PressEvents {
            driver: self,
            samples: samples.into_iter(),
        }
    }

    /// Sample the physical button.
    #[cfg(target_os = "espidf")]
    pub fn read_pressed(&self) -> bool {
        !crate::drivers::hw_init::gpio_read(self.gpio)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read_pressed(&self) -> bool {
        false
    }
}

/// Iterator adapter returned by [`ButtonDriver::events`].
pub struct PressEvents<'a, I> {
    driver: &'a mut ButtonDriver,
    samples: I,
}

impl<I> Iterator for PressEvents<'_, I>
where
    I: Iterator<Item = (u32, bool)>,
{
    type Item = PressEvent;

    fn next(&mut self) -> Option<PressEvent> {
        for (now_ms, pressed) in self.samples.by_ref() {
            if let Some(event) = self.driver.tick(now_ms, pressed) {
                return Some(event);
            }
        }
        None
    }
}

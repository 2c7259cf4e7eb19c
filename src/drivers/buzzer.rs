//! Non-blocking buzzer cue player.
//!
//! Turns a [`Cue`] into an on/off pattern on an active piezo buzzer.  The
//! main loop calls `tick()` every iteration with the elapsed time, and the
//! player advances through the pattern without ever sleeping.
//!
//! ## Patterns (ms, on/off alternating, starting with on)
//!
//! | Cue         | Pattern                          |
//! |-------------|----------------------------------|
//! | Greeting    | 100 / 100 / 500                  |
//! | ShortAck    | 200                              |
//! | LongAck     | 500                              |
//! | FlushDone   | 200 / 100 / 200                  |
//! | Saved       | 100 / 100 / 100 / 100 / 100      |
//! | SaveFailed  | 500 / 100 / 100 / 100 / 500      |
//! | Completed   | 400 / 200 / 400 / 200 / 400      |
//! | Fault       | 8 × 60 on, 60 off between        |
//!
//! Cues requested while another is playing are queued; each is followed
//! by a short silent gap.

use embedded_hal::digital::{OutputPin, PinState};
use heapless::Deque;
use log::warn;

use crate::fsm::context::Cue;

/// Silence inserted after every cue.
const GAP_MS: u32 = 150;
/// Cues waiting behind the one playing.
const QUEUE_CAP: usize = 4;

/// Segment lengths of a cue, alternating on/off starting with on.
fn pattern(cue: Cue) -> &'static [u32] {
    match cue {
        Cue::Greeting => &[100, 100, 500],
        Cue::ShortAck => &[200],
        Cue::LongAck => &[500],
        Cue::FlushDone => &[200, 100, 200],
        Cue::Saved => &[100, 100, 100, 100, 100],
        Cue::SaveFailed => &[500, 100, 100, 100, 500],
        Cue::Completed => &[400, 200, 400, 200, 400],
        Cue::Fault => &[60, 60, 60, 60, 60, 60, 60, 60, 60, 60, 60, 60, 60, 60, 60],
    }
}

#[derive(Debug, Clone, Copy)]
struct Playing {
    cue: Cue,
    /// Index into the pattern; `len` means the trailing gap.
    segment: usize,
    elapsed_ms: u32,
}

impl Playing {
    fn new(cue: Cue) -> Self {
        Self {
            cue,
            segment: 0,
            elapsed_ms: 0,
        }
    }

    fn segment_ms(&self) -> u32 {
        pattern(self.cue).get(self.segment).copied().unwrap_or(GAP_MS)
    }

    fn is_gap(&self) -> bool {
        self.segment >= pattern(self.cue).len()
    }

    /// Even segments sound.
    fn sounding(&self) -> bool {
        !self.is_gap() && self.segment % 2 == 0
    }
}

pub struct CuePlayer<P> {
    pin: P,
    queue: Deque<Cue, QUEUE_CAP>,
    playing: Option<Playing>,
    level: bool,
}

impl<P: OutputPin> CuePlayer<P> {
    /// Wrap a pin that is already LOW (silent).
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            queue: Deque::new(),
            playing: None,
            level: false,
        }
    }

    /// Queue a cue.  Drops it if the queue is full.
    pub fn play(&mut self, cue: Cue) {
        if self.queue.push_back(cue).is_err() {
            warn!("buzzer: queue full, dropping {:?}", cue);
        }
    }

    /// Advance playback by `delta_ms` and update the pin.
    pub fn tick(&mut self, delta_ms: u32) {
        let mut budget = delta_ms;
        loop {
            let Some(mut p) = self.playing.take().or_else(|| self.queue.pop_front().map(Playing::new))
            else {
                break;
            };

            let remaining = p.segment_ms() - p.elapsed_ms;
            if budget < remaining {
                p.elapsed_ms += budget;
                self.playing = Some(p);
                break;
            }

            budget -= remaining;
            if p.is_gap() {
                continue;
            }
            p.segment += 1;
            p.elapsed_ms = 0;
            self.playing = Some(p);
        }

        let on = self.playing.is_some_and(|p| p.sounding());
        self.drive(on);
    }

    pub fn is_sounding(&self) -> bool {
        self.level
    }

    pub fn is_idle(&self) -> bool {
        self.playing.is_none() && self.queue.is_empty()
    }

    fn drive(&mut self, on: bool) {
        if on == self.level {
            return;
        }
        match self.pin.set_state(PinState::from(on)) {
            Ok(()) => self.level = on,
            Err(_) => warn!("buzzer: pin write failed"),
        }
    }
}

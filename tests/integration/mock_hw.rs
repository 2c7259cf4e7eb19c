//! Mock adapters for integration tests.
//!
//! Records every valve and cue command so tests can assert on the full
//! command history without touching real GPIO, and wraps a
//! [`ControlLoop`] in a [`Rig`] that is stepped like the real main loop.

use std::collections::HashMap;

use rofilter::adapters::config_store::ConfigStore;
use rofilter::app::events::AppEvent;
use rofilter::app::ports::{CuePort, EventSink, StorageError, StoragePort, ValvePort};
use rofilter::config::{FilterConfig, POLL_INTERVAL_MS};
use rofilter::control::ControlLoop;
use rofilter::drivers::button::ButtonDriver;
use rofilter::error::{ActuatorError, ActuatorErrorKind};
use rofilter::fsm::context::Cue;
use rofilter::fsm::StateId;
use rofilter::valves::{ValveId, ValveSet};

// ── MockValves ────────────────────────────────────────────────

/// Valve bank + buzzer double.
#[derive(Default)]
pub struct MockValves {
    pub calls: Vec<(ValveId, bool)>,
    pub cues: Vec<Cue>,
    pub open: ValveSet,
    /// Reject the command `(valve, open)` with `NoResponse`.
    pub fail_on: Option<(ValveId, bool)>,
    /// Times two water routes (flush / disposal / output) were open at once.
    pub route_overlaps: usize,
}

#[allow(dead_code)]
impl MockValves {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_set(&self) -> ValveSet {
        self.open
    }
}

impl ValvePort for MockValves {
    fn set_valve(&mut self, valve: ValveId, open: bool) -> Result<(), ActuatorError> {
        self.calls.push((valve, open));
        if self.fail_on == Some((valve, open)) {
            return Err(ActuatorError::new(valve, ActuatorErrorKind::NoResponse));
        }
        if open {
            self.open.insert(valve);
        } else {
            self.open.remove(valve);
        }
        let routes = [ValveId::Flush, ValveId::Disposal, ValveId::Output]
            .into_iter()
            .filter(|v| self.open.contains(*v))
            .count();
        if routes > 1 {
            self.route_overlaps += 1;
        }
        Ok(())
    }
}

impl CuePort for MockValves {
    fn play_cue(&mut self, cue: Cue) {
        self.cues.push(cue);
    }
}

// ── MemStorage ────────────────────────────────────────────────

/// In-memory [`StoragePort`] with switchable write failures.
#[derive(Default)]
pub struct MemStorage {
    data: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, ns: &str, key: &str) -> Option<&Vec<u8>> {
        self.data.get(&format!("{ns}::{key}"))
    }
}

impl StoragePort for MemStorage {
    fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self
            .data
            .get(&format!("{ns}::{key}"))
            .ok_or(StorageError::NotFound)?;
        if data.len() > buf.len() {
            return Err(StorageError::BufferTooSmall);
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.data.insert(format!("{ns}::{key}"), data.to_vec());
        Ok(())
    }

    fn exists(&self, ns: &str, key: &str) -> bool {
        self.data.contains_key(&format!("{ns}::{key}"))
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// A booted controller stepped every [`POLL_INTERVAL_MS`] like `main()`.
pub struct Rig {
    pub control: ControlLoop,
    pub hw: MockValves,
    pub store: ConfigStore<MemStorage>,
    pub sink: RecordingSink,
    pub now_ms: u32,
    pub pressed: bool,
}

#[allow(dead_code)]
impl Rig {
    pub fn boot(config: FilterConfig) -> Self {
        Self::boot_with(config, MockValves::new(), MemStorage::new())
    }

    pub fn boot_with(config: FilterConfig, hw: MockValves, storage: MemStorage) -> Self {
        let mut rig = Self {
            control: ControlLoop::new(config, ButtonDriver::new(0)),
            hw,
            store: ConfigStore::new(storage),
            sink: RecordingSink::default(),
            now_ms: 0,
            pressed: false,
        };
        rig.control.start(&mut rig.hw, &mut rig.sink);
        rig.sample();
        rig
    }

    pub fn state(&self) -> StateId {
        self.control.app().state()
    }

    fn sample(&mut self) {
        self.control.step(
            self.now_ms,
            self.pressed,
            &mut self.hw,
            &mut self.store,
            &mut self.sink,
        );
    }

    /// One loop iteration.
    pub fn step(&mut self) {
        self.now_ms += POLL_INTERVAL_MS;
        self.sample();
    }

    pub fn run_until(&mut self, t_ms: u32) {
        while self.now_ms < t_ms {
            self.step();
        }
    }

    pub fn run_for(&mut self, ms: u32) {
        self.run_until(self.now_ms + ms);
    }

    /// Hold the button for `hold_ms`, release, and step until the release
    /// has been classified.  Returns the time the release was delivered.
    pub fn press(&mut self, hold_ms: u32) -> u32 {
        self.pressed = true;
        self.run_for(hold_ms);
        self.pressed = false;
        while self.control.button().is_held() {
            self.step();
        }
        self.now_ms
    }

    pub fn short_press(&mut self) -> u32 {
        self.press(200)
    }

    pub fn long_press(&mut self) -> u32 {
        self.press(1_600)
    }

    /// Start pressing so that a `hold_ms` press is delivered exactly at
    /// `emit_ms`.
    pub fn press_delivered_at(&mut self, emit_ms: u32, hold_ms: u32) {
        // First pressed sample one step after the start, release
        // classified three steps after the first released sample.
        self.run_until(emit_ms - hold_ms - 4 * POLL_INTERVAL_MS);
        let delivered = self.press(hold_ms);
        assert_eq!(delivered, emit_ms, "press timing drifted");
    }
}

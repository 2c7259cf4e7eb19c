//! Hardware adapter — bridges the valve bank and buzzer to domain ports.
//!
//! Owns the [`ValveBank`] and the [`CuePlayer`], exposing them through
//! [`ValvePort`] and [`CuePort`].  This is the only module in the system
//! that commands real outputs.  On non-espidf targets the underlying
//! [`RawPin`]s keep their level in memory.

use embedded_hal::digital::StatefulOutputPin;

use crate::app::ports::{CuePort, ValvePort};
use crate::drivers::buzzer::CuePlayer;
use crate::drivers::hw_init::RawPin;
use crate::drivers::valve::ValveBank;
use crate::error::ActuatorError;
use crate::fsm::context::Cue;
use crate::pins;
use crate::valves::{ValveId, ValveSet};

/// Concrete adapter that combines all outputs behind port traits.
pub struct HardwareAdapter<P> {
    valves: ValveBank<P>,
    buzzer: CuePlayer<P>,
}

impl<P: StatefulOutputPin> HardwareAdapter<P> {
    pub fn new(valves: ValveBank<P>, buzzer: CuePlayer<P>) -> Self {
        Self { valves, buzzer }
    }

    /// Advance the buzzer pattern.  Called once per loop iteration.
    pub fn tick(&mut self, delta_ms: u32) {
        self.buzzer.tick(delta_ms);
    }

    /// Valves the drivers last confirmed open.
    pub fn open_set(&self) -> ValveSet {
        self.valves.open_set()
    }

    pub fn is_buzzer_idle(&self) -> bool {
        self.buzzer.is_idle()
    }
}

impl HardwareAdapter<RawPin> {
    /// Build the adapter over the board's GPIO assignments.  Pins must
    /// already be configured by
    /// [`init_peripherals`](crate::drivers::hw_init::init_peripherals).
    pub fn from_pins() -> Self {
        let idle_high = pins::VALVE_ACTIVE_LOW;
        let valves = ValveBank::new(
            [
                RawPin::new(pins::VALVE_FEED_GPIO, idle_high),
                RawPin::new(pins::VALVE_FLUSH_GPIO, idle_high),
                RawPin::new(pins::VALVE_DISPOSAL_GPIO, idle_high),
                RawPin::new(pins::VALVE_OUTPUT_GPIO, idle_high),
            ],
            pins::VALVE_ACTIVE_LOW,
        );
        let buzzer = CuePlayer::new(RawPin::new(pins::BUZZER_GPIO, false));
        Self::new(valves, buzzer)
    }
}

// ── ValvePort implementation ──────────────────────────────────

impl<P: StatefulOutputPin> ValvePort for HardwareAdapter<P> {
    fn set_valve(&mut self, valve: ValveId, open: bool) -> Result<(), ActuatorError> {
        self.valves.set(valve, open)
    }
}

// ── CuePort implementation ────────────────────────────────────

impl<P: StatefulOutputPin> CuePort for HardwareAdapter<P> {
    fn play_cue(&mut self, cue: Cue) {
        self.buzzer.play(cue);
    }
}

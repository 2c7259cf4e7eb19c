//! Solenoid valve driver (relay module, one line per valve).
//!
//! ## Safety contract
//!
//! Which valves may be open together is decided by the service; this
//! driver is a dumb actuator.  It does verify that the commanded level
//! actually reached the pin and reports [`ActuatorErrorKind::NoResponse`]
//! when it did not.
//!
//! ## Dual-target design
//!
//! Generic over any `embedded-hal` [`StatefulOutputPin`].  On ESP-IDF the
//! pins are [`RawPin`](crate::drivers::hw_init::RawPin)s over the
//! configured GPIOs; tests substitute in-memory pins.

use embedded_hal::digital::{PinState, StatefulOutputPin};
use log::debug;

use crate::error::{ActuatorError, ActuatorErrorKind};
use crate::valves::{ValveId, ValveSet};

pub struct ValveDriver<P> {
    id: ValveId,
    pin: P,
    /// Pin level LOW opens the valve.
    active_low: bool,
    open: bool,
}

impl<P: StatefulOutputPin> ValveDriver<P> {
    /// Wrap a pin that is already at its closed level.
    pub fn new(id: ValveId, pin: P, active_low: bool) -> Self {
        Self {
            id,
            pin,
            active_low,
            open: false,
        }
    }

    pub fn set(&mut self, open: bool) -> Result<(), ActuatorError> {
        let high = open != self.active_low;

        self.pin
            .set_state(PinState::from(high))
            .map_err(|_| ActuatorError::new(self.id, ActuatorErrorKind::GpioWriteFailed))?;

        match self.pin.is_set_high() {
            Ok(level) if level == high => {}
            _ => return Err(ActuatorError::new(self.id, ActuatorErrorKind::NoResponse)),
        }

        if self.open != open {
            debug!("valve {}: {}", self.id, if open { "open" } else { "closed" });
        }
        self.open = open;
        Ok(())
    }

    pub fn id(&self) -> ValveId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// The four valves of the rig, indexed by [`ValveId`].
pub struct ValveBank<P> {
    valves: [ValveDriver<P>; ValveId::COUNT],
}

impl<P: StatefulOutputPin> ValveBank<P> {
    /// `pins` in [`ValveId::ALL`] order.
    pub fn new(pins: [P; ValveId::COUNT], active_low: bool) -> Self {
        let mut ids = ValveId::ALL.into_iter();
        let valves = pins.map(|pin| {
            let id = ids.next().unwrap_or(ValveId::Feed);
            ValveDriver::new(id, pin, active_low)
        });
        Self { valves }
    }

    pub fn set(&mut self, valve: ValveId, open: bool) -> Result<(), ActuatorError> {
        self.valves[valve as usize].set(open)
    }

    /// Valves the drivers last confirmed open.
    pub fn open_set(&self) -> ValveSet {
        let mut set = ValveSet::CLOSED;
        for v in self.valves.iter().filter(|v| v.is_open()) {
            set.insert(v.id());
        }
        set
    }
}

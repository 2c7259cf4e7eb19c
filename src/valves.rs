//! Logical valves and the phase → open-valve truth table.
//!
//! ```text
//!  valve      Idle  Flushing  Disposing  Filtering  Saving
//!  Feed        -       X          X          X         -
//!  Flush       -       X          -          -         -
//!  Disposal    -       -          X          -         -
//!  Output      -       -          -          X         -
//! ```
//!
//! The feed valve admits raw water to the membrane and is open in every
//! water-moving phase.  The second valve of each phase selects where the
//! water goes.  Valves not listed for a phase are closed.

use core::fmt;

use crate::fsm::StateId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValveId {
    /// Raw-water inlet to the membrane housing.
    Feed = 0,
    /// Concentrate line, opened to flush the membrane at full flow.
    Flush = 1,
    /// Permeate to drain, discards the first filtered water.
    Disposal = 2,
    /// Permeate to the tap.
    Output = 3,
}

impl ValveId {
    pub const COUNT: usize = 4;
    pub const ALL: [ValveId; Self::COUNT] = [Self::Feed, Self::Flush, Self::Disposal, Self::Output];

    const fn mask(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for ValveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Feed => "feed",
            Self::Flush => "flush",
            Self::Disposal => "disposal",
            Self::Output => "output",
        };
        f.write_str(name)
    }
}

/// Set of open valves, one bit per [`ValveId`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ValveSet(u8);

impl ValveSet {
    pub const CLOSED: Self = Self(0);

    pub const fn of(valves: &[ValveId]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < valves.len() {
            bits |= valves[i].mask();
            i += 1;
        }
        Self(bits)
    }

    /// The valves that must be open while `phase` is active.
    pub const fn for_phase(phase: StateId) -> Self {
        match phase {
            StateId::Idle | StateId::Saving => Self::CLOSED,
            StateId::Flushing => Self::of(&[ValveId::Feed, ValveId::Flush]),
            StateId::Disposing => Self::of(&[ValveId::Feed, ValveId::Disposal]),
            StateId::Filtering => Self::of(&[ValveId::Feed, ValveId::Output]),
        }
    }

    pub const fn contains(self, valve: ValveId) -> bool {
        self.0 & valve.mask() != 0
    }

    pub fn insert(&mut self, valve: ValveId) {
        self.0 |= valve.mask();
    }

    pub fn remove(&mut self, valve: ValveId) {
        self.0 &= !valve.mask();
    }

    pub const fn is_closed(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = ValveId> {
        ValveId::ALL.into_iter().filter(move |v| self.contains(*v))
    }
}

impl fmt::Debug for ValveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

//! Unified error types for the RO rig firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform.  All variants are `Copy` so they
//! travel through the FSM and event sink without allocation.

use core::fmt;

use crate::valves::ValveId;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Persistent storage could not be read or written.
    ConfigIo,
    /// A valve relay did not accept its command.  Fatal to the running phase.
    ActuatorFault(ValveId),
    /// A stored duration was missing, non-positive, or out of range.
    /// Carries the field name.
    InvalidConfigValue(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigIo => write!(f, "config storage I/O failed"),
            Self::ActuatorFault(valve) => write!(f, "actuator fault on {valve} valve"),
            Self::InvalidConfigValue(field) => write!(f, "invalid config value for {field}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorError {
    pub valve: ValveId,
    pub kind: ActuatorErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorErrorKind {
    /// The GPIO driver rejected the level change.
    GpioWriteFailed,
    /// Read-back after the write did not match the commanded level.
    NoResponse,
}

impl ActuatorError {
    pub const fn new(valve: ValveId, kind: ActuatorErrorKind) -> Self {
        Self { valve, kind }
    }
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ActuatorErrorKind::GpioWriteFailed => write!(f, "{} valve: GPIO write failed", self.valve),
            ActuatorErrorKind::NoResponse => write!(f, "{} valve: no response", self.valve),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::ActuatorFault(e.valve)
    }
}

impl From<crate::app::ports::ConfigError> for Error {
    fn from(e: crate::app::ports::ConfigError) -> Self {
        match e {
            crate::app::ports::ConfigError::ValidationFailed(field) => Self::InvalidConfigValue(field),
            _ => Self::ConfigIo,
        }
    }
}

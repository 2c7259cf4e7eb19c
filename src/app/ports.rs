//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (valves, buzzer, event sinks, storage) implement these
//! traits.  The [`AppService`](super::service::AppService) consumes them via
//! generics, so the domain core never touches hardware directly.
//!
//! ## Contract notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **StoragePort** writes MUST be atomic per key.
//! - All port errors are typed — callers must handle every variant explicitly.

use crate::config::FilterConfig;
use crate::error::ActuatorError;
use crate::fsm::context::Cue;
use crate::valves::{ValveId, ValveSet};

// ───────────────────────────────────────────────────────────────
// Valve port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to open and close valves.
pub trait ValvePort {
    /// Drive one valve.  `open = true` opens it.
    fn set_valve(&mut self, valve: ValveId, open: bool) -> Result<(), ActuatorError>;

    /// Close every valve, attempting all of them even if one fails.
    /// Returns the first failure.
    fn close_all(&mut self) -> Result<(), ActuatorError> {
        let mut first_err = None;
        for valve in ValveId::ALL {
            if let Err(e) = self.set_valve(valve, false) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Drive the bank to exactly `to`, closing before opening so that two
    /// water routes are never open at once.  Every valve is commanded once.
    fn apply(&mut self, to: ValveSet) -> Result<(), ActuatorError> {
        for valve in ValveId::ALL.into_iter().filter(|v| !to.contains(*v)) {
            self.set_valve(valve, false)?;
        }
        for valve in to.iter() {
            self.set_valve(valve, true)?;
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Cue port (driven adapter: domain → buzzer)
// ───────────────────────────────────────────────────────────────

/// Plays audible feedback.  Must not block the control loop; an adapter
/// that cannot play now may queue or drop the cue.
pub trait CuePort {
    fn play_cue(&mut self, cue: Cue);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the rig's timing configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    ///
    /// A missing or unreadable record yields [`FilterConfig::default()`],
    /// which the implementation writes back.  `Err` is reserved for storage
    /// that cannot be reached at all.
    fn load(&mut self) -> Result<FilterConfig, ConfigError>;

    /// Validate and persist configuration.  On any error the previously
    /// stored record stays readable.
    fn save(&mut self, config: &FilterConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic — no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively; the in-memory
///   simulation achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from event system)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when a timer fires.
///
/// The [`AutoFlushScheduler`](crate::scheduler::AutoFlushScheduler) knows
/// nothing about queues; the main loop forwards fires into the
/// [`EventQueue`](crate::events::EventQueue).
pub trait SchedulerDelegate {
    /// * `label` — the human-readable label of the timer that fired.
    fn on_schedule_fired(&mut self, label: &str);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.  Carries the field name.
    ValidationFailed(&'static str),
    /// The storage backend could not be read or written.
    Io,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Caller's buffer is smaller than the stored value.
    BufferTooSmall,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ValidationFailed(field) => write!(f, "validation failed: {}", field),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

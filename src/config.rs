//! Rig timing parameters
//!
//! The five durations that drive every run.  Loaded once at boot through
//! the [`ConfigPort`](crate::app::ports::ConfigPort), held in memory, and
//! rewritten only when the user saves a new filtration length.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Design constants (not user-configurable)
// ---------------------------------------------------------------------------

/// Button edges must be stable this long before they count.
pub const DEBOUNCE_MS: u32 = 50;
/// Presses held at least this long are classified as long presses.
pub const LONG_PRESS_MS: u32 = 1500;
/// Main loop / button sampling period.
pub const POLL_INTERVAL_MS: u32 = 20;
/// Hard cap of a long-press (extended) filtration run.
pub const EXTENDED_RUN_SECS: u32 = 60 * 60;
/// Shortest filtration length that may be saved as `filter_sec`.
pub const MIN_FILTER_SECS: u32 = 30;

// ---------------------------------------------------------------------------
// Field ranges
// ---------------------------------------------------------------------------

const FLUSH_RANGE: (u32, u32) = (1, 3600);
const DISPOSAL_RANGE: (u32, u32) = (1, 3600);
const FILTER_RANGE: (u32, u32) = (MIN_FILTER_SECS, EXTENDED_RUN_SECS);
const AUTO_FLUSH_RANGE: (u32, u32) = (60, 7 * 24 * 60 * 60);
const WATER_CLEAN_RANGE: (u32, u32) = (1, 24 * 60 * 60);

/// Timing configuration, all values in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Membrane flush at full flow, output discarded.
    pub flush_sec: u32,
    /// First filtered water discarded before collection starts.
    pub disposal_sec: u32,
    /// Length of a standard (short-press) filtration run.
    pub filter_sec: u32,
    /// Idle period after which a maintenance flush is requested.
    pub auto_flush_sec: u32,
    /// How long after a run the membrane still counts as rinsed.
    pub water_clean_sec: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            flush_sec: 60,
            disposal_sec: 60,
            filter_sec: 300,
            auto_flush_sec: 8 * 60 * 60,
            water_clean_sec: 5 * 60,
        }
    }
}

/// Untyped mirror of [`FilterConfig`] used when decoding a stored record.
/// Each field keeps whatever JSON value was stored so that a missing,
/// negative or wrongly typed value is repaired on its own instead of
/// rejecting the whole record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFilterConfig {
    pub flush_sec: Option<Value>,
    pub disposal_sec: Option<Value>,
    pub filter_sec: Option<Value>,
    pub auto_flush_sec: Option<Value>,
    pub water_clean_sec: Option<Value>,
}

impl FilterConfig {
    /// Check every field against its range.
    ///
    /// Returns the first offending field as [`Error::InvalidConfigValue`].
    pub fn validate(&self) -> Result<(), Error> {
        let fields = [
            ("flush_sec", self.flush_sec, FLUSH_RANGE),
            ("disposal_sec", self.disposal_sec, DISPOSAL_RANGE),
            ("filter_sec", self.filter_sec, FILTER_RANGE),
            ("auto_flush_sec", self.auto_flush_sec, AUTO_FLUSH_RANGE),
            ("water_clean_sec", self.water_clean_sec, WATER_CLEAN_RANGE),
        ];
        for (name, value, (lo, hi)) in fields {
            if !(lo..=hi).contains(&value) {
                return Err(Error::InvalidConfigValue(name));
            }
        }
        Ok(())
    }

    /// Build a config from a decoded record, substituting the default for
    /// each field that is missing, not a whole number, or out of range.
    ///
    /// Returns the repaired config and the number of fields replaced.
    pub fn sanitize(raw: &RawFilterConfig) -> (Self, usize) {
        let defaults = Self::default();
        let mut repaired = 0;
        let mut pick = |name: &'static str, value: &Option<Value>, (lo, hi): (u32, u32), fallback: u32| {
            let secs = value
                .as_ref()
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok());
            match secs {
                Some(v) if (lo..=hi).contains(&v) => v,
                _ => {
                    repaired += 1;
                    warn!(
                        "{} ({:?}), using default {}s",
                        Error::InvalidConfigValue(name),
                        value,
                        fallback
                    );
                    fallback
                }
            }
        };

        let cfg = Self {
            flush_sec: pick("flush_sec", &raw.flush_sec, FLUSH_RANGE, defaults.flush_sec),
            disposal_sec: pick("disposal_sec", &raw.disposal_sec, DISPOSAL_RANGE, defaults.disposal_sec),
            filter_sec: pick("filter_sec", &raw.filter_sec, FILTER_RANGE, defaults.filter_sec),
            auto_flush_sec: pick(
                "auto_flush_sec",
                &raw.auto_flush_sec,
                AUTO_FLUSH_RANGE,
                defaults.auto_flush_sec,
            ),
            water_clean_sec: pick(
                "water_clean_sec",
                &raw.water_clean_sec,
                WATER_CLEAN_RANGE,
                defaults.water_clean_sec,
            ),
        };
        (cfg, repaired)
    }
}

//! GPIO pin assignments for the RO rig controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Solenoid valves (relay module, active LOW)
// ---------------------------------------------------------------------------

/// Raw-water feed to the membrane housing.
pub const VALVE_FEED_GPIO: i32 = 4;
/// Concentrate flush line.
pub const VALVE_FLUSH_GPIO: i32 = 5;
/// Permeate to drain.
pub const VALVE_DISPOSAL_GPIO: i32 = 6;
/// Permeate to the tap.
pub const VALVE_OUTPUT_GPIO: i32 = 7;

/// Relay inputs are pulled up on the module: driving LOW energises the
/// coil and opens the valve.
pub const VALVE_ACTIVE_LOW: bool = true;

// ---------------------------------------------------------------------------
// Buzzer (active piezo, driven HIGH)
// ---------------------------------------------------------------------------

pub const BUZZER_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// User input
// ---------------------------------------------------------------------------

/// Momentary push-button, active LOW with internal pull-up.
pub const BUTTON_GPIO: i32 = 16;

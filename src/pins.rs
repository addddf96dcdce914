//! GPIO pin assignments for the brewctl controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// TSic 306 boiler sensor (ZACwire)
// ---------------------------------------------------------------------------

/// Digital input: ZACwire data line.  Both edges are captured by the ISR.
pub const TSIC_DATA_GPIO: i32 = 20;
/// Digital output: sensor supply.  HIGH = powered.
pub const TSIC_POWER_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Heater
// ---------------------------------------------------------------------------

/// Digital output: solid-state relay driving the boiler element (active HIGH).
pub const SSR_GPIO: i32 = 19;

// ---------------------------------------------------------------------------
// Front panel
// ---------------------------------------------------------------------------

/// Digital input: push button, active-low with internal pull-up.
pub const BUTTON_GPIO: i32 = 2;

//! Unified error types for the brewctl firmware.
//!
//! Sensor and safety conditions are small `Copy` enums so they can be
//! carried through the controller and into status reports without
//! allocation.  They are sentinels, not failures.  Requests that can be
//! refused funnel into [`Error`] at the API boundary.

use core::fmt;

use crate::app::ports::ConfigError;
use crate::scheduler::ScheduleError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Settings could not be validated or persisted.
    Config(ConfigError),
    /// A power-on schedule or clock update was refused.
    Schedule(ScheduleError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Schedule(e) => write!(f, "schedule: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// One of the two frame parity bits did not match its data bits.
    WrongParity,
    /// The capture ended before all edges of a transmission arrived.
    IncompleteCapture,
    /// Sensor is powered down or silent for longer than the staleness window.
    NotRunning,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongParity => write!(f, "wrong parity"),
            Self::IncompleteCapture => write!(f, "incomplete capture"),
            Self::NotRunning => write!(f, "sensor not running"),
        }
    }
}

// ---------------------------------------------------------------------------
// Safety trips
// ---------------------------------------------------------------------------

/// Reasons the controller was forced off.  A trip latches until the
/// operator powers the machine back on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyTrip {
    /// Too many consecutive readings jumped further than the plausibility step.
    ImplausibleReadings,
}

impl SafetyTrip {
    /// Short reason text for the shutdown screen.
    pub const fn reason(self) -> &'static str {
        match self {
            Self::ImplausibleReadings => "BAD READINGS",
        }
    }
}

impl fmt::Display for SafetyTrip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImplausibleReadings => write!(f, "too many implausible temperature readings"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ScheduleError> for Error {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

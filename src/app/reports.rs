//! Read-only projections of the controller state.
//!
//! The JSON field names match what the web front-end already expects,
//! hence the `serde(rename)`s.

use core::fmt;

use serde::Serialize;

use crate::config::Mode;
use crate::error::SafetyTrip;
use crate::scheduler::TimeOfDay;

/// Band around the setpoint in which the boiler counts as ready.
pub const READY_BAND_C: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub power: bool,
    pub current_temp: Option<f32>,
    pub setpoint: Option<f32>,
    pub mode: Mode,
    /// Echo of the client's polling flag.
    #[serde(rename = "on_interval")]
    pub poll_interval: serde_json::Value,
    #[serde(rename = "pwm_val")]
    pub duty: f32,
    #[serde(rename = "alarm_time")]
    pub scheduled_time: Option<String>,
}

/// Oldest-first, padded with `None` to the full history length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryReport {
    pub setpoint_history: Vec<Option<f32>>,
    #[serde(rename = "temp_history")]
    pub temperature_history: Vec<Option<f32>>,
}

// ── Display ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusText {
    Off,
    /// Off with a pending power-on.
    PowerOnAt(TimeOfDay),
    /// On but no temperature or setpoint yet.
    Standby,
    Heating,
    Cool,
    Ready,
}

impl StatusText {
    pub fn classify(
        power: bool,
        scheduled: Option<TimeOfDay>,
        current: Option<f32>,
        setpoint: Option<f32>,
    ) -> Self {
        if !power {
            return scheduled.map_or(Self::Off, Self::PowerOnAt);
        }
        match (current, setpoint) {
            (Some(t), Some(sp)) if t < sp - READY_BAND_C => Self::Heating,
            (Some(t), Some(sp)) if t > sp + READY_BAND_C => Self::Cool,
            (Some(_), Some(_)) => Self::Ready,
            _ => Self::Standby,
        }
    }
}

impl fmt::Display for StatusText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("OFF"),
            Self::PowerOnAt(at) => write!(f, "On@{at}"),
            Self::Standby => f.write_str("STANDBY"),
            Self::Heating => f.write_str("HEATING"),
            Self::Cool => f.write_str("COOL"),
            Self::Ready => f.write_str("READY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayView {
    pub status: StatusText,
    pub mode: Mode,
    /// Whole percent, truncated.
    pub duty_percent: u8,
    pub current_temp: Option<f32>,
    pub setpoint: Option<f32>,
    pub power: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen {
    Status(DisplayView),
    /// Shown after a safety trip or a firmware shutdown.
    Shutdown { reason: Option<SafetyTrip> },
}

//! Controller configuration.
//!
//! [`Settings`] is the operator-tunable part: PID gains and the target
//! temperature of each brew mode.  It is persisted as a small JSON document
//! (`{"PID":{"P":..,"I":..,"D":..},"mode_temps":{"espresso":..,"steam":..}}`)
//! so the web front-end can read and write it unchanged.
//!
//! [`Timing`] holds the fixed cadences of the cooperative tasks.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Highest temperature the sensor can report, and therefore the highest
/// target a mode may be given.
pub const MAX_TARGET_C: f32 = 150.0;

// ── Brew mode ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Espresso,
    Steam,
}

impl Mode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Espresso => "espresso",
            Self::Steam => "steam",
        }
    }

    /// The other mode.  Long-pressing the button flips between the two.
    pub const fn toggled(self) -> Self {
        match self {
            Self::Espresso => Self::Steam,
            Self::Steam => Self::Espresso,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a mode name is not one of the known profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMode;

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "espresso" => Ok(Self::Espresso),
            "steam" => Ok(Self::Steam),
            _ => Err(UnknownMode),
        }
    }
}

// ── Persisted settings ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    #[serde(rename = "P")]
    pub kp: f32,
    #[serde(rename = "I")]
    pub ki: f32,
    #[serde(rename = "D")]
    pub kd: f32,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
        }
    }
}

/// Target boiler temperature (°C) per mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeTargets {
    pub espresso: f32,
    pub steam: f32,
}

impl ModeTargets {
    pub const fn target(&self, mode: Mode) -> f32 {
        match mode {
            Mode::Espresso => self.espresso,
            Mode::Steam => self.steam,
        }
    }
}

impl Default for ModeTargets {
    fn default() -> Self {
        Self {
            espresso: 98.0,
            steam: 120.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "PID")]
    pub pid: PidGains,
    pub mode_temps: ModeTargets,
}

impl Settings {
    /// Range-check every field.  Out-of-range values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let gains = [self.pid.kp, self.pid.ki, self.pid.kd];
        if gains.iter().any(|g| !g.is_finite() || *g < 0.0) {
            return Err(ConfigError::ValidationFailed(
                "PID gains must be finite and non-negative",
            ));
        }
        let valid_target = |t: f32| t.is_finite() && (0.0..=MAX_TARGET_C).contains(&t);
        if !valid_target(self.mode_temps.espresso) {
            return Err(ConfigError::ValidationFailed(
                "espresso target must be 0–150 °C",
            ));
        }
        if !valid_target(self.mode_temps.steam) {
            return Err(ConfigError::ValidationFailed(
                "steam target must be 0–150 °C",
            ));
        }
        Ok(())
    }
}

// ── Task cadences ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    /// Minimum interval between accepted PID samples.
    pub pid_sample_ms: u64,
    /// Software PWM frequency for the heater SSR.
    pub pwm_freq_hz: f32,
    /// Settle time after a new sample before the display refreshes (ON).
    pub sample_settle_ms: u64,
    /// Delay after the history push, and again after the setpoint push.
    pub history_step_ms: u64,
    /// Remainder of the one-second control cycle after the duty update.
    pub control_rest_ms: u64,
    pub button_poll_ms: u64,
    pub long_press_ms: u32,
    /// Sensor warm-up before an idle reading is taken while OFF.
    pub idle_warmup_secs: u64,
    /// Interval between idle readings while OFF.
    pub idle_period_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            pid_sample_ms: 100,
            pwm_freq_hz: 0.25,
            sample_settle_ms: 500,
            history_step_ms: 100,
            control_rest_ms: 800,
            button_poll_ms: 50,
            long_press_ms: 2000,
            idle_warmup_secs: 2,
            idle_period_secs: 10,
        }
    }
}

impl Timing {
    /// Length of one full control-task cycle.
    pub const fn control_cycle_ms(&self) -> u64 {
        2 * self.history_step_ms + self.control_rest_ms
    }
}

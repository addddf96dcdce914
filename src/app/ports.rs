//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (sensor, heater, clock, display, storage) implement these
//! traits.  The [`Controller`](super::service::Controller) is generic over
//! them, so the domain core never touches hardware directly and every
//! operation can be exercised on the host with mocks.

use crate::config::Settings;
use crate::sensors::zacwire::{DecoderHealth, Reading};

use super::reports::Screen;

// ───────────────────────────────────────────────────────────────
// Sensor line (driven adapter: decoder → GPIO)
// ───────────────────────────────────────────────────────────────

/// Supply and interrupt control of the sensor's data line.
pub trait SensorLine {
    /// Power the sensor and enable edge interrupts.
    fn power_up(&mut self);

    /// Disable edge interrupts and cut sensor power.
    fn power_down(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

pub trait SensorPort {
    fn start(&mut self);

    /// Idempotent.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Decode the burst that just completed.
    fn decode_pending(&mut self) -> Reading;

    /// Smoothed reading at monotonic time `now_us` (wrapping µs counter).
    fn reading(&mut self, now_us: u32) -> Reading;

    fn health(&self) -> DecoderHealth;
}

// ───────────────────────────────────────────────────────────────
// Heater port (driven adapter: domain → SSR)
// ───────────────────────────────────────────────────────────────

pub trait HeaterPort {
    /// Duty fraction 0.0–1.0, applied from the next PWM cycle.
    fn set_duty(&mut self, duty: f32);

    /// Zero duty and pull the SSR low now; the PWM task keeps running.
    fn force_off(&mut self);

    /// Stop the PWM task for good and leave the SSR low.
    fn shutdown(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Microseconds since boot (monotonic).
    fn uptime_us(&self) -> u64;

    fn uptime_ms(&self) -> u64 {
        self.uptime_us() / 1_000
    }

    /// Wall-clock seconds since the Unix epoch; `None` until the clock is set.
    fn unix_secs(&self) -> Option<u64>;

    /// Local seconds since midnight; `None` until the clock is set.
    fn seconds_of_day(&self) -> Option<u32>;

    /// Step the wall clock to `unix_secs`.  Returns `false` if the
    /// platform refused it.
    fn set_wall_clock(&mut self, unix_secs: u64) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Display port
// ───────────────────────────────────────────────────────────────

/// Front-panel display.  Rendering failures are the adapter's problem;
/// nothing in the core depends on them.
pub trait DisplayPort {
    fn show(&mut self, screen: &Screen);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent settings)
// ───────────────────────────────────────────────────────────────

/// Loads and persists operator settings.
///
/// Implementations MUST validate before persisting and reject invalid
/// values with [`ConfigError::ValidationFailed`] rather than clamp them.
pub trait ConfigPort {
    /// Load settings.  Returns [`Settings::default()`] if none are stored.
    fn load(&self) -> Result<Settings, ConfigError>;

    /// Validate and persist settings.
    fn save(&self, settings: &Settings) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored document failed to parse.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "settings corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

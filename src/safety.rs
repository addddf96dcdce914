//! Plausibility filter for boiler temperature samples.
//!
//! Runs on every sample before the controller accepts a temperature.
//!
//! ## Policy
//!
//! 1. No reading (sensor sentinel): keep the previous temperature.
//! 2. First reading, or one within `max_step_c` of the last accepted
//!    value: accept it and clear the bad-reading counter.
//! 3. A jump larger than `max_step_c`: hold the previous value and count
//!    it.  Once more than `max_bad_readings` jumps arrive back to back,
//!    the filter trips and the controller must force itself off.
//!
//! The trip latches until [`SafetyFilter::reset`], which the controller
//! calls on power-on.

use log::{error, warn};

use crate::error::SafetyTrip;

pub const MAX_STEP_C: f32 = 5.0;
pub const MAX_BAD_READINGS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accepted(f32),
    /// Sensor had nothing; the previous value stands.
    NoReading,
    /// Implausible jump; the previous value stands.
    Rejected { held: f32, consecutive: u32 },
    Trip(SafetyTrip),
}

pub struct SafetyFilter {
    max_step_c: f32,
    max_bad_readings: u32,
    last_good: Option<f32>,
    bad_count: u32,
    tripped: Option<SafetyTrip>,
}

impl Default for SafetyFilter {
    fn default() -> Self {
        Self::new(MAX_STEP_C, MAX_BAD_READINGS)
    }
}

impl SafetyFilter {
    pub fn new(max_step_c: f32, max_bad_readings: u32) -> Self {
        Self {
            max_step_c,
            max_bad_readings,
            last_good: None,
            bad_count: 0,
            tripped: None,
        }
    }

    /// Evaluate one sample in °C (`None` = sensor sentinel).
    pub fn evaluate(&mut self, sample: Option<f32>) -> Verdict {
        if let Some(trip) = self.tripped {
            return Verdict::Trip(trip);
        }
        let Some(celsius) = sample else {
            return Verdict::NoReading;
        };

        match self.last_good {
            Some(prev) if (celsius - prev).abs() > self.max_step_c => {
                self.bad_count += 1;
                if self.bad_count > self.max_bad_readings {
                    let trip = SafetyTrip::ImplausibleReadings;
                    error!(
                        "SAFETY TRIP: {} ({} in a row, last {:.1} °C vs {:.1} °C)",
                        trip, self.bad_count, celsius, prev
                    );
                    self.tripped = Some(trip);
                    return Verdict::Trip(trip);
                }
                warn!(
                    "safety: rejected {:.1} °C (held {:.1} °C, {} in a row)",
                    celsius, prev, self.bad_count
                );
                Verdict::Rejected {
                    held: prev,
                    consecutive: self.bad_count,
                }
            }
            _ => {
                self.last_good = Some(celsius);
                self.bad_count = 0;
                Verdict::Accepted(celsius)
            }
        }
    }

    pub fn tripped(&self) -> Option<SafetyTrip> {
        self.tripped
    }

    pub fn bad_count(&self) -> u32 {
        self.bad_count
    }

    /// Forget history and clear a latched trip.
    pub fn reset(&mut self) {
        self.last_good = None;
        self.bad_count = 0;
        self.tripped = None;
    }
}

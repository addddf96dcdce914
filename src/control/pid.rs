//! PID controller for boiler temperature.
//!
//! Sample-time gated: calls that arrive sooner than `sample_time_ms`
//! after the last accepted sample return the previous output.  The
//! integral is clamped (anti-windup) and the derivative acts on the
//! measurement so a setpoint change does not kick the output.
//!
//! Output is computed in percent (`output_min..=output_max`, default
//! 0–100) and returned as a fraction for the PWM heater.

use crate::config::PidGains;

pub const DEFAULT_SAMPLE_MS: u64 = 100;

/// PID controller
pub struct PidController {
    kp: f32,
    ki: f32,
    kd: f32,
    setpoint: Option<f32>,
    sample_time_ms: u64,
    output_min: f32,
    output_max: f32,
    integral_min: f32,
    integral_max: f32,
    integral: f32,
    last_error: f32,
    last_measurement: Option<f32>,
    last_time_ms: Option<u64>,
    output: f32,
}

impl PidController {
    pub fn new(gains: PidGains, setpoint: Option<f32>) -> Self {
        Self {
            kp: gains.kp,
            ki: gains.ki,
            kd: gains.kd,
            setpoint,
            sample_time_ms: DEFAULT_SAMPLE_MS,
            output_min: 0.0,
            output_max: 100.0,
            integral_min: 0.0,
            integral_max: 20.0,
            integral: 0.0,
            last_error: 0.0,
            last_measurement: None,
            last_time_ms: None,
            output: 0.0,
        }
    }

    pub fn with_sample_time(mut self, sample_time_ms: u64) -> Self {
        self.sample_time_ms = sample_time_ms;
        self
    }

    /// Set output limits (percent)
    pub fn set_limits(&mut self, min: f32, max: f32) {
        self.output_min = min;
        self.output_max = max;
    }

    pub fn set_integral_limits(&mut self, min: f32, max: f32) {
        self.integral_min = min;
        self.integral_max = max;
        self.integral = self.integral.clamp(min, max);
    }

    pub fn set_tunings(&mut self, gains: PidGains) {
        self.kp = gains.kp;
        self.ki = gains.ki;
        self.kd = gains.kd;
    }

    pub fn tunings(&self) -> PidGains {
        PidGains {
            kp: self.kp,
            ki: self.ki,
            kd: self.kd,
        }
    }

    /// `None` parks the controller: the next `compute` resets and returns 0.
    pub fn set_setpoint(&mut self, setpoint: Option<f32>) {
        self.setpoint = setpoint;
    }

    pub fn setpoint(&self) -> Option<f32> {
        self.setpoint
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Compute the heater duty fraction (0.0–1.0) for `measurement` at
    /// monotonic time `now_ms`.
    pub fn compute(&mut self, measurement: f32, now_ms: u64) -> f32 {
        let Some(setpoint) = self.setpoint else {
            self.reset();
            self.output = 0.0;
            self.last_time_ms = Some(now_ms);
            return 0.0;
        };

        let elapsed_ms = self
            .last_time_ms
            .map_or(self.sample_time_ms, |last| now_ms.saturating_sub(last));
        if elapsed_ms < self.sample_time_ms {
            return self.output / 100.0;
        }
        let dt = elapsed_ms as f32 / 1000.0;

        let error = setpoint - measurement;

        // Proportional
        let p = self.kp * error;

        // Integral (clamped)
        self.integral = (self.integral + error * dt).clamp(self.integral_min, self.integral_max);
        let i = self.ki * self.integral;

        // Derivative on measurement
        let d = match self.last_measurement {
            Some(prev) if dt > 0.0 => self.kd * (measurement - prev) / dt,
            _ => 0.0,
        };

        self.output = (p + i - d).clamp(self.output_min, self.output_max);
        self.last_error = error;
        self.last_measurement = Some(measurement);
        self.last_time_ms = Some(now_ms);

        self.output / 100.0
    }

    /// Clear integral and derivative memory; gains and setpoint are kept.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_measurement = None;
    }
}

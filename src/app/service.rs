//! Controller — the hexagonal core.
//!
//! [`Controller`] owns the control state (power, mode, setpoint, current
//! temperature, duty), the PID loop, the safety filter, the history ring
//! and the pending power-on schedule.  It is the only writer of that state.
//! All I/O flows through the port traits it is generic over, so the whole
//! service runs on the host against mock adapters.
//!
//! ```text
//!   SensorPort ──▶ ┌─────────────────────────┐ ──▶ HeaterPort
//!                  │       Controller         │
//!    ClockPort ──▶ │  Safety · PID · History  │ ──▶ Screen / reports
//!                  └─────────────────────────┘
//! ```
//!
//! ## Power state
//!
//! | From | Event                  | To  | Effect                                   |
//! |------|------------------------|-----|------------------------------------------|
//! | OFF  | power on / alarm       | ON  | setpoint = mode target, sensor started   |
//! | ON   | power off              | OFF | setpoint cleared, sensor stopped, SSR low|
//! | ON   | safety trip            | OFF | as power off, trip latched for display   |
//! | ON   | mode switch            | ON  | setpoint = new mode target               |

use log::{error, info, warn};

use crate::config::{Mode, Settings, Timing};
use crate::control::pid::PidController;
use crate::error::{Result, SafetyTrip};
use crate::safety::{SafetyFilter, Verdict};
use crate::scheduler::{ClientTime, MAX_WAIT_CHUNK, PowerOnSchedule, ScheduleError, TimeOfDay};
use crate::sensors::zacwire::{DecoderHealth, Reading};

use super::commands::AppCommand;
use super::history::History;
use super::ports::{ClockPort, ConfigPort, HeaterPort, SensorPort};
use super::reports::{DisplayView, HistoryReport, Screen, StatusReport, StatusText};

/// Next move of the power-on alarm task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmStep {
    /// Nothing scheduled any more.
    Idle,
    Wait(core::time::Duration),
    Due,
}

/// Round to the display resolution of 0.1 °C.
pub fn round_tenth(celsius: f32) -> f32 {
    (celsius * 10.0).round() / 10.0
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller<S, H, C> {
    sensor: S,
    heater: H,
    clock: C,
    settings: Settings,
    power: bool,
    mode: Mode,
    setpoint: Option<f32>,
    current_temp: Option<f32>,
    duty: f32,
    pid: PidController,
    safety: SafetyFilter,
    history: History,
    schedule: Option<PowerOnSchedule>,
    trip: Option<SafetyTrip>,
    halted: bool,
}

impl<S: SensorPort, H: HeaterPort, C: ClockPort> Controller<S, H, C> {
    /// Build the controller in the OFF state.
    pub fn new(settings: Settings, timing: &Timing, sensor: S, heater: H, clock: C) -> Self {
        let pid = PidController::new(settings.pid, None).with_sample_time(timing.pid_sample_ms);
        Self {
            sensor,
            heater,
            clock,
            settings,
            power: false,
            mode: Mode::default(),
            setpoint: None,
            current_temp: None,
            duty: 0.0,
            pid,
            safety: SafetyFilter::default(),
            history: History::new(),
            schedule: None,
            trip: None,
            halted: false,
        }
    }

    // ── Power & mode ──────────────────────────────────────────

    pub fn power(&mut self, on: bool) -> String {
        if on && self.halted {
            warn!("power on ignored: controller is shut down");
            return "Controller is shut down".into();
        }
        if on {
            self.turn_on();
        } else {
            self.turn_off();
        }
        format!("Power set {}", if on { "on" } else { "off" })
    }

    /// Switch modes.  While ON the setpoint follows immediately.
    pub fn set_mode(&mut self, mode: Mode) -> String {
        self.mode = mode;
        if self.power {
            self.apply_mode_target();
        }
        info!("mode: {} (target {:.1} °C)", mode, self.settings.mode_temps.target(mode));
        format!("Mode set to {mode}")
    }

    pub fn toggle_mode(&mut self) -> String {
        self.set_mode(self.mode.toggled())
    }

    pub fn handle_command(&mut self, cmd: AppCommand) -> String {
        match cmd {
            AppCommand::SetPower(on) => self.power(on),
            AppCommand::TogglePower => self.power(!self.power),
            AppCommand::SetMode(mode) => self.set_mode(mode),
            AppCommand::ToggleMode => self.toggle_mode(),
        }
    }

    fn turn_on(&mut self) {
        if !self.power {
            self.safety.reset();
            self.pid.reset();
        }
        self.power = true;
        self.trip = None;
        self.apply_mode_target();
        self.sensor.start();
        info!(
            "power: ON, {} @ {:.1} °C",
            self.mode,
            self.setpoint.unwrap_or_default()
        );
    }

    fn turn_off(&mut self) {
        let was_on = self.power;
        self.power = false;
        self.sensor.stop();
        self.set_setpoint(None);
        self.heater.force_off();
        self.duty = 0.0;
        if was_on {
            info!("power: OFF");
        }
    }

    fn apply_mode_target(&mut self) {
        let target = self.settings.mode_temps.target(self.mode);
        self.set_setpoint(Some(target));
    }

    fn set_setpoint(&mut self, setpoint: Option<f32>) {
        let setpoint = setpoint.map(round_tenth);
        self.setpoint = setpoint;
        self.pid.set_setpoint(setpoint);
    }

    fn trip(&mut self, reason: SafetyTrip) {
        if self.trip.is_some() {
            return;
        }
        let health = self.sensor.health();
        self.turn_off();
        self.trip = Some(reason);
        error!(
            "controller forced OFF: {} (decoder ok {} / errors {})",
            reason, health.frames_ok, health.frame_errors
        );
    }

    /// Final stop: heater task ended, sensor off, no further power-on.
    pub fn shut_down(&mut self) {
        self.turn_off();
        self.heater.shutdown();
        self.schedule = None;
        self.halted = true;
        warn!("controller shut down");
    }

    // ── Sampling ──────────────────────────────────────────────

    /// Decode the burst the ISR just finished capturing.
    pub fn decode_capture(&mut self) -> Reading {
        self.sensor.decode_pending()
    }

    /// Pass the current smoothed reading through the safety filter.
    pub fn sample(&mut self) -> Verdict {
        let now_us = self.clock.uptime_us() as u32;
        let verdict = self.safety.evaluate(self.sensor.reading(now_us).celsius());
        match verdict {
            Verdict::Accepted(celsius) => self.current_temp = Some(round_tenth(celsius)),
            Verdict::Trip(reason) => self.trip(reason),
            Verdict::NoReading | Verdict::Rejected { .. } => {}
        }
        verdict
    }

    /// Power the sensor for an idle reading while OFF.
    pub fn wake_sensor(&mut self) {
        if !self.power && !self.halted {
            self.sensor.start();
        }
    }

    /// Power the sensor back down unless the machine was switched on meanwhile.
    pub fn rest_sensor(&mut self) {
        if !self.power {
            self.sensor.stop();
        }
    }

    // ── Control ───────────────────────────────────────────────

    pub fn record_temperature(&mut self) {
        self.history.push_temperature(self.current_temp);
    }

    pub fn record_setpoint(&mut self) {
        self.history.push_setpoint(self.setpoint);
    }

    /// Run the PID on the current temperature and hand the duty to the heater.
    pub fn update_duty(&mut self) -> f32 {
        let now_ms = self.clock.uptime_ms();
        let duty = match self.current_temp {
            Some(celsius) => self.pid.compute(celsius, now_ms),
            None => 0.0,
        };
        self.duty = duty;
        self.heater.set_duty(duty);
        duty
    }

    // ── Settings ──────────────────────────────────────────────

    pub fn get_settings(&self) -> Settings {
        self.settings
    }

    /// Persist first, then apply.  A failed save leaves the running
    /// settings untouched.
    pub fn save_settings(&mut self, settings: Settings, store: &impl ConfigPort) -> Result<()> {
        let persisted = settings.validate().and_then(|()| store.save(&settings));
        if let Err(e) = persisted {
            warn!("settings: not saved: {}", e);
            return Err(e.into());
        }
        self.settings = settings;
        self.pid.set_tunings(settings.pid);
        if self.power {
            self.apply_mode_target();
        }
        info!(
            "settings: PID {}/{}/{}, espresso {:.1} °C, steam {:.1} °C",
            settings.pid.kp,
            settings.pid.ki,
            settings.pid.kd,
            settings.mode_temps.espresso,
            settings.mode_temps.steam
        );
        Ok(())
    }

    // ── Power-on schedule ─────────────────────────────────────

    /// Install (`Some`) or cancel (`None`) the power-on time.
    pub fn set_schedule(
        &mut self,
        at: Option<TimeOfDay>,
    ) -> core::result::Result<Option<TimeOfDay>, ScheduleError> {
        let Some(at) = at else {
            if self.schedule.take().is_some() {
                info!("schedule: power-on cancelled");
            }
            return Ok(None);
        };
        let (Some(now_unix), Some(now_of_day)) = (self.clock.unix_secs(), self.clock.seconds_of_day())
        else {
            warn!("schedule: cannot plan {} before the wall clock is set", at);
            return Err(ScheduleError::ClockNotSet);
        };
        let plan = PowerOnSchedule::plan(at, now_unix, now_of_day);
        info!(
            "schedule: power-on at {} (in {} s)",
            at,
            plan.remaining_secs(now_unix)
        );
        self.schedule = Some(plan);
        Ok(Some(at))
    }

    /// Step the wall clock to the time reported by the client.
    pub fn sync_wall_clock(
        &mut self,
        now: ClientTime,
    ) -> core::result::Result<(), ScheduleError> {
        if !self.clock.set_wall_clock(now.unix_secs()) {
            warn!("clock: {} rejected", now);
            return Err(ScheduleError::ClockRejected);
        }
        info!("clock: set to {}", now);
        Ok(())
    }

    pub fn scheduled(&self) -> Option<TimeOfDay> {
        self.schedule.map(|plan| plan.at())
    }

    pub fn alarm_step(&self) -> AlarmStep {
        let Some(plan) = self.schedule else {
            return AlarmStep::Idle;
        };
        match self.clock.unix_secs() {
            Some(now) => plan.next_wait(now).map_or(AlarmStep::Due, AlarmStep::Wait),
            None => AlarmStep::Wait(MAX_WAIT_CHUNK),
        }
    }

    /// Called by the alarm task once the schedule is due.
    pub fn fire_schedule(&mut self) {
        if let Some(plan) = self.schedule.take() {
            info!("schedule: {} reached, powering on", plan.at());
            self.power(true);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn get_status(&self, poll_interval: serde_json::Value) -> StatusReport {
        StatusReport {
            power: self.power,
            current_temp: self.current_temp,
            setpoint: self.setpoint,
            mode: self.mode,
            poll_interval,
            duty: self.duty,
            scheduled_time: self.scheduled().map(|at| at.to_string()),
        }
    }

    pub fn get_history(&self) -> HistoryReport {
        HistoryReport {
            setpoint_history: self.history.setpoints(),
            temperature_history: self.history.temperatures(),
        }
    }

    pub fn display_view(&self) -> DisplayView {
        DisplayView {
            status: StatusText::classify(
                self.power,
                self.scheduled(),
                self.current_temp,
                self.setpoint,
            ),
            mode: self.mode,
            duty_percent: (self.duty * 100.0) as u8,
            current_temp: self.current_temp,
            setpoint: self.setpoint,
            power: self.power,
        }
    }

    pub fn screen(&self) -> Screen {
        if self.halted || self.trip.is_some() {
            Screen::Shutdown { reason: self.trip }
        } else {
            Screen::Status(self.display_view())
        }
    }

    pub fn is_on(&self) -> bool {
        self.power
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn setpoint(&self) -> Option<f32> {
        self.setpoint
    }

    pub fn current_temp(&self) -> Option<f32> {
        self.current_temp
    }

    pub fn duty(&self) -> f32 {
        self.duty
    }

    pub fn trip_reason(&self) -> Option<SafetyTrip> {
        self.trip
    }

    pub fn sensor_health(&self) -> DecoderHealth {
        self.sensor.health()
    }

    pub fn uptime_ms(&self) -> u64 {
        self.clock.uptime_ms()
    }
}

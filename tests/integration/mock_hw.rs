//! Mock hardware adapters for integration tests.
//!
//! The controller owns its ports, so every mock keeps its state behind an
//! `Rc` and hands out a cloneable handle.  Tests steer the mocks
//! and assert on the recorded calls through those handles.

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use brewctl::app::ports::{
    ClockPort, ConfigError, ConfigPort, DisplayPort, HeaterPort, SensorPort,
};
use brewctl::app::reports::Screen;
use brewctl::app::runtime::Runtime;
use brewctl::app::service::Controller;
use brewctl::config::{Settings, Timing};
use brewctl::scheduler::SECS_PER_DAY;
use brewctl::sensors::zacwire::{DecoderHealth, RAW_MAX, Reading};
use embedded_hal::digital::{ErrorType, InputPin};

/// Raw code closest to `celsius`.
pub fn raw_for(celsius: f32) -> u16 {
    ((celsius + 50.0) / 200.0 * f32::from(RAW_MAX)).round() as u16
}

// ── Sensor ────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SensorState {
    pub running: bool,
    pub reading: Option<Reading>,
    pub starts: u32,
    pub stops: u32,
    pub decodes: u32,
}

#[derive(Clone, Default)]
pub struct MockSensor(pub Rc<RefCell<SensorState>>);

#[allow(dead_code)]
impl MockSensor {
    pub fn set_celsius(&self, celsius: f32) {
        self.0.borrow_mut().reading = Some(Reading::Raw(raw_for(celsius)));
    }

    pub fn set_reading(&self, reading: Reading) {
        self.0.borrow_mut().reading = Some(reading);
    }

    pub fn running(&self) -> bool {
        self.0.borrow().running
    }

    pub fn starts(&self) -> u32 {
        self.0.borrow().starts
    }
}

impl SensorPort for MockSensor {
    fn start(&mut self) {
        let mut s = self.0.borrow_mut();
        s.running = true;
        s.starts += 1;
    }

    fn stop(&mut self) {
        let mut s = self.0.borrow_mut();
        s.running = false;
        s.stops += 1;
    }

    fn is_running(&self) -> bool {
        self.0.borrow().running
    }

    fn decode_pending(&mut self) -> Reading {
        let mut s = self.0.borrow_mut();
        s.decodes += 1;
        s.reading.unwrap_or(Reading::NotRunning)
    }

    fn reading(&mut self, _now_us: u32) -> Reading {
        let s = self.0.borrow();
        if s.running {
            s.reading.unwrap_or(Reading::NotRunning)
        } else {
            Reading::NotRunning
        }
    }

    fn health(&self) -> DecoderHealth {
        DecoderHealth::default()
    }
}

// ── Heater ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaterCall {
    SetDuty(f32),
    ForceOff,
    Shutdown,
}

#[derive(Clone, Default)]
pub struct MockHeater(pub Rc<RefCell<Vec<HeaterCall>>>);

#[allow(dead_code)]
impl MockHeater {
    pub fn calls(&self) -> Vec<HeaterCall> {
        self.0.borrow().clone()
    }

    pub fn last(&self) -> Option<HeaterCall> {
        self.0.borrow().last().copied()
    }

    pub fn last_duty(&self) -> Option<f32> {
        self.0.borrow().iter().rev().find_map(|c| match c {
            HeaterCall::SetDuty(d) => Some(*d),
            _ => None,
        })
    }
}

impl HeaterPort for MockHeater {
    fn set_duty(&mut self, duty: f32) {
        self.0.borrow_mut().push(HeaterCall::SetDuty(duty));
    }

    fn force_off(&mut self) {
        self.0.borrow_mut().push(HeaterCall::ForceOff);
    }

    fn shutdown(&mut self) {
        self.0.borrow_mut().push(HeaterCall::Shutdown);
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Manually advanced clock.  Local time is UTC.
#[derive(Clone)]
pub struct MockClock {
    pub uptime_us: Rc<Cell<u64>>,
    pub unix: Rc<Cell<Option<u64>>>,
}

/// 2025-01-01 00:00:00 UTC.
pub const MIDNIGHT: u64 = 1_735_689_600;

#[allow(dead_code)]
impl MockClock {
    pub fn new() -> Self {
        Self {
            uptime_us: Rc::new(Cell::new(0)),
            unix: Rc::new(Cell::new(Some(MIDNIGHT))),
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        self.uptime_us.set(self.uptime_us.get() + ms * 1_000);
        if let Some(unix) = self.unix.get() {
            self.unix.set(Some(unix + ms / 1_000));
        }
    }

    /// Put the wall clock at `h:m` on the current day.
    pub fn set_time_of_day(&self, h: u64, m: u64) {
        self.unix.set(Some(MIDNIGHT + h * 3600 + m * 60));
    }

    pub fn unset_wall_clock(&self) {
        self.unix.set(None);
    }
}

impl ClockPort for MockClock {
    fn uptime_us(&self) -> u64 {
        self.uptime_us.get()
    }

    fn unix_secs(&self) -> Option<u64> {
        self.unix.get()
    }

    fn seconds_of_day(&self) -> Option<u32> {
        self.unix
            .get()
            .map(|s| (s % u64::from(SECS_PER_DAY)) as u32)
    }

    fn set_wall_clock(&mut self, unix_secs: u64) -> bool {
        self.unix.set(Some(unix_secs));
        true
    }
}

// ── Settings store ────────────────────────────────────────────

#[derive(Default)]
pub struct MockStore {
    pub saved: RefCell<Option<Settings>>,
    pub fail: Cell<bool>,
}

impl ConfigPort for MockStore {
    fn load(&self) -> Result<Settings, ConfigError> {
        Ok(self.saved.borrow().unwrap_or_default())
    }

    fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        settings.validate()?;
        if self.fail.get() {
            return Err(ConfigError::IoError);
        }
        *self.saved.borrow_mut() = Some(*settings);
        Ok(())
    }
}

// ── Display ───────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockDisplay(pub Rc<RefCell<Vec<Screen>>>);

#[allow(dead_code)]
impl MockDisplay {
    pub fn last(&self) -> Option<Screen> {
        self.0.borrow().last().copied()
    }

    pub fn count(&self) -> usize {
        self.0.borrow().len()
    }
}

impl DisplayPort for MockDisplay {
    fn show(&mut self, screen: &Screen) {
        self.0.borrow_mut().push(*screen);
    }
}

// ── Button ────────────────────────────────────────────────────

/// Active-low push button.
#[derive(Clone, Default)]
pub struct MockButton(pub Rc<Cell<bool>>);

#[allow(dead_code)]
impl MockButton {
    pub fn press(&self) {
        self.0.set(true);
    }

    pub fn release(&self) {
        self.0.set(false);
    }
}

impl ErrorType for MockButton {
    type Error = Infallible;
}

impl InputPin for MockButton {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type TestController = Controller<MockSensor, MockHeater, MockClock>;
#[allow(dead_code)]
pub type TestRuntime<'a> = Runtime<'a, MockSensor, MockHeater, MockClock>;

pub struct Rig {
    pub sensor: MockSensor,
    pub heater: MockHeater,
    pub clock: MockClock,
}

pub fn rig_with(settings: Settings, timing: &Timing) -> (TestController, Rig) {
    let rig = Rig {
        sensor: MockSensor::default(),
        heater: MockHeater::default(),
        clock: MockClock::new(),
    };
    let controller = Controller::new(
        settings,
        timing,
        rig.sensor.clone(),
        rig.heater.clone(),
        rig.clock.clone(),
    );
    (controller, rig)
}

pub fn rig() -> (TestController, Rig) {
    rig_with(Settings::default(), &Timing::default())
}

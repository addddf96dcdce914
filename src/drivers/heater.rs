//! Software PWM for the boiler SSR.
//!
//! The heater is a slow thermal load behind a zero-cross SSR, so a
//! sub-Hz software waveform is enough: the [`SoftPwm::run`] task holds the
//! pin high for `period × duty`, low for the remainder, and sleeps on the
//! `async-io-mini` reactor in between.  Duty and frequency changes are
//! picked up at the next cycle boundary.
//!
//! All methods take `&self` so the task and the controller can share one
//! `Rc<SoftPwm<_>>` on the single-threaded executor.

use core::cell::{Cell, RefCell};
use core::time::Duration;

use embedded_hal::digital::{OutputPin, PinState};
use log::{info, warn};
use std::rc::Rc;

use crate::app::ports::HeaterPort;

pub const MIN_FREQ_HZ: f32 = 0.1;
pub const MAX_FREQ_HZ: f32 = 1.0;

/// High and low phase lengths for one cycle.
pub fn cycle_times(freq_hz: f32, duty: f32) -> (Duration, Duration) {
    let period = 1.0 / freq_hz.clamp(MIN_FREQ_HZ, MAX_FREQ_HZ);
    let on = period * duty.clamp(0.0, 1.0);
    (
        Duration::from_secs_f32(on),
        Duration::from_secs_f32(period - on),
    )
}

pub struct SoftPwm<P> {
    pin: RefCell<P>,
    freq_hz: Cell<f32>,
    duty: Cell<f32>,
    running: Cell<bool>,
}

impl<P: OutputPin> SoftPwm<P> {
    pub fn new(pin: P, freq_hz: f32, duty: f32) -> Self {
        Self {
            pin: RefCell::new(pin),
            freq_hz: Cell::new(freq_hz.clamp(MIN_FREQ_HZ, MAX_FREQ_HZ)),
            duty: Cell::new(duty.clamp(0.0, 1.0)),
            running: Cell::new(false),
        }
    }

    pub fn set_duty(&self, duty: f32) {
        let duty = if duty.is_nan() { 0.0 } else { duty };
        self.duty.set(duty.clamp(0.0, 1.0));
    }

    pub fn duty(&self) -> f32 {
        self.duty.get()
    }

    pub fn set_frequency(&self, freq_hz: f32) {
        if freq_hz.is_nan() {
            return;
        }
        self.freq_hz.set(freq_hz.clamp(MIN_FREQ_HZ, MAX_FREQ_HZ));
    }

    pub fn frequency(&self) -> f32 {
        self.freq_hz.get()
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Waveform task.  Spawn exactly once; returns after [`stop`](Self::stop).
    pub async fn run(&self) {
        self.running.set(true);
        info!("heater: PWM running at {:.2} Hz", self.freq_hz.get());

        while self.running.get() {
            let (on, off) = cycle_times(self.freq_hz.get(), self.duty.get());
            if !on.is_zero() {
                self.drive(true);
                async_io_mini::Timer::after(on).await;
            }
            if !self.running.get() {
                break;
            }
            if !off.is_zero() {
                self.drive(false);
                async_io_mini::Timer::after(off).await;
            }
        }

        self.drive(false);
        info!("heater: PWM stopped");
    }

    /// End the waveform task and pull the output low now.
    pub fn stop(&self) {
        self.running.set(false);
        self.drive(false);
    }

    /// Zero the duty and pull the output low without ending the task.
    pub fn force_low(&self) {
        self.duty.set(0.0);
        self.drive(false);
    }

    fn drive(&self, high: bool) {
        if let Err(e) = self.pin.borrow_mut().set_state(PinState::from(high)) {
            warn!("heater: SSR pin write failed: {:?}", e);
        }
    }
}

impl<P: OutputPin> HeaterPort for Rc<SoftPwm<P>> {
    fn set_duty(&mut self, duty: f32) {
        SoftPwm::set_duty(self, duty);
    }

    fn force_off(&mut self) {
        self.force_low();
    }

    fn shutdown(&mut self) {
        self.stop();
    }
}

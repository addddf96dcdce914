//! Hardware adapter — bridges raw GPIO to the HAL traits and port traits.
//!
//! [`GpioOut`] and [`GpioIn`] expose pins configured by
//! [`hw_init`](crate::drivers::hw_init) through `embedded-hal`, so the
//! heater PWM and the button driver stay hardware-agnostic.  [`TsicLine`]
//! is the sensor's [`SensorLine`]: supply pin plus edge interrupt.  On
//! non-espidf targets the underlying calls are simulation stubs.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use log::info;

use crate::app::ports::SensorLine;
use crate::drivers::hw_init;
use crate::pins;

/// Push-pull output configured in `hw_init`.
pub struct GpioOut {
    pin: i32,
}

impl GpioOut {
    pub fn new(pin: i32) -> Self {
        Self { pin }
    }
}

impl ErrorType for GpioOut {
    type Error = Infallible;
}

impl OutputPin for GpioOut {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.pin, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.pin, true);
        Ok(())
    }
}

/// Input configured in `hw_init`.
pub struct GpioIn {
    pin: i32,
}

impl GpioIn {
    pub fn new(pin: i32) -> Self {
        Self { pin }
    }
}

impl ErrorType for GpioIn {
    type Error = Infallible;
}

impl InputPin for GpioIn {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(hw_init::gpio_read(self.pin))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!hw_init::gpio_read(self.pin))
    }
}

// ── Sensor line ────────────────────────────────────────────────

/// Supply pin and edge interrupt of the TSic sensor.
pub struct TsicLine {
    power: GpioOut,
}

impl TsicLine {
    pub fn new() -> Self {
        Self {
            power: GpioOut::new(pins::TSIC_POWER_GPIO),
        }
    }
}

impl Default for TsicLine {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorLine for TsicLine {
    fn power_up(&mut self) {
        let Ok(()) = self.power.set_high();
        hw_init::enable_tsic_irq();
        info!("tsic: powered");
    }

    fn power_down(&mut self) {
        hw_init::disable_tsic_irq();
        let Ok(()) = self.power.set_low();
        info!("tsic: unpowered");
    }
}

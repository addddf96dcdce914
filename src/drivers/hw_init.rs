//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions and the sensor's edge interrupt using raw
//! ESP-IDF sys calls.  Called once from `main()` before the executor starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    TimerCreateFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc)  => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc)  => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::TimerCreateFailed(rc) => write!(f, "esp_timer create failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the executor; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // Sensor data line: both edges, interrupt stays disabled until the
    // sensor is powered.
    let tsic_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::TSIC_DATA_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
    };
    let ret = unsafe { gpio_config(&tsic_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    unsafe { gpio_intr_disable(pins::TSIC_DATA_GPIO) };

    // Button: active low, polled.
    let btn_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::BUTTON_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&btn_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from task context.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Inputs idle high (pull-up) in simulation.
#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [pins::SSR_GPIO, pins::TSIC_POWER_GPIO];

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured (SSR low, sensor unpowered)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was configured in init_gpio_outputs(). Task context only.
    unsafe { gpio_set_level(pin, if high { 1 } else { 0 }); }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn tsic_edge_isr(_arg: *mut core::ffi::c_void) {
    // SAFETY: esp_timer_get_time is a counter read; safe in ISR context.
    let now_us = unsafe { esp_timer_get_time() } as u32;
    if crate::sensors::EDGE_CAPTURE.record(now_us) {
        super::hw_timer::arm_decode_timer();
    }
}

/// Install the per-pin GPIO ISR service and register the sensor handler.
/// The handler stays masked until [`enable_tsic_irq`].
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable).  The registered handler
    // only touches atomics and arms the decode timer.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        let ret = gpio_isr_handler_add(pins::TSIC_DATA_GPIO, Some(tsic_edge_isr), core::ptr::null_mut());
        if ret != ESP_OK {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        gpio_intr_disable(pins::TSIC_DATA_GPIO);

        info!("hw_init: ISR service installed (tsic data, any edge)");
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn enable_tsic_irq() {
    // SAFETY: handler registered in init_isr_service().
    unsafe { gpio_intr_enable(pins::TSIC_DATA_GPIO) };
}

#[cfg(not(target_os = "espidf"))]
pub fn enable_tsic_irq() {}

#[cfg(target_os = "espidf")]
pub fn disable_tsic_irq() {
    // SAFETY: masking a pin interrupt is always allowed.
    unsafe { gpio_intr_disable(pins::TSIC_DATA_GPIO) };
}

#[cfg(not(target_os = "espidf"))]
pub fn disable_tsic_irq() {}

//! Post-capture decode timer using ESP-IDF's esp_timer API.
//!
//! The sensor's edge ISR arms a one-shot timer on the first edge of each
//! burst.  When it expires the whole burst has been captured, and the
//! callback wakes the decode task through [`CAPTURE_READY`].
//!
//! Timer callbacks execute in the esp_timer task context (not ISR), so
//! signalling the embassy `Signal` there is fine.  On simulation targets
//! arming is a no-op; tests replay captures and signal directly.

#[cfg(target_os = "espidf")]
use crate::sensors::zacwire::CAPTURE_READY;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use super::hw_init::HwInitError;

/// Delay from the first edge of a burst to its decode.
pub const DECODE_DELAY_US: u64 = 5_000;

#[cfg(target_os = "espidf")]
static mut DECODE_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: DECODE_TIMER is written once in `init_decode_timer()` before
/// the edge interrupt is enabled; afterwards it is only read.
#[cfg(target_os = "espidf")]
unsafe fn decode_timer() -> esp_timer_handle_t {
    unsafe { DECODE_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn decode_timer_cb(_arg: *mut core::ffi::c_void) {
    CAPTURE_READY.signal(());
}

/// Create the one-shot decode timer.  Must run before the sensor's edge
/// interrupt is enabled.
#[cfg(target_os = "espidf")]
pub fn init_decode_timer() -> Result<(), HwInitError> {
    // SAFETY: DECODE_TIMER is written here once at boot from the single
    // main-task context before any edge interrupt can arm it.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(decode_timer_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"tsic-decode\0".as_ptr() as *const _,
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut DECODE_TIMER);
        if ret != ESP_OK {
            return Err(HwInitError::TimerCreateFailed(ret));
        }
    }
    info!("hw_timer: decode timer ready ({} µs)", DECODE_DELAY_US);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_decode_timer() -> Result<(), HwInitError> {
    log::info!("hw_timer(sim): decode timer skipped");
    Ok(())
}

/// Arm the decode timer.  Called from the edge ISR on the first edge of a
/// burst; a timer that is already running is left alone.
#[cfg(target_os = "espidf")]
pub fn arm_decode_timer() {
    // SAFETY: the handle was created before the ISR was enabled.
    // esp_timer_start_once only takes the esp_timer spinlock and is
    // callable from interrupt context.
    unsafe {
        let timer = decode_timer();
        if timer.is_null() || esp_timer_is_active(timer) {
            return;
        }
        esp_timer_start_once(timer, DECODE_DELAY_US);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn arm_decode_timer() {}

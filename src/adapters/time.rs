//! ESP32 time adapter.
//!
//! Implements [`ClockPort`] for the controller.
//!
//! - **`target_os = "espidf"`** — monotonic time from `esp_timer_get_time()`
//!   and wall-clock time from `gettimeofday()`/`localtime_r()`.  No `TZ`
//!   is configured, so local time reads back exactly as the browser sent it.
//! - **`not(target_os = "espidf")`** — `std::time::Instant` and
//!   `SystemTime` for host-side testing and simulation (local time = UTC).
//!   Setting the wall clock only shifts this adapter's view of it.
//!
//! The browser sends its local time with every alarm request; without
//! SNTP that is the only source that sets the clock on the target.

use crate::app::ports::ClockPort;

#[cfg(not(target_os = "espidf"))]
use crate::scheduler::SECS_PER_DAY;

/// Wall-clock readings before this are treated as "not set" (2020-01-01).
const EPOCH_2020: i64 = 1_577_836_800;

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    /// Seconds added to the host's system time.
    #[cfg(not(target_os = "espidf"))]
    offset: i64,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            offset: 0,
        }
    }

    #[cfg(target_os = "espidf")]
    fn wall_secs(&self) -> Option<i64> {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        let secs = tv.tv_sec as i64;
        (secs >= EPOCH_2020).then_some(secs)
    }

    #[cfg(not(target_os = "espidf"))]
    fn system_secs() -> Option<i64> {
        Some(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .ok()?
                .as_secs() as i64,
        )
    }

    #[cfg(not(target_os = "espidf"))]
    fn wall_secs(&self) -> Option<i64> {
        let secs = Self::system_secs()? + self.offset;
        (secs >= EPOCH_2020).then_some(secs)
    }
}

impl ClockPort for Esp32TimeAdapter {
    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn unix_secs(&self) -> Option<u64> {
        self.wall_secs().map(|s| s as u64)
    }

    #[cfg(target_os = "espidf")]
    fn seconds_of_day(&self) -> Option<u32> {
        let secs = self.wall_secs()? as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        let (h, m, s) = (tm.tm_hour, tm.tm_min, tm.tm_sec);
        if !(0..24).contains(&h) || !(0..60).contains(&m) || !(0..61).contains(&s) {
            return None;
        }
        Some(h as u32 * 3600 + m as u32 * 60 + s.min(59) as u32)
    }

    #[cfg(not(target_os = "espidf"))]
    fn seconds_of_day(&self) -> Option<u32> {
        self.wall_secs().map(|s| (s as u64 % u64::from(SECS_PER_DAY)) as u32)
    }

    #[cfg(target_os = "espidf")]
    fn set_wall_clock(&mut self, unix_secs: u64) -> bool {
        use core::ptr;
        let Ok(secs) = i64::try_from(unix_secs) else {
            return false;
        };
        if secs < EPOCH_2020 {
            return false;
        }
        let tv = esp_idf_svc::sys::timeval {
            tv_sec: secs as esp_idf_svc::sys::time_t,
            tv_usec: 0,
        };
        unsafe { esp_idf_svc::sys::settimeofday(&tv, ptr::null()) == 0 }
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_wall_clock(&mut self, unix_secs: u64) -> bool {
        let (Ok(secs), Some(system)) = (i64::try_from(unix_secs), Self::system_secs()) else {
            return false;
        };
        if secs < EPOCH_2020 {
            return false;
        }
        self.offset = secs - system;
        true
    }
}

//! Scheduled power-on ("alarm").
//!
//! The operator picks a local time of day; the controller switches itself
//! on the next time the wall clock reaches it.  The waiting task sleeps in
//! chunks of at most ten minutes and recomputes the remaining time from
//! the wall clock after each one, so an NTP step while waiting only
//! shifts the wake-up by at most one chunk.
//!
//! ```text
//!  schedule_power_on("06:45")
//!        │
//!        ▼
//!  PowerOnSchedule::plan ──▶ due_unix
//!        │
//!  alarm task: loop { next_wait(now) ─▶ sleep ≤ 600 s } ─▶ power on
//! ```

use core::fmt;
use core::str::FromStr;
use core::time::Duration;

pub const SECS_PER_DAY: u32 = 86_400;
pub const MAX_WAIT_CHUNK: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// Not an `HH:MM` time of day.
    InvalidTime,
    /// Wall clock has not been set yet.
    ClockNotSet,
    /// Not a `Y:M:D:h:m:s` date and time.
    InvalidDateTime,
    /// The platform refused the new wall-clock time.
    ClockRejected,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTime => write!(f, "expected HH:MM"),
            Self::ClockNotSet => write!(f, "wall clock not set"),
            Self::InvalidDateTime => write!(f, "expected Y:M:D:h:m:s"),
            Self::ClockRejected => write!(f, "wall clock could not be set"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Time of day
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub const fn hour(self) -> u8 {
        self.hour
    }

    pub const fn minute(self) -> u8 {
        self.minute
    }

    pub const fn seconds_of_day(self) -> u32 {
        self.hour as u32 * 3600 + self.minute as u32 * 60
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s.trim().split_once(':').ok_or(ScheduleError::InvalidTime)?;
        let field = |part: &str| -> Result<u8, ScheduleError> {
            if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ScheduleError::InvalidTime);
            }
            part.parse().map_err(|_| ScheduleError::InvalidTime)
        };
        Self::new(field(h)?, field(m)?).ok_or(ScheduleError::InvalidTime)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Seconds from `now_secs_of_day` until `target` is next reached.
/// A target equal to or earlier than now lands on the following day.
pub fn seconds_until(target: TimeOfDay, now_secs_of_day: u32) -> u32 {
    let diff = i64::from(target.seconds_of_day()) - i64::from(now_secs_of_day % SECS_PER_DAY);
    if diff > 0 {
        diff as u32
    } else {
        (diff + i64::from(SECS_PER_DAY)) as u32
    }
}

// ═══════════════════════════════════════════════════════════════
//  Client wall-clock time
// ═══════════════════════════════════════════════════════════════

/// Local date and time reported by the browser alongside an alarm, as
/// `Y:M:D:h:m:s` with unpadded fields (`2025:1:31:7:5:0`).
///
/// No timezone is configured on the device, so the local time is stored
/// as if it were UTC and read back unchanged by `seconds_of_day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTime {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl ClientTime {
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<Self> {
        let valid = (2020..=2099).contains(&year)
            && (1..=12).contains(&month)
            && day >= 1
            && day <= days_in_month(year, month)
            && hour < 24
            && minute < 60
            && second < 60;
        valid.then_some(Self { year, month, day, hour, minute, second })
    }

    pub fn unix_secs(&self) -> u64 {
        let days = days_from_civil(i64::from(self.year), u32::from(self.month), u32::from(self.day));
        let secs_of_day =
            u64::from(self.hour) * 3600 + u64::from(self.minute) * 60 + u64::from(self.second);
        days as u64 * u64::from(SECS_PER_DAY) + secs_of_day
    }
}

impl FromStr for ClientTime {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = [0u16; 6];
        let mut parts = s.trim().split(':');
        for slot in &mut fields {
            let part = parts.next().ok_or(ScheduleError::InvalidDateTime)?;
            if part.is_empty() || part.len() > 4 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ScheduleError::InvalidDateTime);
            }
            *slot = part.parse().map_err(|_| ScheduleError::InvalidDateTime)?;
        }
        if parts.next().is_some() {
            return Err(ScheduleError::InvalidDateTime);
        }
        let [y, mo, d, h, mi, sec] = fields;
        let narrow = |v: u16| u8::try_from(v).map_err(|_| ScheduleError::InvalidDateTime);
        Self::new(y, narrow(mo)?, narrow(d)?, narrow(h)?, narrow(mi)?, narrow(sec)?)
            .ok_or(ScheduleError::InvalidDateTime)
    }
}

impl fmt::Display for ClientTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

const fn is_leap(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

const fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Days since 1970-01-01 in the proleptic Gregorian calendar.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let mp = i64::from((month + 9) % 12);
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

// ═══════════════════════════════════════════════════════════════
//  Pending schedule
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerOnSchedule {
    at: TimeOfDay,
    due_unix: u64,
}

impl PowerOnSchedule {
    pub fn plan(at: TimeOfDay, now_unix: u64, now_secs_of_day: u32) -> Self {
        Self {
            at,
            due_unix: now_unix + u64::from(seconds_until(at, now_secs_of_day)),
        }
    }

    pub fn at(&self) -> TimeOfDay {
        self.at
    }

    pub fn due_unix(&self) -> u64 {
        self.due_unix
    }

    pub fn remaining_secs(&self, now_unix: u64) -> u64 {
        self.due_unix.saturating_sub(now_unix)
    }

    /// How long to sleep next, or `None` once due.
    pub fn next_wait(&self, now_unix: u64) -> Option<Duration> {
        match self.remaining_secs(now_unix) {
            0 => None,
            secs => Some(Duration::from_secs(secs).min(MAX_WAIT_CHUNK)),
        }
    }
}

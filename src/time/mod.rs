//! Calendar time as the RTC stores it, and the host's system clock.

use std::{fmt, time::Duration};

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use nix::{
    sys::time::TimeSpec,
    time::{clock_settime, ClockId},
};

use crate::error::TimeError;

pub mod network;

/// Broken-down local time. Fields are not cross-checked; see
/// [`DateTime::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    /// 2000..=2099
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 0 = Sunday
    pub weekday: u8,
}

/// Anything earlier is taken as an RTC that was never set.
pub const YEAR_FLOOR: u16 = 2024;

impl DateTime {
    /// Coarse plausibility: every field in range and the year after
    /// [`YEAR_FLOOR`]. Day is only bounded by 31, whatever the month, so
    /// e.g. February 30 passes.
    pub fn is_valid(&self) -> bool {
        self.second < 60
            && self.minute < 60
            && self.hour < 24
            && (1..=31).contains(&self.day)
            && (1..=12).contains(&self.month)
            && self.year > YEAR_FLOOR
    }

    /// The exact calendar instant, if the date really exists.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?.and_hms_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
        )
    }
}

impl From<NaiveDateTime> for DateTime {
    fn from(t: NaiveDateTime) -> Self {
        Self {
            year: t.year() as u16,
            month: t.month() as u8,
            day: t.day() as u8,
            hour: t.hour() as u8,
            minute: t.minute() as u8,
            second: t.second() as u8,
            weekday: t.weekday().num_days_from_sunday() as u8,
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// The host's wall clock, in local time.
pub trait SystemClock {
    fn now(&self) -> DateTime;
    fn set(&self, local: &DateTime) -> Result<(), TimeError>;
}

/// The real clock. Setting it needs `CAP_SYS_TIME`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostClock;

impl SystemClock for HostClock {
    fn now(&self) -> DateTime {
        Local::now().naive_local().into()
    }

    fn set(&self, local: &DateTime) -> Result<(), TimeError> {
        let naive = local
            .to_naive()
            .ok_or_else(|| TimeError::LocalTime(local.to_string()))?;
        let instant = Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| TimeError::LocalTime(local.to_string()))?;
        let since_epoch = u64::try_from(instant.timestamp())
            .map_err(|_| TimeError::LocalTime(local.to_string()))?;

        clock_settime(
            ClockId::CLOCK_REALTIME,
            TimeSpec::from_duration(Duration::from_secs(since_epoch)),
        )
        .map_err(TimeError::SetClock)
    }
}


#[cfg(test)]
mod test {
    use super::*;

    fn dt(year: u16, month: u8, day: u8) -> DateTime {
        DateTime {
            year,
            month,
            day,
            hour: 12,
            minute: 0,
            second: 0,
            weekday: 0,
        }
    }

    #[test]
    fn valid_time() {
        assert!(dt(2025, 6, 1).is_valid());
        assert!(!dt(1999, 6, 1).is_valid());
        assert!(!dt(2024, 6, 1).is_valid());
        assert!(!dt(2025, 0, 1).is_valid());
        assert!(!dt(2025, 13, 1).is_valid());
        assert!(!dt(2025, 6, 0).is_valid());
        assert!(!dt(2025, 6, 32).is_valid());
        assert!(!DateTime { hour: 24, ..dt(2025, 6, 1) }.is_valid());
        assert!(!DateTime { minute: 60, ..dt(2025, 6, 1) }.is_valid());
    }

    #[test]
    fn month_length_is_not_checked() {
        // 2025 is not a leap year; accepted anyway
        let t = dt(2025, 2, 29);
        assert!(t.is_valid());
        assert_eq!(t.to_naive(), None);
    }

    #[test]
    fn from_naive() {
        let naive = NaiveDate::from_ymd_opt(2025, 3, 8)
            .unwrap()
            .and_hms_opt(7, 30, 5)
            .unwrap();
        let t = DateTime::from(naive);

        assert_eq!(
            t,
            DateTime {
                year: 2025,
                month: 3,
                day: 8,
                hour: 7,
                minute: 30,
                second: 5,
                weekday: 6,
            }
        );
        assert_eq!(t.to_string(), "2025-03-08 07:30:05");
        assert_eq!(t.to_naive(), Some(naive));
    }
}

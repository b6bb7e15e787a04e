//! The RX8025 real-time clock, seen through the board's virtual registers,
//! and the transfers between it, the system clock and network time.
//!
//! Fields are read and written one validated transaction at a time, so a
//! concurrent reader may see a half-written time.

use std::fmt::Debug;

use chrono::Local;
use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};
use tracing::{debug, info};

use super::{registers::vreg, WittyPi};
use crate::{
    codec::{bcd_to_dec, dec_to_bcd},
    error::{RangeError, Result},
    time::{network::TimeSource, DateTime, SystemClock},
};

impl<I2C, D> WittyPi<I2C, D>
where
    I2C: Write + WriteRead,
    <I2C as Write>::Error: Debug,
    <I2C as WriteRead>::Error: Debug,
    D: DelayUs<u32>,
{
    pub fn rtc_time(&mut self) -> Result<DateTime> {
        let [sec, min, hour, wday, day, month, year] = self.engine.read_group([
            vreg::RTC_SEC,
            vreg::RTC_MIN,
            vreg::RTC_HOUR,
            vreg::RTC_WEEKDAY,
            vreg::RTC_DAY,
            vreg::RTC_MONTH,
            vreg::RTC_YEAR,
        ])?;

        Ok(DateTime {
            year: 2000 + bcd_to_dec(year) as u16,
            month: bcd_to_dec(month),
            day: bcd_to_dec(day),
            hour: bcd_to_dec(hour),
            minute: bcd_to_dec(min),
            second: bcd_to_dec(sec),
            // one-hot; an empty mask decodes to 8
            weekday: wday.trailing_zeros() as u8,
        })
    }

    /// Writes every RTC field. Fields are range-checked before any write.
    pub fn set_rtc_time(&mut self, t: &DateTime) -> Result<()> {
        RangeError::check("year", t.year, 2000..=2099)?;
        RangeError::check("month", t.month, 1..=12)?;
        RangeError::check("day", t.day, 1..=31)?;
        RangeError::check("hour", t.hour, 0..=23)?;
        RangeError::check("minute", t.minute, 0..=59)?;
        RangeError::check("second", t.second, 0..=59)?;
        RangeError::check("weekday", t.weekday, 0..=6)?;

        self.set(vreg::RTC_SEC, dec_to_bcd(t.second))?;
        self.set(vreg::RTC_MIN, dec_to_bcd(t.minute))?;
        self.set(vreg::RTC_HOUR, dec_to_bcd(t.hour))?;
        self.set(vreg::RTC_WEEKDAY, 1 << t.weekday)?;
        self.set(vreg::RTC_DAY, dec_to_bcd(t.day))?;
        self.set(vreg::RTC_MONTH, dec_to_bcd(t.month))?;
        self.set(vreg::RTC_YEAR, dec_to_bcd((t.year - 2000) as u8))?;

        debug!("rtc set to {t}");
        Ok(())
    }

    pub fn system_to_rtc(&mut self, clock: &impl SystemClock) -> Result<()> {
        let now = clock.now();
        info!("writing system time {now} to rtc");
        self.set_rtc_time(&now)
    }

    /// Sets the system clock from the RTC. Returns the time applied.
    pub fn rtc_to_system(&mut self, clock: &impl SystemClock) -> Result<DateTime> {
        let t = self.rtc_time()?;
        info!("writing rtc time {t} to system");
        clock.set(&t)?;
        Ok(t)
    }

    /// Fetches UTC from `source`, sets the system clock to the local
    /// equivalent, then copies the system clock into the RTC. Nothing is
    /// written to the board unless every earlier step succeeds.
    pub fn network_to_system_and_rtc(
        &mut self,
        clock: &impl SystemClock,
        source: &impl TimeSource,
    ) -> Result<DateTime> {
        let utc = source.fetch()?;
        let local = DateTime::from(utc.with_timezone(&Local).naive_local());
        info!("network time {utc}, local {local}");

        clock.set(&local)?;
        self.system_to_rtc(clock)?;
        Ok(local)
    }
}

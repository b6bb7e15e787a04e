//! Configuration registers: scheduled startup/shutdown, voltage and
//! temperature thresholds, delays and measurement trims.

use std::{fmt::Debug, ops::RangeInclusive};

use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};
use num_traits::FromPrimitive;
use tracing::debug;

use super::{
    registers::{conf, decode_hint, TempAction},
    WittyPi,
};
use crate::{
    codec::{bcd_to_dec, dec_to_bcd},
    error::{RangeError, Result},
};

/// A scheduled alarm. The day is a day of month, bounded by 31 whatever the
/// month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmTime {
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl AlarmTime {
    fn check(&self) -> Result<(), RangeError> {
        RangeError::check("day", self.day, 1..=31)?;
        RangeError::check("hour", self.hour, 0..=23)?;
        RangeError::check("minute", self.minute, 0..=59)?;
        RangeError::check("second", self.second, 0..=59)?;
        Ok(())
    }

    /// `None` when the decoded fields are out of range, which is how the
    /// board reports an alarm that is not set.
    fn from_bcd([second, minute, hour, day]: [u8; 4]) -> Option<Self> {
        let alarm = Self {
            day: bcd_to_dec(day),
            hour: bcd_to_dec(hour),
            minute: bcd_to_dec(minute),
            second: bcd_to_dec(second),
        };
        alarm.check().ok().map(|_| alarm)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alarm {
    Startup,
    Shutdown,
}

impl Alarm {
    /// Second, minute, hour, day.
    fn registers(self) -> [u8; 4] {
        match self {
            Alarm::Startup => [
                conf::ALARM1_SECOND,
                conf::ALARM1_MINUTE,
                conf::ALARM1_HOUR,
                conf::ALARM1_DAY,
            ],
            Alarm::Shutdown => [
                conf::ALARM2_SECOND,
                conf::ALARM2_MINUTE,
                conf::ALARM2_HOUR,
                conf::ALARM2_DAY,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempBound {
    Over,
    Below,
}

impl TempBound {
    fn registers(self) -> (u8, u8) {
        match self {
            TempBound::Over => (conf::OVER_TEMP_ACTION, conf::OVER_TEMP_POINT),
            TempBound::Below => (conf::BELOW_TEMP_ACTION, conf::BELOW_TEMP_POINT),
        }
    }
}

/// What the board does when the temperature crosses `point`, in °C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempRule {
    pub action: TempAction,
    pub point: i8,
}

pub const TEMP_POINT_RANGE: RangeInclusive<i8> = -30..=80;
pub const VOLTAGE_THRESHOLD_RANGE: RangeInclusive<f32> = 0.0..=25.5;
pub const TRIM_RANGE: RangeInclusive<i8> = -127..=127;

/// Plain byte settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    /// Seconds before the Pi is turned on once powered. 255 keeps it off.
    DefaultOnDelay,
    /// Seconds before power is cut after the Pi shuts down.
    PowerCutDelay,
    /// Seconds between LED and dummy load pulses.
    PulseInterval,
    /// LED pulse length, ms.
    BlinkLed,
    /// Dummy load pulse length, ms.
    DummyLoad,
    /// 0 = Vusb, 1 = Vin.
    PowerSourcePriority,
    /// Allowed missed heartbeats. 0 disables the watchdog.
    Watchdog,
    LogToFile,
}

impl Setting {
    pub fn register(self) -> u8 {
        match self {
            Setting::DefaultOnDelay => conf::DEFAULT_ON_DELAY,
            Setting::PowerCutDelay => conf::POWER_CUT_DELAY,
            Setting::PulseInterval => conf::PULSE_INTERVAL,
            Setting::BlinkLed => conf::BLINK_LED,
            Setting::DummyLoad => conf::DUMMY_LOAD,
            Setting::PowerSourcePriority => conf::PS_PRIORITY,
            Setting::Watchdog => conf::WATCHDOG,
            Setting::LogToFile => conf::LOG_TO_FILE,
        }
    }

    pub fn range(self) -> RangeInclusive<u8> {
        match self {
            Setting::PowerSourcePriority | Setting::LogToFile => 0..=1,
            _ => 0..=255,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Setting::DefaultOnDelay => "default-on delay",
            Setting::PowerCutDelay => "power-cut delay",
            Setting::PulseInterval => "pulse interval",
            Setting::BlinkLed => "LED pulse length",
            Setting::DummyLoad => "dummy load pulse length",
            Setting::PowerSourcePriority => "power source priority",
            Setting::Watchdog => "watchdog allowance",
            Setting::LogToFile => "log to file",
        }
    }
}

/// Offsets added by the firmware to its own measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    /// 0.01 V steps
    Vusb,
    /// 0.01 V steps
    Vin,
    /// 0.01 V steps
    Vout,
    /// 0.001 A steps
    Iout,
}

impl Trim {
    pub fn register(self) -> u8 {
        match self {
            Trim::Vusb => conf::ADJ_VUSB,
            Trim::Vin => conf::ADJ_VIN,
            Trim::Vout => conf::ADJ_VOUT,
            Trim::Iout => conf::ADJ_IOUT,
        }
    }
}

impl<I2C, D> WittyPi<I2C, D>
where
    I2C: Write + WriteRead,
    <I2C as Write>::Error: Debug,
    <I2C as WriteRead>::Error: Debug,
    D: DelayUs<u32>,
{
    /// `Ok(None)` when no alarm is scheduled.
    pub fn alarm(&mut self, alarm: Alarm) -> Result<Option<AlarmTime>> {
        let raw = self.engine.read_group(alarm.registers())?;
        Ok(AlarmTime::from_bcd(raw))
    }

    /// Writes second, minute, hour then day, stopping at the first failure.
    pub fn set_alarm(&mut self, alarm: Alarm, time: &AlarmTime) -> Result<()> {
        time.check()?;

        let values = [time.second, time.minute, time.hour, time.day];
        for (register, value) in alarm.registers().into_iter().zip(values) {
            self.set(register, dec_to_bcd(value))?;
        }
        debug!("{alarm:?} alarm set to {time:?}");
        Ok(())
    }

    pub fn clear_alarm(&mut self, alarm: Alarm) -> Result<()> {
        for register in alarm.registers() {
            self.set(register, 0)?;
        }
        debug!("{alarm:?} alarm cleared");
        Ok(())
    }

    pub fn startup_time(&mut self) -> Result<Option<AlarmTime>> {
        self.alarm(Alarm::Startup)
    }

    pub fn set_startup_time(&mut self, time: &AlarmTime) -> Result<()> {
        self.set_alarm(Alarm::Startup, time)
    }

    pub fn clear_startup_time(&mut self) -> Result<()> {
        self.clear_alarm(Alarm::Startup)
    }

    pub fn shutdown_time(&mut self) -> Result<Option<AlarmTime>> {
        self.alarm(Alarm::Shutdown)
    }

    pub fn set_shutdown_time(&mut self, time: &AlarmTime) -> Result<()> {
        self.set_alarm(Alarm::Shutdown, time)
    }

    pub fn clear_shutdown_time(&mut self) -> Result<()> {
        self.clear_alarm(Alarm::Shutdown)
    }

    /// Volts. `None` when disabled.
    pub fn low_voltage_threshold(&mut self) -> Result<Option<f32>> {
        self.voltage_threshold(conf::LOW_VOLTAGE)
    }

    /// Volts, rounded to 0.1 V. Zero disables.
    pub fn set_low_voltage_threshold(&mut self, volts: f32) -> Result<()> {
        self.set_voltage_threshold("low voltage threshold", conf::LOW_VOLTAGE, volts)
    }

    /// Volts. `None` when disabled.
    pub fn recovery_voltage_threshold(&mut self) -> Result<Option<f32>> {
        self.voltage_threshold(conf::RECOVERY_VOLTAGE)
    }

    /// Volts, rounded to 0.1 V. Zero disables.
    pub fn set_recovery_voltage_threshold(&mut self, volts: f32) -> Result<()> {
        self.set_voltage_threshold("recovery voltage threshold", conf::RECOVERY_VOLTAGE, volts)
    }

    fn voltage_threshold(&mut self, register: u8) -> Result<Option<f32>> {
        Ok(match self.get(register)? {
            0 => None,
            raw => Some(decode_hint(register).apply(raw)),
        })
    }

    fn set_voltage_threshold(&mut self, field: &'static str, register: u8, volts: f32) -> Result<()> {
        RangeError::check(field, volts, VOLTAGE_THRESHOLD_RANGE)?;
        self.set(register, (volts * 10.0).round() as u8)
    }

    /// Unrecognised action codes read as [`TempAction::None`].
    pub fn temperature_rule(&mut self, bound: TempBound) -> Result<TempRule> {
        let (action_reg, point_reg) = bound.registers();
        let [action, point] = self.engine.read_group([action_reg, point_reg])?;

        Ok(TempRule {
            action: TempAction::from_u8(action).unwrap_or(TempAction::None),
            point: point as i8,
        })
    }

    /// Disabling writes the action only and leaves the point alone.
    pub fn set_temperature_rule(&mut self, bound: TempBound, rule: TempRule) -> Result<()> {
        let (action_reg, point_reg) = bound.registers();
        if rule.action == TempAction::None {
            return self.set(action_reg, TempAction::None as u8);
        }

        RangeError::check("temperature point", rule.point, TEMP_POINT_RANGE)?;
        self.set(action_reg, rule.action as u8)?;
        self.set(point_reg, rule.point as u8)
    }

    pub fn setting(&mut self, setting: Setting) -> Result<u8> {
        self.get(setting.register())
    }

    pub fn set_setting(&mut self, setting: Setting, value: u8) -> Result<()> {
        RangeError::check(setting.name(), value, setting.range())?;
        self.set(setting.register(), value)
    }

    /// In volts or amps.
    pub fn trim(&mut self, trim: Trim) -> Result<f32> {
        let register = trim.register();
        Ok(decode_hint(register).apply(self.get(register)?))
    }

    /// In raw steps; see [`Trim`] for the step size.
    pub fn set_trim(&mut self, trim: Trim, steps: i8) -> Result<()> {
        RangeError::check("trim", steps, TRIM_RANGE)?;
        self.set(trim.register(), steps as u8)
    }
}

//! Register map of the Witty Pi 5 firmware.
//!
//! Every register is one unsigned byte on the wire. Sign, BCD and fixed-point
//! scale are applied by the accessors, using [`decode_hint`].

use std::{fmt, ops::RangeInclusive};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

pub const READ_ONLY: RangeInclusive<u8> = 0..=15;
pub const CONFIG: RangeInclusive<u8> = 16..=63;
pub const ADMIN: RangeInclusive<u8> = 64..=79;
pub const VIRTUAL: RangeInclusive<u8> = 80..=103;

pub mod ro {
    pub const FW_ID: u8 = 0x00;
    pub const FW_VERSION_MAJOR: u8 = 0x01;
    /// x100
    pub const FW_VERSION_MINOR: u8 = 0x02;
    pub const VUSB_MV_MSB: u8 = 0x03;
    pub const VUSB_MV_LSB: u8 = 0x04;
    pub const VIN_MV_MSB: u8 = 0x05;
    pub const VIN_MV_LSB: u8 = 0x06;
    pub const VOUT_MV_MSB: u8 = 0x07;
    pub const VOUT_MV_LSB: u8 = 0x08;
    pub const IOUT_MA_MSB: u8 = 0x09;
    pub const IOUT_MA_LSB: u8 = 0x0A;
    pub const POWER_MODE: u8 = 0x0B;
    pub const MISSED_HEARTBEAT: u8 = 0x0C;
    pub const RPI_STATE: u8 = 0x0D;
    /// High nibble: startup reason. Low nibble: shutdown reason.
    pub const ACTION_REASON: u8 = 0x0E;
    /// b0: schedule script in use
    pub const MISC: u8 = 0x0F;
}

pub mod conf {
    pub const ADDRESS: u8 = 0x10;
    /// 255 = stay off when powered
    pub const DEFAULT_ON_DELAY: u8 = 0x11;
    pub const POWER_CUT_DELAY: u8 = 0x12;
    pub const PULSE_INTERVAL: u8 = 0x13;
    pub const BLINK_LED: u8 = 0x14;
    pub const DUMMY_LOAD: u8 = 0x15;
    /// x10, 0 = disabled
    pub const LOW_VOLTAGE: u8 = 0x16;
    /// x10, 0 = disabled
    pub const RECOVERY_VOLTAGE: u8 = 0x17;
    pub const PS_PRIORITY: u8 = 0x18;
    pub const ADJ_VUSB: u8 = 0x19;
    pub const ADJ_VIN: u8 = 0x1A;
    pub const ADJ_VOUT: u8 = 0x1B;
    pub const ADJ_IOUT: u8 = 0x1C;
    pub const WATCHDOG: u8 = 0x1D;
    pub const LOG_TO_FILE: u8 = 0x1E;
    pub const BOOTSEL_FTY_RST: u8 = 0x1F;

    pub const ALARM1_SECOND: u8 = 0x20;
    pub const ALARM1_MINUTE: u8 = 0x21;
    pub const ALARM1_HOUR: u8 = 0x22;
    pub const ALARM1_DAY: u8 = 0x23;

    pub const ALARM2_SECOND: u8 = 0x24;
    pub const ALARM2_MINUTE: u8 = 0x25;
    pub const ALARM2_HOUR: u8 = 0x26;
    pub const ALARM2_DAY: u8 = 0x27;

    pub const BELOW_TEMP_ACTION: u8 = 0x28;
    pub const BELOW_TEMP_POINT: u8 = 0x29;
    pub const OVER_TEMP_ACTION: u8 = 0x2A;
    pub const OVER_TEMP_POINT: u8 = 0x2B;

    pub const DST_OFFSET: u8 = 0x2C;
    pub const DST_BEGIN_MON: u8 = 0x2D;
    pub const DST_BEGIN_DAY: u8 = 0x2E;
    pub const DST_BEGIN_HOUR: u8 = 0x2F;
    pub const DST_BEGIN_MIN: u8 = 0x30;
    pub const DST_END_MON: u8 = 0x31;
    pub const DST_END_DAY: u8 = 0x32;
    pub const DST_END_HOUR: u8 = 0x33;
    pub const DST_END_MIN: u8 = 0x34;
    pub const DST_APPLIED: u8 = 0x35;

    pub const SYS_CLOCK_MHZ: u8 = 0x36;
}

pub mod admin {
    pub const DIR: u8 = 0x40;
    pub const CONTEXT: u8 = 0x41;
    pub const DOWNLOAD: u8 = 0x42;
    pub const UPLOAD: u8 = 0x43;
    /// Cleared by the firmware once the command has run.
    pub const PASSWORD: u8 = 0x44;
    /// Cleared by the firmware once the command has run.
    pub const COMMAND: u8 = 0x45;
    pub const HEARTBEAT: u8 = 0x46;
    pub const SHUTDOWN: u8 = 0x47;
}

/// Shadows of the RX8025 RTC and the TMP112 sensor.
pub mod vreg {
    pub const RTC_SEC: u8 = 0x50;
    pub const RTC_MIN: u8 = 0x51;
    pub const RTC_HOUR: u8 = 0x52;
    /// One-hot: bit n set for weekday n.
    pub const RTC_WEEKDAY: u8 = 0x53;
    pub const RTC_DAY: u8 = 0x54;
    pub const RTC_MONTH: u8 = 0x55;
    /// Years since 2000.
    pub const RTC_YEAR: u8 = 0x56;
    pub const RTC_RAM: u8 = 0x57;
    pub const RTC_MIN_ALARM: u8 = 0x58;
    pub const RTC_HOUR_ALARM: u8 = 0x59;
    pub const RTC_DAY_ALARM: u8 = 0x5A;
    pub const RTC_TIMER_COUNTER0: u8 = 0x5B;
    pub const RTC_TIMER_COUNTER1: u8 = 0x5C;
    pub const RTC_EXTENSION: u8 = 0x5D;
    pub const RTC_FLAG: u8 = 0x5E;
    pub const RTC_CONTROL: u8 = 0x5F;

    pub const TEMP_MSB: u8 = 0x60;
    pub const TEMP_LSB: u8 = 0x61;
    pub const TEMP_CONF_MSB: u8 = 0x62;
    pub const TEMP_CONF_LSB: u8 = 0x63;
    pub const TEMP_TLOW_MSB: u8 = 0x64;
    pub const TEMP_TLOW_LSB: u8 = 0x65;
    pub const TEMP_THIGH_MSB: u8 = 0x66;
    pub const TEMP_THIGH_LSB: u8 = 0x67;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    Config,
    Admin,
    Virtual,
}

/// Which of the four disjoint ranges `register` falls in.
pub fn access(register: u8) -> Option<Access> {
    match register {
        r if READ_ONLY.contains(&r) => Some(Access::ReadOnly),
        r if CONFIG.contains(&r) => Some(Access::Config),
        r if ADMIN.contains(&r) => Some(Access::Admin),
        r if VIRTUAL.contains(&r) => Some(Access::Virtual),
        _ => None,
    }
}

/// How a raw register byte is presented.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Decode {
    Byte,
    Signed,
    Bcd,
    /// Unsigned, tenths.
    Tenths,
    /// Signed, hundredths.
    SignedHundredths,
    /// Signed, thousandths.
    SignedThousandths,
}

impl Decode {
    pub fn apply(self, raw: u8) -> f32 {
        match self {
            Decode::Byte => raw as f32,
            Decode::Signed => raw as i8 as f32,
            Decode::Bcd => crate::codec::bcd_to_dec(raw) as f32,
            Decode::Tenths => raw as f32 / 10.0,
            Decode::SignedHundredths => raw as i8 as f32 / 100.0,
            Decode::SignedThousandths => raw as i8 as f32 / 1000.0,
        }
    }
}

pub fn decode_hint(register: u8) -> Decode {
    use conf::*;
    use vreg::*;

    match register {
        LOW_VOLTAGE | RECOVERY_VOLTAGE => Decode::Tenths,
        ADJ_VUSB | ADJ_VIN | ADJ_VOUT => Decode::SignedHundredths,
        ADJ_IOUT => Decode::SignedThousandths,
        BELOW_TEMP_POINT | OVER_TEMP_POINT => Decode::Signed,
        ALARM1_SECOND..=ALARM2_DAY => Decode::Bcd,
        DST_BEGIN_MON..=DST_END_MIN => Decode::Bcd,
        RTC_SEC..=RTC_HOUR | RTC_DAY..=RTC_YEAR => Decode::Bcd,
        RTC_MIN_ALARM..=RTC_DAY_ALARM => Decode::Bcd,
        _ => Decode::Byte,
    }
}

pub const FW_ID_WITTYPI_5: u8 = 0x51;
pub const FW_ID_WITTYPI_5_MINI: u8 = 0x52;
pub const FW_ID_WITTYPI_5_L3V7: u8 = 0x53;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum Model {
    Unknown = 0,
    WittyPi5 = 1,
    WittyPi5Mini = 2,
    WittyPi5L3V7 = 3,
}

impl Model {
    pub fn from_firmware_id(id: u8) -> Self {
        match id {
            FW_ID_WITTYPI_5 => Model::WittyPi5,
            FW_ID_WITTYPI_5_MINI => Model::WittyPi5Mini,
            FW_ID_WITTYPI_5_L3V7 => Model::WittyPi5L3V7,
            _ => Model::Unknown,
        }
    }

    pub fn is_known(self) -> bool {
        self != Model::Unknown
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Model::Unknown => "Unknown",
            Model::WittyPi5 => "Witty Pi 5",
            Model::WittyPi5Mini => "Witty Pi 5 Mini",
            Model::WittyPi5L3V7 => "Witty Pi 5 L3V7",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum ActionReason {
    Unknown = 0,
    Alarm1 = 1,
    Alarm2 = 2,
    ButtonClick = 3,
    VinDrop = 4,
    VinRecover = 5,
    OverTemperature = 6,
    BelowTemperature = 7,
    PowerConnected = 8,
    Reboot = 9,
    MissedHeartbeat = 10,
    ExternalShutdown = 11,
    ExternalReboot = 12,
}

impl ActionReason {
    /// Unrecognised codes read as `Unknown`.
    pub fn from_code(code: u8) -> Self {
        Self::from_u8(code).unwrap_or(ActionReason::Unknown)
    }
}

impl fmt::Display for ActionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ActionReason::*;

        f.write_str(match self {
            Unknown => "Unknown",
            Alarm1 => "Scheduled Startup",
            Alarm2 => "Scheduled Shutdown",
            ButtonClick => "Button Click",
            VinDrop => "Vin < Vlow",
            VinRecover => "Vin > Vrec",
            OverTemperature => "Over Temperature",
            BelowTemperature => "Below Temperature",
            PowerConnected => "Power Newly Connected",
            Reboot => "Reboot",
            MissedHeartbeat => "Missed Heartbeat",
            ExternalShutdown => "Shutdown Externally",
            ExternalReboot => "Reboot Externally",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PowerMode {
    Usb,
    Vin,
    Unpowered,
    Other(u8),
}

impl From<u8> for PowerMode {
    fn from(raw: u8) -> Self {
        match raw {
            0 => PowerMode::Usb,
            1 => PowerMode::Vin,
            255 => PowerMode::Unpowered,
            other => PowerMode::Other(other),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum RpiState {
    Off = 0,
    Starting = 1,
    On = 2,
    Stopping = 3,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum TempAction {
    None = 0,
    Startup = 1,
    Shutdown = 2,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum Directory {
    None = 0,
    Root = 1,
    Conf = 2,
    Log = 3,
    Schedule = 4,
}

/// Values of the shutdown register.
pub mod shutdown {
    /// Set by the firmware: the Pi should shut down.
    pub const TURN_RPI_OFF: u8 = 1;
    /// Set by the host when it powers off on its own.
    pub const RPI_POWERING_OFF: u8 = 2;
    /// Set by the host when it reboots.
    pub const RPI_REBOOTING: u8 = 3;
}

/// A password/opcode pair. The high byte is the password.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u16)]
pub enum AdminCommand {
    PrintProductInfo = 0x17F0,
    FormatDisk = 0x37FD,
    ResetRtc = 0x387C,
    EnableIdEepromWp = 0x81EE,
    DisableIdEepromWp = 0x82ED,
    ResetConf = 0x945B,
    SyncConf = 0x955C,
    SaveLog = 0x975D,
    LoadScript = 0x9915,
    ListFiles = 0xA0F1,
    ChooseScript = 0xA159,
    PurgeScript = 0xA260,
}

impl AdminCommand {
    pub fn code(self) -> u16 {
        self as u16
    }
}

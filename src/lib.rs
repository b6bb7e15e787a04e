//! Host-side control of the Witty Pi 5 power management board over I2C.
//!
//! [`WittyPi`] is the entry point. Every register access goes through a
//! cross-process [`lock::BusLock`] held for one exchange at a time, so the
//! daemon and other tools can share the bus.

pub mod codec;
pub mod config;
pub mod driver;
pub mod error;
pub mod lock;
pub mod time;

pub use config::{Config, LogMode};
pub use driver::wittypi::{
    detect_model,
    packet::{pack_filename, unpack_filename, Listing},
    registers::{ActionReason, AdminCommand, Model, PowerMode, RpiState, TempAction},
    settings::{Alarm, AlarmTime, Setting, TempBound, TempRule, Trim},
    telemetry::celsius_to_fahrenheit,
    WittyPi,
};
pub use error::{Error, Result};
pub use time::{network::NetworkTime, DateTime, HostClock, SystemClock};

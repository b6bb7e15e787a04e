use std::{path::PathBuf, time::Duration};

use tracing_subscriber::EnvFilter;

pub const I2C_BUS: u8 = 1;
pub const I2C_ADDRESS: u8 = 0x51;
pub const I2C_LOCK: &str = "/var/lock/wittypi5_i2c.lock";

/// Everything needed to reach the board. Built once at startup and handed to
/// [`crate::WittyPi::open`].
#[derive(Debug, Clone)]
pub struct Config {
    pub bus: u8,
    pub address: u8,
    pub lock_path: PathBuf,
    pub retry: RetryPolicy,
    pub lock: LockPolicy,
    pub log_mode: LogMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus: I2C_BUS,
            address: I2C_ADDRESS,
            lock_path: PathBuf::from(I2C_LOCK),
            retry: RetryPolicy::default(),
            lock: LockPolicy::default(),
            log_mode: LogMode::WithTime,
        }
    }
}

/// Bounds for the validated read and write loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Ceiling on locked exchanges per validated call.
    pub max_attempts: u32,
    /// Consecutive identical reads needed before a value is accepted.
    pub stable_reads: u32,
    /// Pause between a write and its read-back.
    pub verify_delay: Duration,
    /// Pause after a failed exchange, taken with the lock released.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            stable_reads: 2,
            verify_delay: Duration::from_micros(100),
            backoff: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    WithTime,
    WithoutTime,
    Off,
}

impl LogMode {
    /// Installs the global subscriber. Call once, before any device access.
    pub fn init(self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match self {
            LogMode::WithTime => tracing_subscriber::fmt().with_env_filter(filter).init(),
            LogMode::WithoutTime => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .without_time()
                .init(),
            LogMode::Off => {}
        }
    }

    pub fn is_quiet(self) -> bool {
        self == LogMode::Off
    }
}

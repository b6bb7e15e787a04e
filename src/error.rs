use std::{io, ops::RangeInclusive};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i2c transport error")]
    Transport(#[from] TransportError),
    #[error("register {register:#04x} not validated after {attempts} attempts")]
    ValidationExhausted { register: u8, attempts: u32 },
    #[error("protocol error")]
    Protocol(#[from] ProtocolError),
    #[error("value out of range")]
    Range(#[from] RangeError),
    #[error("time sync error")]
    Time(#[from] TimeError),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open i2c bus {bus}")]
    Open {
        bus: u8,
        #[source]
        source: rppal::i2c::Error,
    },
    #[error("failed to acquire the bus lock")]
    Lock(#[from] LockError),
    #[error("i2c exchange failed on register {register:#04x}")]
    Exchange { register: u8 },
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to open lock file")]
    Open(#[source] io::Error),
    #[error("lock still held elsewhere after {attempts} attempts")]
    Busy { attempts: u32 },
    #[error("flock failed")]
    Flock(#[source] nix::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("filename is empty")]
    EmptyFilename,
    #[error("filename contains framing byte {byte:?}")]
    FramingByte { byte: char },
    #[error("missing begin marker")]
    MissingBegin,
    #[error("missing end marker")]
    MissingEnd,
    #[error("missing delimiter")]
    MissingDelimiter,
    #[error("crc mismatch: packet carries {carried:#04x}, payload hashes to {computed:#04x}")]
    CrcMismatch { carried: u8, computed: u8 },
    #[error("stream ended without terminator after {len} bytes")]
    Unterminated { len: usize },
    #[error("upload stopped after {written} of {len} bytes")]
    Truncated { written: usize, len: usize },
}

#[derive(Debug, Error, PartialEq)]
#[error("{field} = {value} is outside {min}..={max}")]
pub struct RangeError {
    pub field: &'static str,
    pub value: f32,
    pub min: f32,
    pub max: f32,
}

impl RangeError {
    /// Returns `Ok(value)` when it lies in `range`.
    pub fn check<T>(field: &'static str, value: T, range: RangeInclusive<T>) -> Result<T, Self>
    where
        T: PartialOrd + Copy + Into<f32>,
    {
        if range.contains(&value) {
            Ok(value)
        } else {
            Err(Self {
                field,
                value: value.into(),
                min: (*range.start()).into(),
                max: (*range.end()).into(),
            })
        }
    }
}

#[derive(Debug, Error)]
pub enum TimeError {
    #[error("failed to resolve {host}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("network i/o failed")]
    Network(#[from] io::Error),
    #[error("response has no Date header")]
    MissingDate,
    #[error("unparseable Date header {0:?}")]
    BadDate(String),
    #[error("local time {0} does not exist or is ambiguous")]
    LocalTime(String),
    #[error("failed to set system clock")]
    SetClock(#[source] nix::Error),
}

//! Single-register transactions against the board.
//!
//! A read is one combined exchange (write the index, read one byte); a write
//! is one two-byte exchange. Each exchange runs under its own bus lock. The
//! validated forms loop over whole locked exchanges, pausing with the lock
//! released.

use std::fmt::Debug;

use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};
use tracing::{debug, trace, warn};

use crate::{
    config::RetryPolicy,
    error::{Error, Result, TransportError},
    lock::BusLock,
};

// Failures the caller expects (e.g. polling for a board that is not there)
// are demoted to trace when the engine is quiet.
macro_rules! note {
    ($quiet:expr, $($arg:tt)+) => {
        if $quiet {
            trace!($($arg)+)
        } else {
            warn!($($arg)+)
        }
    };
}

pub struct Engine<I2C, D> {
    pub i2c: I2C,
    pub address: u8,
    pub delay: D,
    lock: BusLock,
    policy: RetryPolicy,
    quiet: bool,
}

impl<I2C, D> Engine<I2C, D>
where
    I2C: Write + WriteRead,
    <I2C as Write>::Error: Debug,
    <I2C as WriteRead>::Error: Debug,
    D: DelayUs<u32>,
{
    pub fn new(i2c: I2C, address: u8, lock: BusLock, policy: RetryPolicy, delay: D) -> Self {
        Self {
            i2c,
            address,
            delay,
            lock,
            policy,
            quiet: false,
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    /// Reads one register.
    ///
    /// Without validation this is a single exchange. With validation the
    /// exchange repeats until `stable_reads` consecutive reads agree, up to
    /// `max_attempts` exchanges.
    pub fn read(&mut self, register: u8, validate: bool) -> Result<u8> {
        if !validate {
            return self.exchange_read(register).map_err(Error::from);
        }

        let max_attempts = self.policy.max_attempts;
        let mut last_value: Option<u8> = None;
        let mut same_count = 0;
        let mut last_err = None;

        for attempt in 1..=max_attempts {
            match self.exchange_read(register) {
                Ok(value) => {
                    match last_value {
                        Some(last) if last == value => same_count += 1,
                        Some(last) => {
                            note!(
                                self.quiet,
                                "register {register:#04x} changed from {last:#04x} to {value:#04x} on attempt {attempt}"
                            );
                            last_value = Some(value);
                            same_count = 1;
                        }
                        None => {
                            last_value = Some(value);
                            same_count = 1;
                        }
                    }

                    if same_count >= self.policy.stable_reads {
                        debug!("register {register:#04x} = {value:#04x} after {attempt} reads");
                        return Ok(value);
                    }
                }
                Err(err) => {
                    last_err = Some(err);
                    self.backoff();
                }
            }
        }

        note!(
            self.quiet,
            "no stable reading for register {register:#04x} after {max_attempts} attempts"
        );

        match (last_value, last_err) {
            (None, Some(err)) => Err(err.into()),
            _ => Err(Error::ValidationExhausted {
                register,
                attempts: max_attempts,
            }),
        }
    }

    /// Writes one register.
    ///
    /// Without validation this is a single exchange. With validation each
    /// attempt writes, waits `verify_delay` and reads back, until the value
    /// sticks or `max_attempts` attempts are used.
    pub fn write(&mut self, register: u8, value: u8, validate: bool) -> Result<()> {
        if !validate {
            return self.exchange_write(register, value).map_err(Error::from);
        }

        let max_attempts = self.policy.max_attempts;
        let mut read_back = false;
        let mut last_err = None;

        for attempt in 1..=max_attempts {
            if let Err(err) = self.exchange_write(register, value) {
                last_err = Some(err);
                self.backoff();
                continue;
            }

            self.delay.delay_us(self.policy.verify_delay.as_micros() as u32);

            match self.exchange_read(register) {
                Ok(actual) if actual == value => {
                    debug!("register {register:#04x} set to {value:#04x} on attempt {attempt}");
                    return Ok(());
                }
                Ok(actual) => {
                    read_back = true;
                    note!(
                        self.quiet,
                        "set register {register:#04x} to {value:#04x} but read back {actual:#04x}, retrying"
                    );
                }
                Err(err) => {
                    last_err = Some(err);
                    self.backoff();
                }
            }
        }

        note!(
            self.quiet,
            "giving up on register {register:#04x} after {max_attempts} attempts"
        );

        match (read_back, last_err) {
            (false, Some(err)) => Err(err.into()),
            _ => Err(Error::ValidationExhausted {
                register,
                attempts: max_attempts,
            }),
        }
    }

    /// Validated reads of several registers, in order. Each is independent:
    /// a field may change between two reads.
    pub fn read_group<const N: usize>(&mut self, registers: [u8; N]) -> Result<[u8; N]> {
        let mut values = [0u8; N];
        for (value, register) in values.iter_mut().zip(registers) {
            *value = self.read(register, true)?;
        }
        Ok(values)
    }

    pub(crate) fn exchange_read(&mut self, register: u8) -> Result<u8, TransportError> {
        let _guard = self.lock.acquire(&mut self.delay)?;

        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(|err| {
                note!(self.quiet, "read of register {register:#04x} failed: {err:?}");
                TransportError::Exchange { register }
            })?;

        trace!("read {register:#04x} -> {:#04x}", buf[0]);
        Ok(buf[0])
    }

    pub(crate) fn exchange_write(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        let _guard = self.lock.acquire(&mut self.delay)?;

        Write::write(&mut self.i2c, self.address, &[register, value]).map_err(|err| {
            note!(self.quiet, "write of register {register:#04x} failed: {err:?}");
            TransportError::Exchange { register }
        })?;

        trace!("wrote {register:#04x} <- {value:#04x}");
        Ok(())
    }

    fn backoff(&mut self) {
        self.delay.delay_us(self.policy.backoff.as_micros() as u32);
    }
}

#[cfg(test)]
pub(crate) fn test_engine(
    name: &str,
    bus: crate::driver::mock::MockBus,
) -> Engine<crate::driver::mock::MockBus, crate::driver::mock::NoDelay> {
    Engine::new(
        bus,
        crate::config::I2C_ADDRESS,
        crate::lock::temp_lock(name),
        RetryPolicy::default(),
        crate::driver::mock::NoDelay::default(),
    )
}

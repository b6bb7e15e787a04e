//! Multi-byte transfers through a single FIFO register.
//!
//! The firmware advances the port on every touch, so each byte is one
//! unvalidated exchange: a read-back would observe the next queued byte.

use std::fmt::Debug;

use bytes::{BufMut, BytesMut};
use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};
use tracing::debug;

use super::engine::Engine;
use crate::error::Result;

impl<I2C, D> Engine<I2C, D>
where
    I2C: Write + WriteRead,
    <I2C as Write>::Error: Debug,
    <I2C as WriteRead>::Error: Debug,
    D: DelayUs<u32>,
{
    /// Reads `register` until `terminator` arrives or `max_len` bytes are
    /// collected. The terminator, if seen, is the last byte returned.
    pub fn read_stream(&mut self, register: u8, max_len: usize, terminator: u8) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(max_len);

        while buf.len() < max_len {
            let byte = self.read(register, false)?;
            buf.put_u8(byte);
            if byte == terminator {
                break;
            }
        }

        debug!("read {} bytes from stream {register:#04x}", buf.len());
        Ok(buf)
    }

    /// Writes `data` to `register` byte by byte, stopping after the first
    /// `terminator`. Returns how many bytes went out. Any failed exchange
    /// fails the whole transfer.
    pub fn write_stream(&mut self, register: u8, data: &[u8], terminator: u8) -> Result<usize> {
        let mut written = 0;

        for &byte in data {
            self.write(register, byte, false)?;
            written += 1;
            if byte == terminator {
                break;
            }
        }

        debug!("wrote {written} bytes to stream {register:#04x}");
        Ok(written)
    }
}

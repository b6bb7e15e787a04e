//! Live measurements. These change between samples, so the byte pairs are
//! read without validation.

use std::fmt::Debug;

use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};
use num_traits::FromPrimitive;

use super::{
    registers::{ro, vreg, PowerMode, RpiState},
    WittyPi,
};
use crate::error::Result;

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 1.8 + 32.0
}

impl<I2C, D> WittyPi<I2C, D>
where
    I2C: Write + WriteRead,
    <I2C as Write>::Error: Debug,
    <I2C as WriteRead>::Error: Debug,
    D: DelayUs<u32>,
{
    pub fn power_mode(&mut self) -> Result<PowerMode> {
        Ok(self.get(ro::POWER_MODE)?.into())
    }

    pub fn missed_heartbeats(&mut self) -> Result<u8> {
        self.get(ro::MISSED_HEARTBEAT)
    }

    /// `None` for a state code this driver does not know.
    pub fn rpi_state(&mut self) -> Result<Option<RpiState>> {
        Ok(RpiState::from_u8(self.get(ro::RPI_STATE)?))
    }

    /// USB-C input, volts.
    pub fn vusb(&mut self) -> Result<f32> {
        self.thousandths(ro::VUSB_MV_MSB, ro::VUSB_MV_LSB)
    }

    /// Main input, volts.
    pub fn vin(&mut self) -> Result<f32> {
        self.thousandths(ro::VIN_MV_MSB, ro::VIN_MV_LSB)
    }

    /// Output to the Pi, volts.
    pub fn vout(&mut self) -> Result<f32> {
        self.thousandths(ro::VOUT_MV_MSB, ro::VOUT_MV_LSB)
    }

    /// Output to the Pi, amps.
    pub fn iout(&mut self) -> Result<f32> {
        self.thousandths(ro::IOUT_MA_MSB, ro::IOUT_MA_LSB)
    }

    /// Board temperature in °C, from the TMP112's 12-bit reading.
    pub fn temperature(&mut self) -> Result<f32> {
        let msb = self.engine.read(vreg::TEMP_MSB, false)?;
        let lsb = self.engine.read(vreg::TEMP_LSB, false)?;

        // left-align the 12 bits, then shift back to sign-extend
        let raw = i16::from_be_bytes([msb, lsb]) >> 4;
        Ok(raw as f32 * 0.0625)
    }

    /// Big-endian milli-units. Bit 15 is not part of the value.
    fn thousandths(&mut self, msb: u8, lsb: u8) -> Result<f32> {
        let msb = self.engine.read(msb, false)? & 0x7F;
        let lsb = self.engine.read(lsb, false)?;
        Ok(u16::from_be_bytes([msb, lsb]) as f32 / 1000.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::{mock::MockBus, wittypi::test_device};

    #[test]
    fn voltages_and_current() {
        let bus = MockBus::new()
            .with_reg(ro::VIN_MV_MSB, 0x30)
            .with_reg(ro::VIN_MV_LSB, 0x39)
            .with_reg(ro::IOUT_MA_MSB, 0x81)
            .with_reg(ro::IOUT_MA_LSB, 0xF4);
        let mut device = test_device("telemetry", bus);

        assert_eq!(device.vin().unwrap(), 12.345);
        // top bit masked off
        assert_eq!(device.iout().unwrap(), 0.5);
        assert_eq!(device.vusb().unwrap(), 0.0);
        assert_eq!(device.engine.i2c.reads_of(ro::VIN_MV_MSB), 1);
    }

    #[test]
    fn temperature_sign() {
        let bus = MockBus::new()
            .with_reg(vreg::TEMP_MSB, 0x19)
            .with_reg(vreg::TEMP_LSB, 0x00);
        let mut device = test_device("temp-positive", bus);
        assert_eq!(device.temperature().unwrap(), 25.0);

        let bus = MockBus::new()
            .with_reg(vreg::TEMP_MSB, 0xE7)
            .with_reg(vreg::TEMP_LSB, 0x00);
        let mut device = test_device("temp-negative", bus);
        assert_eq!(device.temperature().unwrap(), -25.0);

        let bus = MockBus::new()
            .with_reg(vreg::TEMP_MSB, 0x00)
            .with_reg(vreg::TEMP_LSB, 0x10);
        let mut device = test_device("temp-lsb", bus);
        assert_eq!(device.temperature().unwrap(), 0.0625);
    }

    #[test]
    fn fahrenheit() {
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert_eq!(celsius_to_fahrenheit(-40.0), -40.0);
    }

    #[test]
    fn power_state() {
        let bus = MockBus::new()
            .with_reg(ro::POWER_MODE, 255)
            .with_reg(ro::RPI_STATE, 2)
            .with_reg(ro::MISSED_HEARTBEAT, 4);
        let mut device = test_device("power-state", bus);

        assert_eq!(device.power_mode().unwrap(), PowerMode::Unpowered);
        assert_eq!(device.rpi_state().unwrap(), Some(RpiState::On));
        assert_eq!(device.missed_heartbeats().unwrap(), 4);
    }
}

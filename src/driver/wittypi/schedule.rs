//! Schedule scripts stored on the board's disk.

use std::fmt::Debug;

use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};
use tracing::info;

use super::{
    packet::{pack_filename, Listing},
    registers::{admin, AdminCommand, Directory},
    WittyPi,
};
use crate::{
    codec::END,
    error::{ProtocolError, Result},
};

pub const DOWNLOAD_BUFFER_SIZE: usize = 1024;

impl<I2C, D> WittyPi<I2C, D>
where
    I2C: Write + WriteRead,
    <I2C as Write>::Error: Debug,
    <I2C as WriteRead>::Error: Debug,
    D: DelayUs<u32>,
{
    /// Lists the selectable scripts in the schedule directory.
    pub fn list_schedule_scripts(&mut self) -> Result<Listing> {
        self.set(admin::DIR, Directory::Schedule as u8)?;
        self.run_admin_command(AdminCommand::ListFiles)?;

        let raw = self
            .engine
            .read_stream(admin::DOWNLOAD, DOWNLOAD_BUFFER_SIZE - 1, END)?;
        Ok(Listing::parse(&raw)?)
    }

    /// Makes `name` the active schedule script. The firmware restarts to load
    /// it, so the board stops answering for a while afterwards; poll
    /// [`WittyPi::detect_model`] to see it come back.
    ///
    /// A name whose checksum is the end marker cannot be sent whole. The
    /// upload then fails with [`ProtocolError::Truncated`] and the script is
    /// not chosen.
    pub fn choose_schedule_script(&mut self, name: impl AsRef<[u8]>) -> Result<()> {
        let name = name.as_ref();
        let packet = pack_filename(name)?;

        self.set(admin::DIR, Directory::Schedule as u8)?;
        let written = self.engine.write_stream(admin::UPLOAD, &packet, END)?;
        if written != packet.len() {
            return Err(ProtocolError::Truncated {
                written,
                len: packet.len(),
            }
            .into());
        }
        self.run_admin_command(AdminCommand::ChooseScript)?;

        info!("schedule script {} chosen", String::from_utf8_lossy(name));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        codec::crc8,
        driver::{mock::MockBus, wittypi::test_device},
        error::Error,
    };

    fn board() -> MockBus {
        MockBus::new()
            .self_clearing(admin::COMMAND)
            .upload_port(admin::UPLOAD)
    }

    #[test]
    fn lists_scripts() {
        let bus = board().download(admin::DOWNLOAD, b"<a|b|schedule|c>trailing");
        let mut device = test_device("list-scripts", bus);

        let listing = device.list_schedule_scripts().unwrap();

        assert_eq!(listing.len(), 3);
        assert_eq!(listing.get(2), Some(&b"b"[..]));
        assert_eq!(device.engine.i2c.reg(admin::DIR), Directory::Schedule as u8);
        assert_eq!(device.engine.i2c.writes_to(admin::COMMAND), vec![0xF1]);
        // stops at the end marker
        assert_eq!(device.engine.i2c.reads_of(admin::DOWNLOAD), 16);
    }

    #[test]
    fn unterminated_listing() {
        let bus = board().download(admin::DOWNLOAD, b"<a|b");
        let mut device = test_device("list-unterminated", bus);

        assert!(matches!(
            device.list_schedule_scripts(),
            Err(Error::Protocol(ProtocolError::Unterminated { len: 1023 }))
        ));
        assert_eq!(device.engine.i2c.reads_of(admin::DOWNLOAD), 1023);
    }

    #[test]
    fn chooses_script() {
        let mut device = test_device("choose-script", board());

        device.choose_schedule_script("night.wpi").unwrap();

        let bus = &device.engine.i2c;
        assert_eq!(bus.reg(admin::DIR), Directory::Schedule as u8);
        assert_eq!(bus.uploaded(admin::UPLOAD), &pack_filename("night.wpi").unwrap()[..]);
        assert_eq!(bus.writes_to(admin::PASSWORD).last(), Some(&0xA1));
        assert_eq!(bus.writes_to(admin::COMMAND), vec![0x59]);
    }

    #[test]
    fn chooses_listed_script_by_bytes() {
        let bus = board().download(admin::DOWNLOAD, b"<caf\xe9.wpi>");
        let mut device = test_device("choose-listed", bus);

        let listing = device.list_schedule_scripts().unwrap();
        let name = listing.get(1).unwrap();
        device.choose_schedule_script(name).unwrap();

        assert_eq!(
            device.engine.i2c.uploaded(admin::UPLOAD),
            &pack_filename(b"caf\xe9.wpi").unwrap()[..]
        );
    }

    #[test]
    fn end_marker_checksum_is_not_chosen() {
        assert_eq!(crc8(b"<s94.wpi"), END);
        let mut device = test_device("choose-truncated", board());

        assert!(matches!(
            device.choose_schedule_script("s94.wpi"),
            Err(Error::Protocol(ProtocolError::Truncated { written: 10, len: 11 }))
        ));
        assert!(device.engine.i2c.writes_to(admin::PASSWORD).is_empty());
        assert!(device.engine.i2c.writes_to(admin::COMMAND).is_empty());
    }

    #[test]
    fn framing_byte_in_name_touches_nothing() {
        let mut device = test_device("choose-framing", board());

        assert!(matches!(
            device.choose_schedule_script("a>b.wpi"),
            Err(Error::Protocol(ProtocolError::FramingByte { byte: '>' }))
        ));
        assert!(device.engine.i2c.log().is_empty());
    }

    #[test]
    fn empty_name_touches_nothing() {
        let mut device = test_device("choose-empty", board());

        assert!(matches!(
            device.choose_schedule_script(""),
            Err(Error::Protocol(ProtocolError::EmptyFilename))
        ));
        assert!(device.engine.i2c.log().is_empty());
    }
}

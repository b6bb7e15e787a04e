//! Driver for the Witty Pi 5 power management board.
//!
//! A [`WittyPi`] owns an open bus handle for as long as it lives; batches of
//! calls share it. [`WittyPi::with_device`] (or [`WittyPi::with_bus`] for the
//! configured bus) opens a handle for one call and closes it on every exit
//! path.

use std::fmt::Debug;

use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};
use rppal::i2c::I2c;
use tracing::{debug, trace};

use super::{engine::Engine, ThreadDelay};
use crate::{
    config::Config,
    error::{Result, TransportError},
    lock::BusLock,
};

pub mod packet;
pub mod registers;
pub mod rtc;
pub mod schedule;
pub mod settings;
pub mod telemetry;

use registers::{admin, ro, ActionReason, AdminCommand, Model};

const MODEL_DETECT_ATTEMPTS: u32 = 3;
const MODEL_DETECT_INTERVAL_US: u32 = 100_000;

pub struct WittyPi<I2C = I2c, D = ThreadDelay> {
    pub engine: Engine<I2C, D>,
}

impl WittyPi<I2c, ThreadDelay> {
    /// Opens the configured bus. The handle is closed when the value drops.
    pub fn open(config: &Config) -> Result<Self> {
        let i2c = I2c::with_bus(config.bus).map_err(|source| TransportError::Open {
            bus: config.bus,
            source,
        })?;
        debug!("opened i2c bus {} for board at {:#04x}", config.bus, config.address);

        Ok(Self::new(i2c, config, ThreadDelay))
    }

    /// Runs `f` against the configured bus, opened just for it.
    pub fn with_bus<T>(config: &Config, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        Self::with_device(|| Self::open(config), f)
    }
}

impl<I2C, D> WittyPi<I2C, D>
where
    I2C: Write + WriteRead,
    <I2C as Write>::Error: Debug,
    <I2C as WriteRead>::Error: Debug,
    D: DelayUs<u32>,
{
    pub fn new(i2c: I2C, config: &Config, delay: D) -> Self {
        let lock = BusLock::new(config.lock_path.clone(), config.lock);
        let mut engine = Engine::new(i2c, config.address, lock, config.retry, delay);
        engine.set_quiet(config.log_mode.is_quiet());
        Self { engine }
    }

    /// Opens a handle with `open`, runs `f` against it and closes it again,
    /// whether or not `f` succeeds.
    pub fn with_device<T>(
        open: impl FnOnce() -> Result<Self>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let mut device = open()?;
        f(&mut device)
    }

    /// Validated read.
    pub fn get(&mut self, register: u8) -> Result<u8> {
        self.engine.read(register, true)
    }

    /// Validated write.
    pub fn set(&mut self, register: u8, value: u8) -> Result<()> {
        self.engine.write(register, value, true)
    }

    /// Reads the firmware id. Any failure reads as [`Model::Unknown`], so
    /// this doubles as a presence check.
    pub fn detect_model(&mut self) -> Model {
        let quiet = self.engine.is_quiet();
        self.engine.set_quiet(true);

        let mut firmware_id = None;
        for attempt in 1..=MODEL_DETECT_ATTEMPTS {
            // the id register may still be settling at boot, so no validation
            match self.engine.read(ro::FW_ID, false) {
                Ok(id) => {
                    firmware_id = Some(id);
                    break;
                }
                Err(err) => {
                    trace!("model detection attempt {attempt} failed: {err}");
                    if attempt < MODEL_DETECT_ATTEMPTS {
                        self.engine.delay.delay_us(MODEL_DETECT_INTERVAL_US);
                    }
                }
            }
        }

        self.engine.set_quiet(quiet);
        firmware_id.map_or(Model::Unknown, Model::from_firmware_id)
    }

    /// Major and minor firmware version. The minor register holds x100.
    pub fn firmware_version(&mut self) -> Result<(u8, u8)> {
        let [major, minor] = self
            .engine
            .read_group([ro::FW_VERSION_MAJOR, ro::FW_VERSION_MINOR])?;
        Ok((major, minor))
    }

    pub fn run_admin_command(&mut self, command: AdminCommand) -> Result<()> {
        debug!("running admin command {command:?}");
        self.run_admin_code(command.code())
    }

    /// Writes the password, then the opcode. The board clears both once the
    /// command has run, so the opcode write is not read back, and a replay
    /// runs the command again.
    pub fn run_admin_code(&mut self, code: u16) -> Result<()> {
        let [password, opcode] = code.to_be_bytes();
        self.set(admin::PASSWORD, password)?;
        self.engine.write(admin::COMMAND, opcode, false)
    }

    pub fn startup_reason(&mut self) -> Result<ActionReason> {
        let reg = self.get(ro::ACTION_REASON)?;
        Ok(ActionReason::from_code(reg >> 4))
    }

    pub fn shutdown_reason(&mut self) -> Result<ActionReason> {
        let reg = self.get(ro::ACTION_REASON)?;
        Ok(ActionReason::from_code(reg & 0x0F))
    }

    pub fn is_script_in_use(&mut self) -> Result<bool> {
        Ok(self.get(ro::MISC)? & 0x01 != 0)
    }

    /// Reads the shutdown register. The read itself counts as the watchdog
    /// heartbeat.
    pub fn shutdown_request(&mut self) -> Result<u8> {
        self.get(admin::SHUTDOWN)
    }

    pub fn set_shutdown_request(&mut self, value: u8) -> Result<()> {
        self.set(admin::SHUTDOWN, value)
    }
}

/// Opens the bus, identifies the board and closes the bus again.
pub fn detect_model(config: &Config) -> Model {
    match WittyPi::open(config) {
        Ok(mut device) => device.detect_model(),
        Err(err) => {
            trace!("model detection could not open the bus: {err}");
            Model::Unknown
        }
    }
}

#[cfg(test)]
pub(crate) fn test_device(
    name: &str,
    bus: crate::driver::mock::MockBus,
) -> WittyPi<crate::driver::mock::MockBus, crate::driver::mock::NoDelay> {
    WittyPi {
        engine: crate::driver::engine::test_engine(name, bus),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        driver::mock::{Exchange, MockBus, NoDelay},
        error::Error,
    };

    #[test]
    fn detects_each_model() {
        for (id, model) in [
            (0x51, Model::WittyPi5),
            (0x52, Model::WittyPi5Mini),
            (0x53, Model::WittyPi5L3V7),
            (0x00, Model::Unknown),
        ] {
            let mut device = test_device("model-each", MockBus::new().with_reg(ro::FW_ID, id));
            assert_eq!(device.detect_model(), model);
        }
    }

    #[test]
    fn model_detection_retries_then_gives_up() {
        let mut device = test_device("model-dead", MockBus::new().failing(ro::FW_ID));

        assert_eq!(device.detect_model(), Model::Unknown);
        assert_eq!(device.engine.i2c.reads_of(ro::FW_ID), 3);
        assert_eq!(device.engine.delay.total_us, 2 * 100_000);
        assert!(!device.engine.is_quiet());
    }

    #[test]
    fn model_detection_recovers() {
        let bus = MockBus::new().with_reg(ro::FW_ID, 0x52).fail_next(2);
        let mut device = test_device("model-recover", bus);

        assert_eq!(device.detect_model(), Model::WittyPi5Mini);
        assert_eq!(device.engine.i2c.reads_of(ro::FW_ID), 3);
    }

    #[test]
    fn admin_command_writes_password_then_opcode() {
        let bus = MockBus::new().self_clearing(admin::COMMAND);
        let mut device = test_device("admin", bus);

        device.run_admin_command(AdminCommand::ResetConf).unwrap();

        assert_eq!(device.engine.i2c.writes_to(admin::PASSWORD), vec![0x94]);
        assert_eq!(device.engine.i2c.writes_to(admin::COMMAND), vec![0x5B]);
        assert_eq!(device.engine.i2c.reads_of(admin::COMMAND), 0);

        let log = device.engine.i2c.log();
        let password_at = log
            .iter()
            .position(|e| matches!(e, Exchange::Write { data, .. } if data[0] == admin::PASSWORD))
            .unwrap();
        let command_at = log
            .iter()
            .position(|e| matches!(e, Exchange::Write { data, .. } if data[0] == admin::COMMAND))
            .unwrap();
        assert!(password_at < command_at);
    }

    #[test]
    fn admin_command_stops_if_password_fails() {
        let bus = MockBus::new().ignore_writes(admin::PASSWORD);
        let mut device = test_device("admin-fail", bus);

        let err = device.run_admin_code(0x37FD).unwrap_err();
        assert!(matches!(err, Error::ValidationExhausted { register: admin::PASSWORD, .. }));
        assert!(device.engine.i2c.writes_to(admin::COMMAND).is_empty());
    }

    #[test]
    fn action_reasons_from_nibbles() {
        let mut device = test_device("reasons", MockBus::new().with_reg(ro::ACTION_REASON, 0x1A));

        assert_eq!(device.startup_reason().unwrap(), ActionReason::Alarm1);
        assert_eq!(device.shutdown_reason().unwrap(), ActionReason::MissedHeartbeat);
    }

    #[test]
    fn script_in_use_flag() {
        let mut device = test_device("script-flag", MockBus::new().with_reg(ro::MISC, 0x03));
        assert!(device.is_script_in_use().unwrap());

        let mut device = test_device("script-flag-off", MockBus::new().with_reg(ro::MISC, 0x02));
        assert!(!device.is_script_in_use().unwrap());
    }

    #[test]
    fn one_shot_handle() {
        let opened = std::cell::Cell::new(0);
        let version = WittyPi::with_device(
            || {
                opened.set(opened.get() + 1);
                Ok(test_device(
                    "one-shot",
                    MockBus::new().with_reg(ro::FW_VERSION_MAJOR, 2),
                ))
            },
            |device| device.firmware_version(),
        )
        .unwrap();

        assert_eq!(version, (2, 0));
        assert_eq!(opened.get(), 1);
    }

    #[test]
    fn one_shot_open_failure_skips_the_call() {
        let mut ran = false;
        let result: Result<()> = WittyPi::<MockBus, NoDelay>::with_device(
            || Err(TransportError::Exchange { register: ro::FW_ID }.into()),
            |_| {
                ran = true;
                Ok(())
            },
        );

        assert!(matches!(
            result,
            Err(Error::Transport(TransportError::Exchange { register: ro::FW_ID }))
        ));
        assert!(!ran);
    }

    #[test]
    fn firmware_version_pair() {
        let bus = MockBus::new()
            .with_reg(ro::FW_VERSION_MAJOR, 1)
            .with_reg(ro::FW_VERSION_MINOR, 5);
        let mut device = test_device("fw-version", bus);

        assert_eq!(device.firmware_version().unwrap(), (1, 5));
    }
}

//! `wp5d`: keeps the Pi and the Witty Pi 5 in step.
//!
//! Once a second the daemon looks for the board. On connect it reconciles the
//! clocks, then polls the shutdown register, which doubles as the watchdog
//! heartbeat, and shuts the Pi down when the board asks.
//!
//! `wp5d --poweroff` and `wp5d --reboot` tell the board the Pi is going down
//! on its own, and exit.

use std::{process::Command, time::Duration};

use anyhow::{bail, Context};
use flume::RecvTimeoutError;
use tracing::{error, info, warn};
use wittypi5::{driver::wittypi::registers::shutdown, Config, HostClock, Model, WittyPi};

const TICK: Duration = Duration::from_secs(1);
const SHUTDOWN_CMD: &str = "shutdown";
const SHUTDOWN_ARGS: &[&str] = &["-h", "now"];

fn main() -> anyhow::Result<()> {
    let config = Config::default();
    config.log_mode.init();

    if let Some(notice) = parse_args()? {
        let mut device = WittyPi::open(&config)?;
        device
            .set_shutdown_request(notice)
            .context("failed to notify the board")?;
        return Ok(());
    }

    let (stop_tx, stop_rx) = flume::bounded(1);
    ctrlc::set_handler(move || {
        info!("received ctrl+c, exiting");
        let _ = stop_tx.try_send(());
    })?;

    info!("wp5d {} started", env!("CARGO_PKG_VERSION"));

    let mut device = WittyPi::open(&config)?;
    let mut model = Model::Unknown;

    loop {
        match stop_rx.recv_timeout(TICK) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let detected = device.detect_model();
        if detected != model {
            if detected.is_known() {
                info!("connected to {detected}");
                on_connect(&mut device);
            } else {
                warn!("lost contact with {model}");
            }
            model = detected;
        }

        if !model.is_known() {
            continue;
        }

        match device.shutdown_request() {
            Ok(shutdown::TURN_RPI_OFF) => {
                shut_down(&mut device)?;
                break;
            }
            Ok(_) => {}
            Err(err) => warn!("heartbeat failed: {err}"),
        }
    }

    info!("exit");
    Ok(())
}

/// `--poweroff` and `--reboot` map to the value written to the shutdown
/// register.
fn parse_args() -> anyhow::Result<Option<u8>> {
    let mut notice = None;

    for arg in std::env::args().skip(1) {
        notice = match arg.as_str() {
            "--poweroff" => Some(shutdown::RPI_POWERING_OFF),
            "--reboot" => Some(shutdown::RPI_REBOOTING),
            other => bail!("unknown argument {other:?}"),
        };
    }

    Ok(notice)
}

/// Trusts the RTC when it holds a plausible time, otherwise seeds it from
/// the system clock.
fn on_connect(device: &mut WittyPi) {
    match device.firmware_version() {
        Ok((major, minor)) => info!("firmware v{major}.{minor:02}"),
        Err(err) => warn!("failed to read firmware version: {err}"),
    }

    let synced = match device.rtc_time() {
        Ok(t) if t.is_valid() => {
            info!("rtc has valid time, writing it to the system clock");
            device.rtc_to_system(&HostClock).map(|_| ())
        }
        Ok(t) => {
            info!("rtc time {t} is invalid, writing system time to rtc");
            device.system_to_rtc(&HostClock)
        }
        Err(err) => Err(err),
    };
    if let Err(err) = synced {
        error!("clock sync failed: {err}");
    }

    match device.startup_reason() {
        Ok(reason) => info!("startup reason: {reason}"),
        Err(err) => warn!("failed to read startup reason: {err}"),
    }
}

fn shut_down(device: &mut WittyPi) -> anyhow::Result<()> {
    info!("board requested shutdown");

    if let Err(err) = device.set_shutdown_request(0) {
        error!("failed to clear shutdown request: {err}");
    }
    match device.shutdown_reason() {
        Ok(reason) => info!("shutdown reason: {reason}"),
        Err(err) => warn!("failed to read shutdown reason: {err}"),
    }

    let status = Command::new(SHUTDOWN_CMD)
        .args(SHUTDOWN_ARGS)
        .status()
        .context("failed to run shutdown")?;
    if !status.success() {
        bail!("shutdown exited with {status}");
    }

    Ok(())
}

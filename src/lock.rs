//! Cross-process exclusion for the shared I2C bus.
//!
//! Every process talking to the board takes an advisory `flock` on one
//! well-known file for the span of a single exchange. The guard is dropped
//! before any retry pause.

use std::{
    fs::{File, OpenOptions},
    os::unix::{fs::OpenOptionsExt, io::AsRawFd},
    path::{Path, PathBuf},
};

use embedded_hal::blocking::delay::DelayUs;
use nix::{
    errno::Errno,
    fcntl::{flock, FlockArg},
    sys::stat::{umask, Mode},
};
use tracing::{trace, warn};

use crate::{config::LockPolicy, error::LockError};

#[derive(Debug, Clone)]
pub struct BusLock {
    path: PathBuf,
    policy: LockPolicy,
}

/// Holds the lock until dropped.
#[derive(Debug)]
pub struct BusGuard {
    file: File,
}

impl BusLock {
    pub fn new(path: impl Into<PathBuf>, policy: LockPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Takes the lock, polling while another process holds it.
    pub fn acquire<D: DelayUs<u32>>(&self, delay: &mut D) -> Result<BusGuard, LockError> {
        let file = self.open()?;
        let mut attempts = 0;

        loop {
            attempts += 1;

            match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
                Ok(()) => {
                    trace!("acquired bus lock {:?} on attempt {attempts}", self.path);
                    return Ok(BusGuard { file });
                }
                Err(Errno::EWOULDBLOCK) | Err(Errno::EINTR) => {
                    if attempts >= self.policy.attempts {
                        warn!("bus lock {:?} still busy after {attempts} attempts", self.path);
                        return Err(LockError::Busy { attempts });
                    }
                    delay.delay_us(self.policy.interval.as_micros() as u32);
                }
                Err(err) => return Err(LockError::Flock(err)),
            }
        }
    }

    // Created world-writable so the daemon (root) and users share one file.
    fn open(&self) -> Result<File, LockError> {
        let old_mask = umask(Mode::empty());
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o666)
            .open(&self.path);
        umask(old_mask);

        file.map_err(LockError::Open)
    }
}

impl Drop for BusGuard {
    fn drop(&mut self) {
        let _ = flock(self.file.as_raw_fd(), FlockArg::Unlock);
    }
}

#[cfg(test)]
pub(crate) fn temp_lock(name: &str) -> BusLock {
    let path = std::env::temp_dir().join(format!("wp5-{}-{name}.lock", std::process::id()));
    BusLock::new(
        path,
        LockPolicy {
            attempts: 3,
            interval: std::time::Duration::from_millis(1),
        },
    )
}

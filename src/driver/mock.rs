//! In-memory stand-in for the board, for driver tests.

use std::collections::{HashMap, HashSet, VecDeque};

use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};

/// One recorded bus exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    Write { address: u8, data: Vec<u8> },
    WriteRead { address: u8, register: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

/// Register file with scripted behaviour.
///
/// Reads are served, in order of priority, from a per-register script, a
/// download FIFO, or the register file. Writes land in the register file
/// unless the register is an upload port, ignores writes, or clears itself.
#[derive(Debug, Default)]
pub struct MockBus {
    regs: HashMap<u8, u8>,
    scripted: HashMap<u8, VecDeque<u8>>,
    downloads: HashMap<u8, VecDeque<u8>>,
    upload_ports: HashSet<u8>,
    uploads: HashMap<u8, Vec<u8>>,
    ignored: HashSet<u8>,
    self_clearing: HashSet<u8>,
    failing: HashSet<u8>,
    fail_next: u32,
    log: Vec<Exchange>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reg(mut self, register: u8, value: u8) -> Self {
        self.regs.insert(register, value);
        self
    }

    /// Successive reads of `register` return `values`, then fall back to the
    /// register file.
    pub fn script(mut self, register: u8, values: &[u8]) -> Self {
        self.scripted
            .entry(register)
            .or_default()
            .extend(values.iter().copied());
        self
    }

    /// `register` behaves as a FIFO port yielding `bytes`, then 0xFF.
    pub fn download(mut self, register: u8, bytes: &[u8]) -> Self {
        self.downloads
            .entry(register)
            .or_default()
            .extend(bytes.iter().copied());
        self
    }

    pub fn upload_port(mut self, register: u8) -> Self {
        self.upload_ports.insert(register);
        self
    }

    pub fn ignore_writes(mut self, register: u8) -> Self {
        self.ignored.insert(register);
        self
    }

    pub fn self_clearing(mut self, register: u8) -> Self {
        self.self_clearing.insert(register);
        self
    }

    /// Every exchange touching `register` fails.
    pub fn failing(mut self, register: u8) -> Self {
        self.failing.insert(register);
        self
    }

    /// The next `count` exchanges fail, whatever they touch.
    pub fn fail_next(mut self, count: u32) -> Self {
        self.fail_next = count;
        self
    }

    pub fn reg(&self, register: u8) -> u8 {
        self.regs.get(&register).copied().unwrap_or(0)
    }

    pub fn uploaded(&self, register: u8) -> &[u8] {
        self.uploads.get(&register).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn log(&self) -> &[Exchange] {
        &self.log
    }

    pub fn reads_of(&self, register: u8) -> usize {
        self.log
            .iter()
            .filter(|e| matches!(e, Exchange::WriteRead { register: r, .. } if *r == register))
            .count()
    }

    /// Values written to `register`, in order.
    pub fn writes_to(&self, register: u8) -> Vec<u8> {
        self.log
            .iter()
            .filter_map(|e| match e {
                Exchange::Write { data, .. } if data.first() == Some(&register) => data.get(1).copied(),
                _ => None,
            })
            .collect()
    }

    fn should_fail(&mut self, register: u8) -> bool {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return true;
        }
        self.failing.contains(&register)
    }
}

impl Write for MockBus {
    type Error = MockError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.log.push(Exchange::Write {
            address,
            data: bytes.to_vec(),
        });

        let (register, value) = match bytes {
            [register, value] => (*register, *value),
            _ => return Err(MockError),
        };

        if self.should_fail(register) {
            return Err(MockError);
        }

        if self.upload_ports.contains(&register) {
            self.uploads.entry(register).or_default().push(value);
        } else if self.self_clearing.contains(&register) {
            self.regs.insert(register, 0);
        } else if !self.ignored.contains(&register) {
            self.regs.insert(register, value);
        }

        Ok(())
    }
}

impl WriteRead for MockBus {
    type Error = MockError;

    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error> {
        let register = match bytes {
            [register] => *register,
            _ => return Err(MockError),
        };

        self.log.push(Exchange::WriteRead { address, register });

        if self.should_fail(register) {
            return Err(MockError);
        }

        let value = if let Some(v) = self.scripted.get_mut(&register).and_then(VecDeque::pop_front) {
            v
        } else if let Some(fifo) = self.downloads.get_mut(&register) {
            fifo.pop_front().unwrap_or(0xFF)
        } else {
            self.reg(register)
        };

        buffer[0] = value;
        Ok(())
    }
}

/// Records requested pauses instead of sleeping.
#[derive(Debug, Default)]
pub struct NoDelay {
    pub total_us: u64,
}

impl DelayUs<u32> for NoDelay {
    fn delay_us(&mut self, us: u32) {
        self.total_us += us as u64;
    }
}

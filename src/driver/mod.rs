use std::time::Duration;

pub mod engine;
pub mod stream;
pub mod wittypi;

#[cfg(test)]
pub(crate) mod mock;

/// Blocking delay backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl embedded_hal::blocking::delay::DelayUs<u32> for ThreadDelay {
    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(us as u64))
    }
}

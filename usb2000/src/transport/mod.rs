#[cfg(any(test, feature = "fake"))]
pub mod fake;
#[cfg(feature = "usb")]
pub mod usb;

use crate::error::Result;
use core::time::Duration;

/// Synchronous access to the bulk endpoints of a single device.
///
/// Implementations know nothing about the spectrometer protocol. `read` reports an expired
/// timeout as [`Error::Timeout`](crate::error::Error::Timeout), callers decide if that is a
/// failure or a signal.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn write(&mut self, endpoint: u8, data: &[u8]) -> Result<()>;
    fn read(&mut self, endpoint: u8, max_len: usize, timeout: Duration) -> Result<Vec<u8>>;
    /// Applies the device's USB configuration and claims its interface
    fn configure(&mut self) -> Result<()>;
    /// Best-effort device reset, failures are only logged
    fn reset(&mut self);
    /// Best-effort release of the device, calling it twice is harmless
    fn close(&mut self);
}

/// Blocks the current thread while the sensor is exposed
pub trait Delay {
    fn delay(&mut self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

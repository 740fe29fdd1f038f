use thiserror::Error;
use core::result::Result as CoreResult;

pub type Result<T> = CoreResult<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No compatible spectrometer is attached")]
    DeviceNotFound,
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Timed out waiting for data from the spectrometer")]
    Timeout,
    #[error("Integration time of {0} µs is outside of the supported range")]
    InvalidArgument(u32),
    #[error("Spectrometer connection is already closed")]
    Closed,
    #[error("Configuration parameter {index} has unexpected value {value:?}")]
    InvalidConfiguration { index: u8, value: String },

    #[cfg(feature = "usb")]
    #[error("USB error: {0}")]
    Usb(rusb::Error),
    #[error("Transport error: {0}")]
    Transport(String),
}

#[cfg(feature = "usb")]
impl From<rusb::Error> for Error {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Timeout => Error::Timeout,
            other => Error::Usb(other),
        }
    }
}

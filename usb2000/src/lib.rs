//! Driver for Ocean Optics USB2000 and USB2000+ linear CCD spectrometers.
//!
//! [`Spectrometer`] talks to the device over any [`Transport`], [`SpectroscopyExperiment`]
//! builds single shots, signal averaging and continuous acquisition on top of it.

pub mod calibration;
pub mod codec;
pub(crate) mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod experiment;
pub mod response;
pub mod spectrometer;
pub mod spectrum;
pub mod transport;

pub use calibration::{WavelengthCalibration, DUMMY_PIXELS};
pub use config::{SpectrometerConf, Timeouts};
pub use device::{DeviceIdentity, IntegrationTime, Revision, VENDOR_ID};
pub use error::{Error, Result};
pub use experiment::{CancellationToken, SpectroscopyExperiment};
pub use response::DeviceConfiguration;
pub use spectrometer::{Spectrometer, State};
pub use spectrum::{CalibratedSpectrum, RawSpectrum};
pub use transport::{Delay, StdDelay, Transport};
#[cfg(feature = "usb")]
pub use transport::usb::{attached_devices, UsbTransport};

use crate::{
    calibration::WavelengthCalibration,
    codec::Codec,
    command::Command,
    config::SpectrometerConf,
    device::{IntegrationTime, Revision},
    error::{Error, Result},
    response::DeviceConfiguration,
    spectrum::{CalibratedSpectrum, RawSpectrum},
    transport::{Delay, StdDelay, Transport},
};
use core::fmt;
#[cfg(feature = "usb")]
use crate::{device::DeviceIdentity, transport::usb::UsbTransport};

/// Lifecycle of a driver instance. Only `Ready` accepts commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Configuring,
    Initialized,
    Ready,
    Closed,
}

pub struct Spectrometer<IO, D = StdDelay>
where
    IO: Transport,
    D: Delay,
{
    io: IO,
    delay: D,
    revision: Revision,
    codec: Codec,
    state: State,
    configuration: DeviceConfiguration,
    calibration: WavelengthCalibration,
    integration_time: IntegrationTime,
}

impl<IO: Transport, D: Delay> fmt::Debug for Spectrometer<IO, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spectrometer")
            .field("revision", &self.revision)
            .field("state", &self.state)
            .field("serial_number", &self.configuration.serial_number)
            .field("integration_time", &self.integration_time)
            .finish()
    }
}

#[cfg(feature = "usb")]
impl Spectrometer<UsbTransport> {
    pub fn open(identity: DeviceIdentity, conf: SpectrometerConf) -> Result<Self> {
        let revision = identity.revision().ok_or(Error::DeviceNotFound)?;
        Self::new(UsbTransport::open(identity)?, revision, conf)
    }

    /// Opens whichever supported spectrometer is attached
    pub fn open_any(conf: SpectrometerConf) -> Result<Self> {
        let (io, revision) = UsbTransport::open_any()?;
        Self::new(io, revision, conf)
    }
}

impl<IO: Transport> Spectrometer<IO> {
    pub fn new(io: IO, revision: Revision, conf: SpectrometerConf) -> Result<Self> {
        Self::with_delay(io, revision, conf, StdDelay)
    }
}

impl<IO, D> Spectrometer<IO, D>
where
    IO: Transport,
    D: Delay,
{
    /// Brings the device from a fresh connection up to `Ready`, reading its configuration
    pub fn with_delay(
        mut io: IO,
        revision: Revision,
        conf: SpectrometerConf,
        delay: D,
    ) -> Result<Self> {
        let codec = Codec::new(revision.protocol(), conf.timeouts);

        log::debug!("{} state: {:?}", revision, State::Configuring);
        io.reset();
        io.configure()?;
        codec.drain(&mut io)?;

        codec.send(&mut io, Command::Initialize)?;
        if codec.protocol().spectrum_on_initialize {
            let discarded = codec.drain_endpoint(&mut io, codec.protocol().spectrum_endpoint)?;
            log::debug!("Discarded {} packets acquired on initialization", discarded);
        }
        codec.send(&mut io, Command::SetIntegrationTime(conf.integration_time))?;
        let configuration = codec.read_configuration(&mut io)?;
        log::info!(
            "Initialized {} with serial number {}",
            revision,
            configuration.serial_number
        );

        let mut spectrometer = Spectrometer {
            io,
            delay,
            revision,
            codec,
            state: State::Initialized,
            calibration: WavelengthCalibration::from(&configuration),
            configuration,
            integration_time: conf.integration_time,
        };
        spectrometer.transition(State::Ready);
        Ok(spectrometer)
    }

    fn transition(&mut self, next: State) {
        log::debug!("{} state: {:?} -> {:?}", self.revision, self.state, next);
        self.state = next;
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            State::Ready => Ok(()),
            State::Closed => Err(Error::Closed),
            other => Err(Error::Protocol(format!(
                "Spectrometer is not ready yet, current state is {:?}",
                other
            ))),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn configuration(&self) -> &DeviceConfiguration {
        &self.configuration
    }

    pub fn calibration(&self) -> &WavelengthCalibration {
        &self.calibration
    }

    /// Last integration time sent to the device
    pub fn integration_time(&self) -> IntegrationTime {
        self.integration_time
    }

    /// Amount of raw pixels in every acquisition
    pub fn pixel_count(&self) -> usize {
        self.codec.protocol().pixel_count()
    }

    pub fn transport(&self) -> &IO {
        &self.io
    }

    pub fn set_integration_time(&mut self, us: u32) -> Result<()> {
        self.ensure_ready()?;
        let integration_time = IntegrationTime::from_micros(us)?;
        self.codec
            .send(&mut self.io, Command::SetIntegrationTime(integration_time))?;
        log::debug!("Integration time set to {}", integration_time);
        self.integration_time = integration_time;
        Ok(())
    }

    /// Takes a single reading, dummy pixels included
    pub fn acquire_raw(&mut self) -> Result<RawSpectrum> {
        self.ensure_ready()?;
        let samples =
            self.codec
                .read_spectrum(&mut self.io, &mut self.delay, self.integration_time)?;
        if samples.len() != self.pixel_count() {
            return Err(Error::Protocol(format!(
                "Expected {} pixels, got {}",
                self.pixel_count(),
                samples.len()
            )));
        }
        Ok(samples)
    }

    /// Takes a single reading and calibrates it
    pub fn get_spectrum(&mut self) -> Result<CalibratedSpectrum> {
        let raw = self.acquire_raw()?;
        Ok(CalibratedSpectrum::from_raw(&self.calibration, &raw[..]))
    }

    /// Sends shutdown and releases the device. Does nothing once closed.
    pub fn close(&mut self) -> Result<()> {
        if self.state == State::Closed {
            return Ok(());
        }
        log::info!("Shutting down {}", self.revision);
        let shutdown = self.codec.send(&mut self.io, Command::Shutdown);
        self.io.close();
        self.transition(State::Closed);
        shutdown
    }
}

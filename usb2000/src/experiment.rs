use crate::{
    calibration::DUMMY_PIXELS,
    error::Result,
    spectrometer::Spectrometer,
    spectrum::CalibratedSpectrum,
    transport::{Delay, StdDelay, Transport},
};
#[cfg(feature = "usb")]
use crate::{config::SpectrometerConf, transport::usb::UsbTransport};
use std::{
    iter::FusedIterator,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Requests a running acquisition to stop once the current shot completes.
///
/// Clones observe the same flag, so a token can be handed to another thread while the
/// acquisition runs. Create a new token for every acquisition.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

type Progress<'s> = Box<dyn FnMut(usize) + Send + 's>;

/// Session level access to a spectrometer: single shots, signal averaging and continuous
/// acquisition
#[derive(Debug)]
pub struct SpectroscopyExperiment<IO, D = StdDelay>
where
    IO: Transport,
    D: Delay,
{
    spectrometer: Spectrometer<IO, D>,
}

#[cfg(feature = "usb")]
impl SpectroscopyExperiment<UsbTransport> {
    /// Connects to whichever supported spectrometer is attached
    pub fn open(conf: SpectrometerConf) -> Result<Self> {
        Ok(Self::new(Spectrometer::open_any(conf)?))
    }
}

impl<IO, D> SpectroscopyExperiment<IO, D>
where
    IO: Transport,
    D: Delay,
{
    pub fn new(spectrometer: Spectrometer<IO, D>) -> Self {
        SpectroscopyExperiment { spectrometer }
    }

    pub fn spectrometer(&self) -> &Spectrometer<IO, D> {
        &self.spectrometer
    }

    pub fn get_spectrum(&mut self) -> Result<CalibratedSpectrum> {
        self.spectrometer.get_spectrum()
    }

    pub fn set_integration_time(&mut self, us: u32) -> Result<()> {
        self.spectrometer.set_integration_time(us)
    }

    /// Sums up to `count` shots, yielding the running total after every one of them.
    ///
    /// Nothing is acquired until the returned iterator is polled. Cancelling `token` ends the
    /// sequence after the shot in flight, without an error.
    pub fn integrate(&mut self, count: usize, token: CancellationToken) -> Integration<'_, IO, D> {
        let pixel_count = self.spectrometer.pixel_count();
        let wavelengths = self.spectrometer.calibration().axis(pixel_count);
        Integration {
            spectrometer: &mut self.spectrometer,
            token,
            count,
            completed: 0,
            accumulator: vec![0; pixel_count],
            wavelengths,
            progress: None,
            finished: false,
        }
    }

    /// Yields single shots until `token` is cancelled or an acquisition fails
    pub fn continuous(&mut self, token: CancellationToken) -> Continuous<'_, IO, D> {
        Continuous {
            spectrometer: &mut self.spectrometer,
            token,
            finished: false,
        }
    }

    pub fn close(&mut self) -> Result<()> {
        self.spectrometer.close()
    }

    pub fn into_inner(self) -> Spectrometer<IO, D> {
        self.spectrometer
    }
}

/// Lazy signal averaging sequence created by [`SpectroscopyExperiment::integrate`]
pub struct Integration<'s, IO, D>
where
    IO: Transport,
    D: Delay,
{
    spectrometer: &'s mut Spectrometer<IO, D>,
    token: CancellationToken,
    count: usize,
    completed: usize,
    accumulator: Vec<u64>,
    wavelengths: Vec<f64>,
    progress: Option<Progress<'s>>,
    finished: bool,
}

impl<'s, IO, D> Integration<'s, IO, D>
where
    IO: Transport,
    D: Delay,
{
    /// Calls `progress` with the amount of completed shots, once per shot
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: FnMut(usize) + Send + 's,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn completed(&self) -> usize {
        self.completed
    }
}

impl<'s, IO, D> Iterator for Integration<'s, IO, D>
where
    IO: Transport,
    D: Delay,
{
    type Item = Result<CalibratedSpectrum>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.completed == self.count {
            return None;
        }
        if self.token.is_cancelled() {
            log::info!(
                "Integration cancelled after {} of {} shots",
                self.completed,
                self.count
            );
            self.finished = true;
            return None;
        }

        let raw = match self.spectrometer.acquire_raw() {
            Ok(raw) => raw,
            Err(err) => {
                self.finished = true;
                return Some(Err(err));
            }
        };
        for (sum, sample) in self.accumulator.iter_mut().zip(&raw) {
            *sum += u64::from(*sample);
        }
        self.completed += 1;
        log::debug!("Integrated shot {} of {}", self.completed, self.count);
        if let Some(progress) = self.progress.as_mut() {
            progress(self.completed);
        }

        Some(Ok(CalibratedSpectrum {
            wavelengths: self.wavelengths.clone(),
            intensities: self
                .accumulator
                .iter()
                .skip(DUMMY_PIXELS)
                .copied()
                .collect(),
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            (0, Some(self.count - self.completed))
        }
    }
}

impl<'s, IO: Transport, D: Delay> FusedIterator for Integration<'s, IO, D> {}

/// Endless single shot sequence created by [`SpectroscopyExperiment::continuous`]
pub struct Continuous<'s, IO, D>
where
    IO: Transport,
    D: Delay,
{
    spectrometer: &'s mut Spectrometer<IO, D>,
    token: CancellationToken,
    finished: bool,
}

impl<'s, IO, D> Iterator for Continuous<'s, IO, D>
where
    IO: Transport,
    D: Delay,
{
    type Item = Result<CalibratedSpectrum>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.token.is_cancelled() {
            self.finished = true;
            return None;
        }
        let spectrum = self.spectrometer.get_spectrum();
        self.finished = spectrum.is_err();
        Some(spectrum)
    }
}

impl<'s, IO: Transport, D: Delay> FusedIterator for Continuous<'s, IO, D> {}

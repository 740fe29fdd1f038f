use clap::{ArgEnum, Args};
use simple_eyre::Result;
use usb2000::{
    IntegrationTime, Revision, Spectrometer, SpectrometerConf, SpectroscopyExperiment,
    UsbTransport,
};

pub type UsbExperiment = SpectroscopyExperiment<UsbTransport>;

#[derive(Args)]
pub struct UsbConf {
    /// Hardware revision of the spectrometer, detected automatically if omitted
    #[clap(short, long, value_enum)]
    pub revision: Option<RevisionArg>,

    /// Integration time in microseconds
    #[clap(short, long, value_parser = parse_integration_time, default_value = "100000")]
    pub integration_time: IntegrationTime,
}

#[derive(ArgEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevisionArg {
    Usb2000Plus,
    Usb2000,
}

impl From<RevisionArg> for Revision {
    fn from(arg: RevisionArg) -> Self {
        match arg {
            RevisionArg::Usb2000Plus => Revision::Usb2000Plus,
            RevisionArg::Usb2000 => Revision::Usb2000,
        }
    }
}

fn parse_integration_time(s: &str) -> Result<IntegrationTime> {
    let us: u32 = s.parse()?;
    Ok(IntegrationTime::from_micros(us)?)
}

impl UsbConf {
    pub fn open_experiment(&self) -> usb2000::Result<UsbExperiment> {
        let conf = SpectrometerConf {
            integration_time: self.integration_time,
            ..Default::default()
        };
        let spectrometer = match self.revision {
            Some(revision) => Spectrometer::open(Revision::from(revision).identity(), conf)?,
            None => Spectrometer::open_any(conf)?,
        };
        Ok(SpectroscopyExperiment::new(spectrometer))
    }

    /// Runs `f` on an initialized spectrometer and shuts it down afterwards, even on failure
    pub fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut UsbExperiment) -> Result<T>,
    {
        let experiment = self.open_experiment()?;
        let mut experiment = scopeguard::guard(experiment, |mut experiment| {
            if let Err(err) = experiment.close() {
                log::warn!("Could not shut down spectrometer: {}", err);
            }
        });
        f(&mut *experiment)
    }
}

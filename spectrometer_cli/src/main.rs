mod cli;
mod output;
mod usb;

use clap::Parser;
use simple_eyre::{eyre::eyre, Result};
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use usb2000::{attached_devices, CalibratedSpectrum, CancellationToken, Error};

use cli::*;
use usb::UsbConf;

fn main() -> Result<()> {
    simple_eyre::install()?;
    let cli = Cli::parse();
    env_logger::init();

    match &cli.command {
        Commands::List => list_devices(),
        Commands::Check(conf) => check_device(conf),
        Commands::Config(conf) => get_configuration(conf),
        Commands::Read(subcomm) => match &subcomm.command {
            ReadCommands::Single(conf) => get_single_reading(conf),
            ReadCommands::Integrate(conf) => get_integrated_reading(conf),
        },
    }
}

/// Returns std::io::Write stream with coloring enabled if program is run interactively
fn get_stdout() -> StandardStream {
    StandardStream::stdout(if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    })
}

fn print_colored(color: Color, message: &str) -> Result<()> {
    let mut stdout = get_stdout();
    stdout.set_color(ColorSpec::new().set_fg(Some(color)))?;
    writeln!(&mut stdout, "{}", message)?;
    stdout.reset()?;
    Ok(())
}

fn list_devices() -> Result<()> {
    let devices = attached_devices()?;
    if devices.is_empty() {
        return print_colored(Color::Red, "No compatible device found.");
    }
    print_colored(Color::Green, "Attached spectrometers:")?;
    for identity in devices {
        match identity.revision() {
            Some(revision) => println!("{} {}", identity, revision),
            None => println!("{}", identity),
        }
    }
    Ok(())
}

fn check_device(conf: &UsbConf) -> Result<()> {
    let mut experiment = match conf.open_experiment() {
        Ok(experiment) => experiment,
        Err(Error::DeviceNotFound) => {
            return print_colored(Color::Red, "No compatible device found.")
        }
        Err(err) => return Err(err.into()),
    };
    let spectrometer = experiment.spectrometer();
    let message = format!(
        "{} with serial number {} is ready",
        spectrometer.revision(),
        spectrometer.configuration().serial_number
    );
    experiment.close()?;
    print_colored(Color::Green, &message)
}

fn get_configuration(conf: &UsbConf) -> Result<()> {
    conf.run(|experiment| {
        println!("{}", experiment.spectrometer().configuration());
        Ok(())
    })
}

fn get_single_reading(conf: &SingleReadingConf) -> Result<()> {
    let spectrum = conf.usb.run(|experiment| Ok(experiment.get_spectrum()?))?;
    conf.output.write_spectrum(&spectrum)
}

fn get_integrated_reading(conf: &IntegrateConf) -> Result<()> {
    let token = CancellationToken::new();
    let stop = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("Stopping after the current spectrum...");
        stop.cancel();
    })?;

    let count = conf.count as usize;
    let total = conf.usb.run(|experiment| {
        let shots = experiment
            .integrate(count, token)
            .with_progress(|shot| log::info!("Captured spectrum {} of {}", shot, count));
        last_total(shots)
    })?;
    conf.output.write_spectrum(&total)
}

/// Keeps the latest running total, so a stopped integration still returns the shots completed so far
fn last_total<I>(shots: I) -> Result<CalibratedSpectrum>
where
    I: Iterator<Item = usb2000::Result<CalibratedSpectrum>>,
{
    let mut total = None;
    for spectrum in shots {
        total = Some(spectrum?);
    }
    total.ok_or_else(|| eyre!("No spectra were captured"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Output;
    use pretty_assertions::assert_eq;
    use usb2000::{
        transport::fake::{FakeTransport, RecordingDelay},
        Revision, Spectrometer, SpectrometerConf, SpectroscopyExperiment,
    };

    fn experiment(shots: usize) -> SpectroscopyExperiment<FakeTransport, RecordingDelay> {
        let fake = FakeTransport::new(Revision::Usb2000Plus);
        for _ in 0..shots {
            fake.push_spectrum(vec![100; 2048]);
        }
        let spectrometer = Spectrometer::with_delay(
            fake,
            Revision::Usb2000Plus,
            SpectrometerConf::default(),
            RecordingDelay::default(),
        )
        .unwrap();
        SpectroscopyExperiment::new(spectrometer)
    }

    #[test]
    fn full_integration_is_summed() {
        let mut experiment = experiment(3);
        let total = last_total(experiment.integrate(3, CancellationToken::new())).unwrap();
        assert_eq!(total.intensities, vec![300; 2028]);
    }

    #[test]
    fn stopped_integration_is_still_written() {
        let mut experiment = experiment(5);
        let token = CancellationToken::new();
        let stop = token.clone();
        let shots = experiment.integrate(5, token).with_progress(move |shot| {
            if shot == 2 {
                stop.cancel();
            }
        });
        let total = last_total(shots).unwrap();
        assert_eq!(total.intensities, vec![200; 2028]);

        let path = std::env::temp_dir().join(format!(
            "stopped_integration_{}.csv",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let output = Output {
            output: Some(path.clone()),
        };
        output.write_spectrum(&total).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(written.lines().count(), 2028 + 1);
        assert!(written.lines().nth(1).unwrap().ends_with(",200"));
    }

    #[test]
    fn integration_stopped_before_first_shot_has_nothing_to_write() {
        let mut experiment = experiment(1);
        let token = CancellationToken::new();
        token.cancel();
        assert!(last_total(experiment.integrate(5, token)).is_err());
    }
}

use crate::{output::Output, usb::UsbConf};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lists attached spectrometers
    List,
    /// Checks if a spectrometer can be opened and initialized
    Check(UsbConf),
    /// Prints calibration and identification data stored on the spectrometer
    Config(UsbConf),
    /// Get readings from spectrometer
    Read(ReadCommand),
}

#[derive(Args)]
pub struct ReadCommand {
    #[clap(subcommand)]
    pub command: ReadCommands,
}

#[derive(Subcommand)]
pub enum ReadCommands {
    /// Get a single calibrated spectrum
    Single(SingleReadingConf),
    /// Sum multiple spectra to improve signal to noise ratio
    Integrate(IntegrateConf),
}

#[derive(Args)]
pub struct SingleReadingConf {
    #[clap(flatten)]
    pub output: Output,

    #[clap(flatten)]
    pub usb: UsbConf,
}

#[derive(Args)]
pub struct IntegrateConf {
    /// Amount of spectra summed up
    #[clap(value_parser = clap::value_parser!(u32).range(1..), default_value = "10")]
    pub count: u32,

    #[clap(flatten)]
    pub output: Output,

    #[clap(flatten)]
    pub usb: UsbConf,
}

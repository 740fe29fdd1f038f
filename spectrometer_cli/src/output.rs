use clap::Args;
use simple_eyre::{eyre::eyre, Result};
use std::{
    fs::File,
    io::{self, BufWriter},
    path::{Path, PathBuf},
};
use usb2000::CalibratedSpectrum;

#[derive(Args)]
pub struct Output {
    /// Path to a CSV file where readings should be stored, printed to stdout if omitted
    #[clap(short, long, value_parser = unique_path_parser, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

fn unique_path_parser(p: &str) -> Result<PathBuf> {
    let p = Path::new(p);
    if p.try_exists()? {
        Err(eyre!("Path {p:?} already exists"))
    } else {
        Ok(p.to_path_buf())
    }
}

impl Output {
    pub fn write_spectrum(&self, spectrum: &CalibratedSpectrum) -> Result<()> {
        match &self.output {
            Some(path) => {
                log::debug!("Saving spectrum to {:?}", path);
                spectrum.write_csv(BufWriter::new(File::create(path)?))?;
            }
            None => spectrum.write_csv(io::stdout().lock())?,
        }
        Ok(())
    }
}

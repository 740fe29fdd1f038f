use crate::calibration::{WavelengthCalibration, DUMMY_PIXELS};
use std::io::{self, Write};

/// Photodiode counts in physical pixel order, dummy pixels included
pub type RawSpectrum = Vec<u16>;

/// Wavelength calibrated intensities with dummy pixels removed
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedSpectrum {
    /// Nanometers, strictly increasing
    pub wavelengths: Vec<f64>,
    /// Arbitrary units, summed over every shot for integrated spectra
    pub intensities: Vec<u64>,
}

impl CalibratedSpectrum {
    /// Pairs raw intensities with the calibrated axis, skipping dummy pixels of both
    pub fn from_raw<I>(calibration: &WavelengthCalibration, intensities: &[I]) -> Self
    where
        I: Copy + Into<u64>,
    {
        CalibratedSpectrum {
            wavelengths: calibration.axis(intensities.len()),
            intensities: intensities
                .iter()
                .skip(DUMMY_PIXELS)
                .map(|i| (*i).into())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.wavelengths
            .iter()
            .copied()
            .zip(self.intensities.iter().copied())
    }

    /// Two column CSV as consumed by export tooling
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        log::trace!("Formatting {} pixels as CSV", self.len());
        writeln!(out, "Wavelength (nm),Intensity")?;
        for (wavelength, intensity) in self.iter() {
            writeln!(out, "{},{}", wavelength, intensity)?;
        }
        out.flush()
    }
}

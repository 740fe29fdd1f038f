use crate::response::DeviceConfiguration;

/// Leading pixels that are not exposed to light and never reach calibrated output
pub const DUMMY_PIXELS: usize = 20;

/// Third order polynomial mapping pixel index onto wavelength in nanometers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthCalibration {
    coefficients: [f64; 4],
}

impl WavelengthCalibration {
    pub fn new(coefficients: [f64; 4]) -> Self {
        WavelengthCalibration { coefficients }
    }

    pub fn wavelength(&self, pixel: usize) -> f64 {
        let [c0, c1, c2, c3] = self.coefficients;
        let i = pixel as f64;
        c0 + i * (c1 + i * (c2 + i * c3))
    }

    /// Wavelengths of pixels `DUMMY_PIXELS..pixel_count`
    pub fn axis(&self, pixel_count: usize) -> Vec<f64> {
        (DUMMY_PIXELS..pixel_count.max(DUMMY_PIXELS))
            .map(|pixel| self.wavelength(pixel))
            .collect()
    }
}

impl From<&DeviceConfiguration> for WavelengthCalibration {
    fn from(config: &DeviceConfiguration) -> Self {
        WavelengthCalibration::new(config.wavelength_coefficients)
    }
}

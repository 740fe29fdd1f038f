use crate::error::{Error, Result};
use core::{fmt, fmt::Display, str::FromStr};

/// Amount of configuration parameters queried on initialization, indices 0 to 16
pub const PARAMETER_COUNT: u8 = 17;

/// Calibration and identification data stored on the device
#[derive(PartialEq, Debug, Clone)]
pub struct DeviceConfiguration {
    pub serial_number: String,
    /// Coefficients of the pixel to wavelength polynomial, lowest order first
    pub wavelength_coefficients: [f64; 4],
    pub stray_light_constant: f64,
    pub nonlinearity_coefficients: [f64; 8],
    pub nonlinearity_order: u32,
    pub optical_bench: String,
    pub device_configuration: String,
}

fn parse_field<T: FromStr>(fields: &[String], index: u8) -> Result<T> {
    let value = field(fields, index)?;
    value.trim().parse().map_err(|_| Error::InvalidConfiguration {
        index,
        value: value.to_string(),
    })
}

fn field(fields: &[String], index: u8) -> Result<&str> {
    fields
        .get(usize::from(index))
        .map(String::as_str)
        .ok_or_else(|| Error::Protocol(format!("Configuration parameter {} is missing", index)))
}

fn parse_array<const N: usize>(fields: &[String], first: u8) -> Result<[f64; N]> {
    let mut values = [0f64; N];
    for (index, value) in (first..).zip(values.iter_mut()) {
        *value = parse_field(fields, index)?;
    }
    Ok(values)
}

impl DeviceConfiguration {
    /// Assembles configuration out of textual parameters ordered by their index
    pub fn from_fields(fields: &[String]) -> Result<Self> {
        Ok(DeviceConfiguration {
            serial_number: field(fields, 0)?.to_string(),
            wavelength_coefficients: parse_array(fields, 1)?,
            stray_light_constant: parse_field(fields, 5)?,
            nonlinearity_coefficients: parse_array(fields, 6)?,
            nonlinearity_order: parse_field(fields, 14)?,
            optical_bench: field(fields, 15)?.to_string(),
            device_configuration: field(fields, 16)?.to_string(),
        })
    }
}

impl Display for DeviceConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |values: &[f64]| {
            values
                .iter()
                .map(|v| format!("{:e}", v))
                .collect::<Vec<_>>()
                .join(", ")
        };
        f.write_fmt(format_args!(
            concat!(
                "Serial number: {}\n",
                "Wavelength calibration: {}\n",
                "Stray light constant: {:e}\n",
                "Nonlinearity correction: {}\n",
                "Nonlinearity polynomial order: {}\n",
                "Optical bench: {}\n",
                "Device configuration: {}",
            ),
            self.serial_number,
            join(&self.wavelength_coefficients),
            self.stray_light_constant,
            join(&self.nonlinearity_coefficients),
            self.nonlinearity_order,
            self.optical_bench,
            self.device_configuration,
        ))
    }
}

pub mod parser;
mod configuration;

pub use configuration::{DeviceConfiguration, PARAMETER_COUNT};

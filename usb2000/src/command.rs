use crate::{
    device::{IntegrationField, IntegrationTime},
    error::{Error, Result},
};

/// Package that can be sent to the spectrometer
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(crate) enum Command {
    Initialize,
    SetIntegrationTime(IntegrationTime),
    RequestSpectrum,
    QueryParameter(u8),
    Shutdown,
}

impl Command {
    /// Convert command enum into byte code for encoding
    fn code(&self) -> u8 {
        use Command::*;
        match *self {
            Initialize => 0x01,
            SetIntegrationTime(_) => 0x02,
            Shutdown => 0x04,
            QueryParameter(_) => 0x05,
            RequestSpectrum => 0x09,
        }
    }

    pub fn encode(&self, field: IntegrationField) -> Result<Vec<u8>> {
        use Command::*;
        let mut package = vec![self.code()];
        match *self {
            SetIntegrationTime(t) => match field {
                IntegrationField::U32Micros => {
                    package.extend_from_slice(&t.as_micros().to_le_bytes())
                }
                IntegrationField::U16Millis => {
                    let ms = u16::try_from(t.as_micros() / 1_000)
                        .map_err(|_| Error::InvalidArgument(t.as_micros()))?;
                    package.extend_from_slice(&ms.to_le_bytes())
                }
            },
            QueryParameter(index) => package.push(index),
            Shutdown => package.extend_from_slice(&[0x00, 0x00]),
            Initialize | RequestSpectrum => {}
        }
        Ok(package)
    }
}

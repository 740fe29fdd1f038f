use crate::error::{Error, Result};
use core::{
    fmt,
    fmt::Display,
    time::Duration,
};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Ocean Optics USB vendor id, shared by every supported model
pub const VENDOR_ID: u16 = 0x2457;

/// Supported hardware revisions, keyed by their USB product id
#[derive(FromPrimitive, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Revision {
    Usb2000Plus = 0x101E,
    Usb2000 = 0x1002,
}

/// Vendor / product id pair of a USB device
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceIdentity {
    /// Matches an identity against the supported revisions
    pub fn revision(&self) -> Option<Revision> {
        if self.vendor_id != VENDOR_ID {
            return None;
        }
        Revision::from_u16(self.product_id)
    }
}

impl Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Width and unit of the "set integration time" payload
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum IntegrationField {
    /// Little-endian u32, microseconds
    U32Micros,
    /// Little-endian u16, milliseconds
    U16Millis,
}

/// How raw spectrum bytes map onto pixels
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SampleLayout {
    /// Consecutive little-endian u16 samples
    LittleEndian,
    /// Packets come in pairs, first one holds low bytes and second one high bytes
    SplitPackets,
}

/// Endpoints and framing parameters of a single revision
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Protocol {
    pub out_endpoint: u8,
    pub config_endpoint: u8,
    pub spectrum_endpoint: u8,
    pub integration_field: IntegrationField,
    pub chunk_size: usize,
    pub max_chunks: usize,
    pub layout: SampleLayout,
    /// Initialize also triggers an acquisition, its transfer has to be discarded
    pub spectrum_on_initialize: bool,
}

impl Protocol {
    /// Amount of pixels in a complete spectrum transfer
    pub fn pixel_count(&self) -> usize {
        self.chunk_size * self.max_chunks / 2
    }

    /// IN endpoints that have to be drained after opening the device
    pub fn in_endpoints(&self) -> [u8; 2] {
        [self.config_endpoint, self.spectrum_endpoint]
    }
}

impl Revision {
    pub const ALL: [Revision; 2] = [Revision::Usb2000Plus, Revision::Usb2000];

    pub fn identity(self) -> DeviceIdentity {
        DeviceIdentity {
            vendor_id: VENDOR_ID,
            product_id: self as u16,
        }
    }

    pub fn protocol(self) -> Protocol {
        use Revision::*;
        match self {
            Usb2000Plus => Protocol {
                out_endpoint: 0x01,
                config_endpoint: 0x81,
                spectrum_endpoint: 0x82,
                integration_field: IntegrationField::U32Micros,
                chunk_size: 512,
                max_chunks: 8,
                layout: SampleLayout::LittleEndian,
                spectrum_on_initialize: false,
            },
            Usb2000 => Protocol {
                out_endpoint: 0x02,
                config_endpoint: 0x87,
                spectrum_endpoint: 0x82,
                integration_field: IntegrationField::U16Millis,
                chunk_size: 64,
                max_chunks: 64,
                layout: SampleLayout::SplitPackets,
                spectrum_on_initialize: true,
            },
        }
    }
}

impl Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Usb2000Plus => f.write_str("USB2000+"),
            Revision::Usb2000 => f.write_str("USB2000"),
        }
    }
}

/// Sensor exposure duration in microseconds
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct IntegrationTime(u32);

impl IntegrationTime {
    pub const MIN_MICROS: u32 = 10_000;
    pub const MAX_MICROS: u32 = 100_000_000;

    pub fn from_micros(us: u32) -> Result<Self> {
        if (Self::MIN_MICROS..=Self::MAX_MICROS).contains(&us) {
            Ok(IntegrationTime(us))
        } else {
            Err(Error::InvalidArgument(us))
        }
    }

    pub fn as_micros(self) -> u32 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_micros(self.0.into())
    }
}

impl Default for IntegrationTime {
    fn default() -> Self {
        IntegrationTime(100_000)
    }
}

impl TryFrom<u32> for IntegrationTime {
    type Error = Error;

    fn try_from(us: u32) -> Result<Self> {
        Self::from_micros(us)
    }
}

impl Display for IntegrationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} µs", self.0)
    }
}

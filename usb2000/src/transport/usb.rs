use super::Transport;
use crate::{
    device::{DeviceIdentity, Revision},
    error::{Error, Result},
};
use core::time::Duration;
use rusb::{Device, DeviceHandle, GlobalContext};

const WRITE_TIMEOUT: Duration = Duration::from_millis(1_000);
const CONFIGURATION: u8 = 1;
const INTERFACE: u8 = 0;

/// Bulk endpoint access through libusb
pub struct UsbTransport {
    handle: DeviceHandle<GlobalContext>,
    identity: DeviceIdentity,
    claimed: bool,
}

impl UsbTransport {
    /// Opens the first attached device with `identity`. Failing to open a matching device, e.g.
    /// for lack of permissions, is reported as a USB error rather than as a missing device.
    pub fn open(identity: DeviceIdentity) -> Result<Self> {
        let device = select(identified_devices()?, identity)?;
        let handle = device.open()?;
        log::info!("Opened USB device {}", identity);
        Ok(UsbTransport {
            handle,
            identity,
            claimed: false,
        })
    }

    /// Opens the first attached device out of supported revisions
    pub fn open_any() -> Result<(Self, Revision)> {
        for revision in Revision::ALL {
            match Self::open(revision.identity()) {
                Ok(transport) => return Ok((transport, revision)),
                Err(Error::DeviceNotFound) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(Error::DeviceNotFound)
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }
}

/// Attached devices paired with their identity, unreadable descriptors are skipped
fn identified_devices() -> Result<Vec<(DeviceIdentity, Device<GlobalContext>)>> {
    let mut found = Vec::new();
    for device in rusb::devices()?.iter() {
        let descriptor = match device.device_descriptor() {
            Ok(d) => d,
            Err(err) => {
                log::debug!(
                    "Skipping device at bus {} address {}: {}",
                    device.bus_number(),
                    device.address(),
                    err
                );
                continue;
            }
        };
        let identity = DeviceIdentity {
            vendor_id: descriptor.vendor_id(),
            product_id: descriptor.product_id(),
        };
        found.push((identity, device));
    }
    Ok(found)
}

fn select<T>(candidates: Vec<(DeviceIdentity, T)>, identity: DeviceIdentity) -> Result<T> {
    candidates
        .into_iter()
        .find(|(candidate, _)| *candidate == identity)
        .map(|(_, device)| device)
        .ok_or(Error::DeviceNotFound)
}

/// Lists identities of attached devices that match one of supported revisions
pub fn attached_devices() -> Result<Vec<DeviceIdentity>> {
    Ok(identified_devices()?
        .into_iter()
        .map(|(identity, _)| identity)
        .filter(|identity| identity.revision().is_some())
        .collect())
}

impl Transport for UsbTransport {
    fn write(&mut self, endpoint: u8, data: &[u8]) -> Result<()> {
        log::trace!("OUT 0x{:02x}: {:02x?}", endpoint, data);
        let written = self.handle.write_bulk(endpoint, data, WRITE_TIMEOUT)?;
        if written != data.len() {
            return Err(Error::Transport(format!(
                "Short write on endpoint 0x{:02x}: {} of {} bytes",
                endpoint,
                written,
                data.len()
            )));
        }
        Ok(())
    }

    fn read(&mut self, endpoint: u8, max_len: usize, timeout: Duration) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_len];
        let count = self.handle.read_bulk(endpoint, &mut buf, timeout)?;
        buf.truncate(count);
        log::trace!("IN 0x{:02x}: {} bytes", endpoint, count);
        Ok(buf)
    }

    fn configure(&mut self) -> Result<()> {
        // Not supported on every platform, claiming the interface reports real failures
        if let Err(err) = self.handle.set_auto_detach_kernel_driver(true) {
            log::debug!("Kernel driver auto-detach unavailable: {}", err);
        }
        self.handle.set_active_configuration(CONFIGURATION)?;
        self.handle.claim_interface(INTERFACE)?;
        self.claimed = true;
        Ok(())
    }

    fn reset(&mut self) {
        if let Err(err) = self.handle.reset() {
            log::warn!("Resetting {} failed: {}", self.identity, err);
        }
    }

    fn close(&mut self) {
        if !self.claimed {
            return;
        }
        if let Err(err) = self.handle.release_interface(INTERFACE) {
            log::warn!("Releasing interface of {} failed: {}", self.identity, err);
        }
        self.claimed = false;
    }
}

//! Deterministic stand-in for a spectrometer attached over USB.
//!
//! [`FakeTransport`] answers commands the way a device of the chosen [`Revision`] would:
//! configuration queries get a 17 byte reply, spectrum requests get a chunked transfer with a
//! terminator. On revisions that acquire while initializing, Initialize queues a dark transfer
//! too, without consuming readings queued through [`FakeTransport::push_spectrum`]. Every exchange is recorded, so tests can inspect what a driver sent. Clones
//! share the same simulated device.

use super::{Delay, Transport};
use crate::{
    codec::TERMINATOR,
    device::{Protocol, Revision, SampleLayout},
    error::{Error, Result},
    response::PARAMETER_COUNT,
};
use core::time::Duration;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

/// Single `read` call as seen by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    pub endpoint: u8,
    pub max_len: usize,
    pub timeout: Duration,
}

#[derive(Debug)]
struct FakeDevice {
    protocol: Protocol,
    parameters: Vec<String>,
    spectra: VecDeque<Vec<u16>>,
    pending: HashMap<u8, VecDeque<Vec<u8>>>,
    writes: Vec<(u8, Vec<u8>)>,
    reads: Vec<ReadRequest>,
    terminator: u8,
    echo_offset: u8,
    resets: usize,
    configured: bool,
    closed: bool,
}

#[derive(Debug, Clone)]
pub struct FakeTransport {
    device: Arc<Mutex<FakeDevice>>,
}

/// Calibration of a typical USB2000+ covering roughly 340 to 1025 nm
pub fn default_parameters() -> Vec<String> {
    [
        "USB2+F00000",
        "339.2",
        "0.3826",
        "-1.6e-05",
        "-2.1e-10",
        "0",
        "0.92",
        "6.1e-06",
        "-1.4e-09",
        "1.8e-13",
        "-1.3e-17",
        "4.9e-22",
        "-9.2e-27",
        "6.7e-32",
        "7",
        "OBP",
        "UV-VIS",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl FakeTransport {
    pub fn new(revision: Revision) -> Self {
        FakeTransport {
            device: Arc::new(Mutex::new(FakeDevice {
                protocol: revision.protocol(),
                parameters: default_parameters(),
                spectra: VecDeque::new(),
                pending: HashMap::new(),
                writes: Vec::new(),
                reads: Vec::new(),
                terminator: TERMINATOR,
                echo_offset: 0,
                resets: 0,
                configured: false,
                closed: false,
            })),
        }
    }

    fn device(&self) -> MutexGuard<'_, FakeDevice> {
        // A panicking test thread must not hide the recorded exchanges
        self.device.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces configuration parameters, indexed from 0
    pub fn with_parameters(self, parameters: Vec<String>) -> Self {
        self.device().parameters = parameters;
        self
    }

    /// Queues readings returned by subsequent spectrum requests, in order. Once the queue is
    /// exhausted the device reports a flat spectrum of zeros.
    pub fn push_spectrum(&self, samples: Vec<u16>) {
        self.device().spectra.push_back(samples);
    }

    /// Leaves data buffered on an endpoint, as if left over from a previous session
    pub fn push_stale(&self, endpoint: u8, data: Vec<u8>) {
        self.device().pending.entry(endpoint).or_default().push_back(data);
    }

    /// Ends every following spectrum transfer with `byte` instead of the terminator
    pub fn corrupt_terminator(&self, byte: u8) {
        self.device().terminator = byte;
    }

    /// Makes configuration replies echo a different parameter index
    pub fn corrupt_echo(&self) {
        self.device().echo_offset = 1;
    }

    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.device().writes.clone()
    }

    pub fn reads(&self) -> Vec<ReadRequest> {
        self.device().reads.clone()
    }

    pub fn resets(&self) -> usize {
        self.device().resets
    }

    pub fn is_configured(&self) -> bool {
        self.device().configured
    }

    pub fn is_closed(&self) -> bool {
        self.device().closed
    }
}

impl FakeDevice {
    fn queue(&mut self, endpoint: u8, packet: Vec<u8>) {
        self.pending.entry(endpoint).or_default().push_back(packet);
    }

    fn answer_query(&mut self, index: u8) {
        let mut reply = vec![0x05, index.wrapping_add(self.echo_offset)];
        if let Some(value) = self.parameters.get(usize::from(index)) {
            reply.extend_from_slice(value.as_bytes());
        }
        reply.resize(17, 0x00);
        let endpoint = self.protocol.config_endpoint;
        self.queue(endpoint, reply);
    }

    fn answer_spectrum(&mut self) {
        let pixels = self.protocol.pixel_count();
        let samples = self.spectra.pop_front().unwrap_or_else(|| vec![0; pixels]);
        self.queue_transfer(&samples);
    }

    fn queue_transfer(&mut self, samples: &[u16]) {
        let endpoint = self.protocol.spectrum_endpoint;
        let chunk_size = self.protocol.chunk_size;
        match self.protocol.layout {
            SampleLayout::LittleEndian => {
                let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
                for chunk in bytes.chunks(chunk_size) {
                    self.queue(endpoint, chunk.to_vec());
                }
            }
            SampleLayout::SplitPackets => {
                for run in samples.chunks(chunk_size) {
                    self.queue(endpoint, run.iter().map(|s| s.to_le_bytes()[0]).collect());
                    self.queue(endpoint, run.iter().map(|s| s.to_le_bytes()[1]).collect());
                }
            }
        }
        let terminator = self.terminator;
        self.queue(endpoint, vec![terminator]);
    }
}

impl Transport for FakeTransport {
    fn write(&mut self, endpoint: u8, data: &[u8]) -> Result<()> {
        let mut device = self.device();
        if device.closed {
            return Err(Error::Transport("Device is closed".to_string()));
        }
        device.writes.push((endpoint, data.to_vec()));
        if endpoint != device.protocol.out_endpoint {
            return Err(Error::Transport(format!(
                "Endpoint 0x{:02x} does not accept data",
                endpoint
            )));
        }
        match data {
            [0x05, index] if *index < PARAMETER_COUNT => device.answer_query(*index),
            [0x01] if device.protocol.spectrum_on_initialize => {
                let dark = vec![0; device.protocol.pixel_count()];
                device.queue_transfer(&dark);
            }
            [0x09] => device.answer_spectrum(),
            _ => {}
        }
        Ok(())
    }

    fn read(&mut self, endpoint: u8, max_len: usize, timeout: Duration) -> Result<Vec<u8>> {
        let mut device = self.device();
        device.reads.push(ReadRequest {
            endpoint,
            max_len,
            timeout,
        });
        let mut packet = device
            .pending
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
            .ok_or(Error::Timeout)?;
        packet.truncate(max_len);
        Ok(packet)
    }

    fn configure(&mut self) -> Result<()> {
        self.device().configured = true;
        Ok(())
    }

    fn reset(&mut self) {
        self.device().resets += 1;
    }

    fn close(&mut self) {
        self.device().closed = true;
    }
}

/// Records exposure waits instead of sleeping
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingDelay {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|delays| delays.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl Delay for RecordingDelay {
    fn delay(&mut self, duration: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(duration);
    }
}

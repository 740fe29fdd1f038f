use crate::device::IntegrationTime;
use core::time::Duration;

/// Bounds for individual USB reads, unrelated to sensor integration time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Per read while discarding stale data after opening the device
    pub drain: Duration,
    /// Waiting for a configuration parameter reply
    pub query: Duration,
    /// Waiting for the next spectrum chunk, expiry ends the transfer
    pub chunk: Duration,
    /// Waiting for the terminator after a transfer of maximum length
    pub terminator: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            drain: Duration::from_millis(100),
            query: Duration::from_millis(1_000),
            chunk: Duration::from_millis(200),
            terminator: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpectrometerConf {
    /// Applied during initialization, before any spectrum is requested
    pub integration_time: IntegrationTime,
    pub timeouts: Timeouts,
}

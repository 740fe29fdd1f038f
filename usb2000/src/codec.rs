use crate::{
    command::Command,
    config::Timeouts,
    device::{IntegrationTime, Protocol, SampleLayout},
    error::{Error, Result},
    response::{
        parser::{little_endian_samples, parameter_reply, split_packet_samples},
        DeviceConfiguration, PARAMETER_COUNT,
    },
    transport::{Delay, Transport},
};

/// Last byte of every spectrum transfer
pub const TERMINATOR: u8 = 0x69;
/// Length of a configuration parameter reply, including the echoed query
const REPLY_SIZE: usize = 17;
const DRAIN_READ_SIZE: usize = 1 << 16;
// Device that keeps streaming data is left as is after this many reads
const MAX_DRAIN_READS: usize = 256;

/// Converts a spectrum payload, terminator already stripped, into pixels
pub fn decode_samples(protocol: &Protocol, payload: &[u8]) -> Result<Vec<u16>> {
    let parsed = match protocol.layout {
        SampleLayout::LittleEndian => little_endian_samples(payload),
        SampleLayout::SplitPackets => split_packet_samples(payload, protocol.chunk_size),
    };
    parsed.map(|(_, samples)| samples).map_err(|_| {
        Error::Protocol(format!(
            "Spectrum payload of {} bytes does not align to pixels",
            payload.len()
        ))
    })
}

/// Byte level exchanges with the device, shared by every revision
#[derive(Debug, Clone, Copy)]
pub(crate) struct Codec {
    protocol: Protocol,
    timeouts: Timeouts,
}

impl Codec {
    pub fn new(protocol: Protocol, timeouts: Timeouts) -> Self {
        Codec { protocol, timeouts }
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn send<IO: Transport>(&self, io: &mut IO, cmd: Command) -> Result<()> {
        let package = cmd.encode(self.protocol.integration_field)?;
        log::trace!("Sending {:?} as {:02x?}", cmd, package);
        io.write(self.protocol.out_endpoint, &package)
    }

    /// Discards whatever is still buffered on IN endpoints
    pub fn drain<IO: Transport>(&self, io: &mut IO) -> Result<()> {
        for endpoint in self.protocol.in_endpoints() {
            let discarded = self.drain_endpoint(io, endpoint)?;
            if discarded > 0 {
                log::warn!(
                    "Discarded {} stale packets from endpoint 0x{:02x}",
                    discarded,
                    endpoint
                );
            }
        }
        Ok(())
    }

    /// Reads `endpoint` until it times out, returns the amount of discarded packets
    pub fn drain_endpoint<IO: Transport>(&self, io: &mut IO, endpoint: u8) -> Result<usize> {
        let mut reads = 0;
        while reads < MAX_DRAIN_READS {
            match io.read(endpoint, DRAIN_READ_SIZE, self.timeouts.drain) {
                Ok(stale) => {
                    log::debug!(
                        "Discarded {} bytes from endpoint 0x{:02x}",
                        stale.len(),
                        endpoint
                    );
                    reads += 1;
                }
                Err(Error::Timeout) => return Ok(reads),
                Err(err) => return Err(err),
            }
        }
        log::warn!("Endpoint 0x{:02x} did not run dry", endpoint);
        Ok(reads)
    }

    pub fn query_parameter<IO: Transport>(&self, io: &mut IO, index: u8) -> Result<String> {
        let cmd = Command::QueryParameter(index);
        let echo = cmd.encode(self.protocol.integration_field)?;
        self.send(io, cmd)?;
        let reply = io.read(self.protocol.config_endpoint, REPLY_SIZE, self.timeouts.query)?;
        if reply.len() != REPLY_SIZE {
            return Err(Error::Protocol(format!(
                "Reply to parameter {} query is {} bytes long",
                index,
                reply.len()
            )));
        }
        let (_, text) = parameter_reply(&echo, &reply).map_err(|_| {
            Error::Protocol(format!(
                "Reply {:02x?} does not echo parameter {} query",
                &reply[..2],
                index
            ))
        })?;
        let value = core::str::from_utf8(text)
            .map_err(|_| Error::Protocol(format!("Parameter {} is not valid text", index)))?;
        log::debug!("Configuration parameter {}: {:?}", index, value);
        Ok(value.to_string())
    }

    pub fn read_configuration<IO: Transport>(&self, io: &mut IO) -> Result<DeviceConfiguration> {
        let fields = (0..PARAMETER_COUNT)
            .map(|index| self.query_parameter(io, index))
            .collect::<Result<Vec<_>>>()?;
        DeviceConfiguration::from_fields(&fields)
    }

    /// Requests a spectrum, waits out the exposure and collects the chunked transfer.
    ///
    /// A chunk read timing out before `max_chunks` is the regular end of a short transfer.
    /// Otherwise the terminator arrives in a separate read. The transfer is only accepted if
    /// its very last byte is [`TERMINATOR`].
    pub fn read_spectrum<IO: Transport, D: Delay>(
        &self,
        io: &mut IO,
        delay: &mut D,
        integration_time: IntegrationTime,
    ) -> Result<Vec<u16>> {
        let endpoint = self.protocol.spectrum_endpoint;
        self.send(io, Command::RequestSpectrum)?;
        delay.delay(integration_time.as_duration());

        let mut packets = Vec::with_capacity(self.protocol.max_chunks + 1);
        let mut ended_early = false;
        for _ in 0..self.protocol.max_chunks {
            match io.read(endpoint, self.protocol.chunk_size, self.timeouts.chunk) {
                Ok(packet) => packets.push(packet),
                Err(Error::Timeout) => {
                    log::debug!("Spectrum transfer ended after {} packets", packets.len());
                    ended_early = true;
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        if !ended_early {
            packets.push(io.read(endpoint, 1, self.timeouts.terminator)?);
        }

        let mut payload = packets.concat();
        match payload.pop() {
            Some(TERMINATOR) => {}
            Some(last) => {
                return Err(Error::Protocol(format!(
                    "Spectrum transfer ended with 0x{:02x} instead of terminator",
                    last
                )))
            }
            None => return Err(Error::Protocol("Spectrum transfer was empty".to_string())),
        }
        decode_samples(&self.protocol, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::Revision,
        transport::{fake::RecordingDelay, MockTransport},
    };
    use claims::*;
    use core::time::Duration;
    use mockall::{predicate::*, Sequence};
    use pretty_assertions::assert_eq;

    fn plus_codec() -> Codec {
        Codec::new(Revision::Usb2000Plus.protocol(), Timeouts::default())
    }

    fn expect_request(io: &mut MockTransport, seq: &mut Sequence, out_endpoint: u8) {
        io.expect_write()
            .withf(move |ep: &u8, data: &[u8]| *ep == out_endpoint && data == [0x09u8])
            .times(1)
            .in_sequence(seq)
            .returning(|_, _| Ok(()));
    }

    fn expect_chunks(io: &mut MockTransport, seq: &mut Sequence, times: usize, chunk: Vec<u8>) {
        io.expect_read()
            .with(eq(0x82), eq(chunk.len()), always())
            .times(times)
            .in_sequence(seq)
            .returning(move |_, _, _| Ok(chunk.clone()));
    }

    fn expect_terminator(io: &mut MockTransport, seq: &mut Sequence, byte: u8) {
        io.expect_read()
            .with(eq(0x82), eq(1), always())
            .times(1)
            .in_sequence(seq)
            .returning(move |_, _, _| Ok(vec![byte]));
    }

    #[test]
    fn full_transfer_with_terminator() {
        let mut io = MockTransport::new();
        let mut seq = Sequence::new();
        expect_request(&mut io, &mut seq, 0x01);
        // 256 pixels of 0x0102 per chunk
        expect_chunks(&mut io, &mut seq, 8, [0x02, 0x01].repeat(256));
        expect_terminator(&mut io, &mut seq, TERMINATOR);

        let mut delay = RecordingDelay::default();
        let samples = plus_codec()
            .read_spectrum(&mut io, &mut delay, IntegrationTime::default())
            .unwrap();
        assert_eq!(samples.len(), 2048);
        assert!(samples.iter().all(|s| *s == 0x0102));
        assert_eq!(delay.delays(), vec![Duration::from_millis(100)]);
    }

    #[test]
    fn wrong_terminator_is_rejected() {
        let mut io = MockTransport::new();
        let mut seq = Sequence::new();
        expect_request(&mut io, &mut seq, 0x01);
        expect_chunks(&mut io, &mut seq, 8, vec![0x00; 512]);
        expect_terminator(&mut io, &mut seq, 0x68);

        let res = plus_codec().read_spectrum(
            &mut io,
            &mut RecordingDelay::default(),
            IntegrationTime::default(),
        );
        assert_matches!(res, Err(Error::Protocol(_)));
    }

    #[test]
    fn timeout_ends_short_transfer() {
        let mut io = MockTransport::new();
        let mut seq = Sequence::new();
        expect_request(&mut io, &mut seq, 0x01);
        expect_chunks(&mut io, &mut seq, 4, vec![0x11; 512]);
        io.expect_read()
            .with(eq(0x82), eq(512), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(vec![TERMINATOR]));
        io.expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(Error::Timeout));

        let samples = plus_codec()
            .read_spectrum(
                &mut io,
                &mut RecordingDelay::default(),
                IntegrationTime::default(),
            )
            .unwrap();
        assert_eq!(samples, vec![0x1111; 1024]);
    }

    #[test]
    fn empty_transfer_is_rejected() {
        let mut io = MockTransport::new();
        let mut seq = Sequence::new();
        expect_request(&mut io, &mut seq, 0x01);
        io.expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(Error::Timeout));

        let res = plus_codec().read_spectrum(
            &mut io,
            &mut RecordingDelay::default(),
            IntegrationTime::default(),
        );
        assert_matches!(res, Err(Error::Protocol(_)));
    }

    #[test]
    fn missing_terminator_after_full_transfer_times_out() {
        let mut io = MockTransport::new();
        let mut seq = Sequence::new();
        expect_request(&mut io, &mut seq, 0x01);
        expect_chunks(&mut io, &mut seq, 8, vec![0x00; 512]);
        io.expect_read()
            .with(eq(0x82), eq(1), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(Error::Timeout));

        let res = plus_codec().read_spectrum(
            &mut io,
            &mut RecordingDelay::default(),
            IntegrationTime::default(),
        );
        assert_matches!(res, Err(Error::Timeout));
    }

    #[test]
    fn split_packets_of_older_revision() {
        let codec = Codec::new(Revision::Usb2000.protocol(), Timeouts::default());
        let mut io = MockTransport::new();
        let mut seq = Sequence::new();
        expect_request(&mut io, &mut seq, 0x02);
        let mut chunk = 0;
        io.expect_read()
            .with(eq(0x82), eq(64), always())
            .times(64)
            .in_sequence(&mut seq)
            .returning(move |_, _, _| {
                // Low bytes in even packets, high bytes in odd ones
                let byte = if chunk % 2 == 0 { 0x34 } else { 0x12 };
                chunk += 1;
                Ok(vec![byte; 64])
            });
        expect_terminator(&mut io, &mut seq, TERMINATOR);

        let samples = codec
            .read_spectrum(
                &mut io,
                &mut RecordingDelay::default(),
                IntegrationTime::default(),
            )
            .unwrap();
        assert_eq!(samples, vec![0x1234; 2048]);
    }

    #[test]
    fn query_parameter_reply() {
        let mut io = MockTransport::new();
        let mut seq = Sequence::new();
        io.expect_write()
            .withf(|ep: &u8, data: &[u8]| *ep == 0x01 && data == [0x05u8, 0x01])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        io.expect_read()
            .with(eq(0x81), eq(17), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| {
                let mut reply = vec![0x05, 0x01];
                reply.extend_from_slice(b"339.2");
                reply.resize(17, 0x00);
                Ok(reply)
            });

        assert_ok_eq!(plus_codec().query_parameter(&mut io, 1), "339.2".to_string());
    }

    #[test]
    fn query_parameter_echo_mismatch() {
        let mut io = MockTransport::new();
        io.expect_write().returning(|_, _| Ok(()));
        io.expect_read().returning(|_, _, _| {
            let mut reply = vec![0x05, 0x02];
            reply.resize(17, 0x00);
            Ok(reply)
        });

        assert_matches!(
            plus_codec().query_parameter(&mut io, 1),
            Err(Error::Protocol(_))
        );
    }

    #[test]
    fn query_parameter_timeout_is_an_error() {
        let mut io = MockTransport::new();
        io.expect_write().returning(|_, _| Ok(()));
        io.expect_read().returning(|_, _, _| Err(Error::Timeout));

        assert_matches!(plus_codec().query_parameter(&mut io, 0), Err(Error::Timeout));
    }

    #[test]
    fn drain_reads_until_timeout() {
        let mut io = MockTransport::new();
        let mut seq = Sequence::new();
        io.expect_read()
            .with(eq(0x81), always(), eq(Duration::from_millis(100)))
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(vec![0xFF; 17]));
        io.expect_read()
            .with(eq(0x81), always(), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(Error::Timeout));
        io.expect_read()
            .with(eq(0x82), always(), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(Error::Timeout));

        assert_ok!(plus_codec().drain(&mut io));
    }

    #[test]
    fn drain_gives_up_on_endless_stream() {
        let mut io = MockTransport::new();
        io.expect_read()
            .with(eq(0x82), always(), always())
            .times(MAX_DRAIN_READS)
            .returning(|_, _, _| Ok(vec![0x00; 64]));

        assert_ok_eq!(plus_codec().drain_endpoint(&mut io, 0x82), MAX_DRAIN_READS);
    }

    #[test]
    fn drain_propagates_transport_failures() {
        let mut io = MockTransport::new();
        io.expect_read()
            .returning(|_, _, _| Err(Error::Transport("pipe".to_string())));

        assert_matches!(plus_codec().drain(&mut io), Err(Error::Transport(_)));
    }
}

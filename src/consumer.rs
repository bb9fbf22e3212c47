//! Consumer-side state machine: validate, classify, acknowledge, forward.
//!
//! The consumer owns the only piece of cross-packet state in the whole
//! protocol: a [`SequenceCursor`] tracking the next expected sequence number.
//! Everything else is per-datagram:
//!
//! 1. decode — an undersized or oversized datagram is dropped with **no**
//!    response, since any sequence number read out of it would be garbage;
//! 2. validate — a wrong tag or checksum failure earns a NAK echoing the
//!    decoded sequence, telling the producer to resend;
//! 3. classify — a sequence strictly before the cursor is a duplicate of a
//!    packet already consumed: it is ACKed again (the producer must see
//!    success to stop retrying) but not forwarded to the sink a second time;
//! 4. accept — anything else is new: the cursor advances, the sample goes to
//!    the sink, and an ACK is sent.
//!
//! Exactly one response leaves per correctly-sized inbound datagram.  The
//! cursor only ever classifies; it never causes a packet to be rejected.

use crate::packet::{DataPacket, PacketError, ResponsePacket, TelemetrySample};
use crate::transport::Transport;

/// Returns `true` when `a` is strictly before `b` in 16-bit wrap-around
/// sequence space.
///
/// The comparison is correct as long as the two values are less than
/// `u16::MAX / 2` apart, which holds for any realistic delivery lag.
#[inline]
fn seq_before(a: u16, b: u16) -> bool {
    a != b && b.wrapping_sub(a) < u16::MAX / 2
}

// ---------------------------------------------------------------------------
// SequenceCursor
// ---------------------------------------------------------------------------

/// How an inbound sequence number relates to what was already consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceClass {
    /// Not seen before; the sample should reach the sink.
    New,
    /// Re-delivery of an already-consumed packet.
    Duplicate,
}

/// The consumer's single piece of persistent state: the next sequence number
/// it expects from the producer.
#[derive(Debug, Default)]
pub struct SequenceCursor {
    /// Advances to `sequence + 1` (mod 65536) each time a packet is accepted
    /// as new.  Starts at 0.
    pub next_expected: u16,
}

impl SequenceCursor {
    /// Classify `sequence` without mutating the cursor.
    pub fn classify(&self, sequence: u16) -> SequenceClass {
        if seq_before(sequence, self.next_expected) {
            SequenceClass::Duplicate
        } else {
            SequenceClass::New
        }
    }

    /// Record that the packet carrying `sequence` was accepted as new.
    pub fn advance(&mut self, sequence: u16) {
        self.next_expected = sequence.wrapping_add(1);
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Destination for validated, deduplicated telemetry samples.
pub trait TelemetrySink {
    fn accept(&mut self, sample: &TelemetrySample);
}

/// Sink that reports each sample on the log, one line per reading.
#[derive(Debug, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn accept(&mut self, sample: &TelemetrySample) {
        log::info!(
            "telemetry t={}ms temp={:.2}°C pressure={:.3}atm voltage={:.2}V",
            sample.timestamp_ms,
            sample.temperature,
            sample.pressure,
            sample.voltage
        );
    }
}

impl TelemetrySink for Vec<TelemetrySample> {
    fn accept(&mut self, sample: &TelemetrySample) {
        self.push(sample.clone());
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

/// Outcome of handling one inbound datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    /// The packet was well-formed; `class` says whether the sample was
    /// forwarded ([`SequenceClass::New`]) or merely re-acknowledged.
    Accepted {
        sample: TelemetrySample,
        class: SequenceClass,
    },
    /// The datagram was rejected; the reason says whether a NAK was sent
    /// (size mismatches draw no response at all).
    Rejected(PacketError),
}

/// Receive-side endpoint: one transport, one sink, one cursor.
#[derive(Debug)]
pub struct Consumer<T, S> {
    transport: T,
    sink: S,
    pub cursor: SequenceCursor,
}

impl<T: Transport, S: TelemetrySink> Consumer<T, S> {
    pub fn new(transport: T, sink: S) -> Self {
        Self {
            transport,
            sink,
            cursor: SequenceCursor::default(),
        }
    }

    /// Serve inbound datagrams until the process is stopped.
    ///
    /// The consumer has no deadline of its own — it blocks indefinitely for
    /// the next sample.  Receive errors are logged and the loop continues.
    pub async fn run(&mut self) {
        loop {
            match self.transport.recv(None).await {
                Ok(datagram) => {
                    self.handle_inbound(&datagram).await;
                }
                Err(e) => log::warn!("[consumer] receive failed: {e}"),
            }
        }
    }

    /// Process one inbound datagram and send the corresponding response.
    ///
    /// Side effects: exactly one ACK or NAK per correctly-sized datagram,
    /// none for size-mismatched input; the sink sees each new sample once.
    pub async fn handle_inbound(&mut self, datagram: &[u8]) -> ConsumeOutcome {
        let packet = match DataPacket::decode(datagram) {
            Ok(packet) => packet,
            Err(e) => {
                // No trustworthy sequence number to echo — drop silently.
                log::debug!("[consumer] dropping datagram: {e}");
                return ConsumeOutcome::Rejected(e);
            }
        };

        if let Err(reason) = packet.validate() {
            log::debug!("[consumer] rejecting seq={}: {reason}", packet.sequence);
            self.respond(ResponsePacket::nak(packet.sequence)).await;
            return ConsumeOutcome::Rejected(reason);
        }

        let class = self.cursor.classify(packet.sequence);
        match class {
            SequenceClass::Duplicate => {
                log::debug!(
                    "[consumer] ← DATA seq={} duplicate (expecting {}); re-ACKing",
                    packet.sequence,
                    self.cursor.next_expected
                );
            }
            SequenceClass::New => {
                self.cursor.advance(packet.sequence);
                self.sink.accept(&packet.sample);
                log::debug!(
                    "[consumer] ← DATA seq={} accepted; → ACK",
                    packet.sequence
                );
            }
        }
        self.respond(ResponsePacket::ack(packet.sequence)).await;

        ConsumeOutcome::Accepted {
            sample: packet.sample,
            class,
        }
    }

    /// Send one response; a failed send is the producer's problem to retry.
    async fn respond(&self, response: ResponsePacket) {
        if let Err(e) = self.transport.send(&response.encode()).await {
            log::warn!(
                "[consumer] failed to send response for seq={}: {e}",
                response.ack_sequence
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{tag, DATA_PACKET_LEN};
    use crate::transport::TransportError;

    use std::sync::Mutex;
    use std::time::Duration;

    fn sample(timestamp_ms: u32) -> TelemetrySample {
        TelemetrySample {
            timestamp_ms,
            temperature: 23.4,
            pressure: 1.02,
            voltage: 3.27,
        }
    }

    /// Transport double that records outbound responses; inbound datagrams
    /// are injected directly into `handle_inbound`, so `recv` is never used.
    #[derive(Default)]
    struct RecordingTransport {
        responses: Mutex<Vec<Vec<u8>>>,
    }

    impl RecordingTransport {
        fn decoded(&self) -> Vec<ResponsePacket> {
            self.responses
                .lock()
                .unwrap()
                .iter()
                .map(|bytes| ResponsePacket::decode(bytes).unwrap())
                .collect()
        }
    }

    impl Transport for RecordingTransport {
        async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
            self.responses.lock().unwrap().push(payload.to_vec());
            Ok(())
        }

        async fn recv(&self, _wait: Option<Duration>) -> Result<Vec<u8>, TransportError> {
            Err(TransportError::TimeoutExpired)
        }
    }

    fn consumer() -> Consumer<RecordingTransport, Vec<TelemetrySample>> {
        Consumer::new(RecordingTransport::default(), Vec::new())
    }

    #[test]
    fn cursor_wraps_at_sequence_space_boundary() {
        let mut cursor = SequenceCursor {
            next_expected: 65_535,
        };
        assert_eq!(cursor.classify(65_535), SequenceClass::New);
        cursor.advance(65_535);
        assert_eq!(cursor.next_expected, 0);
        assert_eq!(cursor.classify(0), SequenceClass::New);
        assert_eq!(cursor.classify(65_535), SequenceClass::Duplicate);
    }

    #[test]
    fn cursor_tolerates_gaps() {
        // A sequence past the cursor is new — the producer may have given up
        // on an earlier packet and moved on.
        let cursor = SequenceCursor { next_expected: 6 };
        assert_eq!(cursor.classify(6), SequenceClass::New);
        assert_eq!(cursor.classify(9), SequenceClass::New);
        assert_eq!(cursor.classify(5), SequenceClass::Duplicate);
    }

    #[tokio::test]
    async fn new_packet_is_forwarded_and_acked() {
        let mut c = consumer();
        let outcome = c
            .handle_inbound(&DataPacket::new(0, sample(10)).encode())
            .await;
        assert_eq!(
            outcome,
            ConsumeOutcome::Accepted {
                sample: sample(10),
                class: SequenceClass::New
            }
        );
        assert_eq!(c.cursor.next_expected, 1);
        assert_eq!(c.sink, vec![sample(10)]);

        let responses = c.transport.decoded();
        assert_eq!(responses, vec![ResponsePacket::ack(0)]);
    }

    #[tokio::test]
    async fn duplicate_is_reacked_but_not_reforwarded() {
        let mut c = consumer();
        let bytes = DataPacket::new(5, sample(20)).encode();

        // First arrival: new (5 ≥ 0), cursor moves to 6.
        c.handle_inbound(&bytes).await;
        assert_eq!(c.cursor.next_expected, 6);

        // Replay of the same datagram: duplicate, still ACKed.
        let outcome = c.handle_inbound(&bytes).await;
        assert_eq!(
            outcome,
            ConsumeOutcome::Accepted {
                sample: sample(20),
                class: SequenceClass::Duplicate
            }
        );
        assert_eq!(c.cursor.next_expected, 6, "cursor must not move on a duplicate");
        assert_eq!(c.sink.len(), 1, "duplicate must not reach the sink twice");

        let responses = c.transport.decoded();
        assert_eq!(responses, vec![ResponsePacket::ack(5), ResponsePacket::ack(5)]);
    }

    #[tokio::test]
    async fn checksum_tamper_draws_a_nak() {
        let mut c = consumer();
        let mut bytes = DataPacket::new(7, sample(30)).encode();
        bytes[8] ^= 0x01; // flip one bit inside reading_a

        let outcome = c.handle_inbound(&bytes).await;
        assert!(matches!(
            outcome,
            ConsumeOutcome::Rejected(PacketError::ChecksumMismatch { .. })
        ));
        assert!(c.sink.is_empty());
        assert_eq!(c.transport.decoded(), vec![ResponsePacket::nak(7)]);
    }

    #[tokio::test]
    async fn wrong_tag_draws_a_nak() {
        let mut c = consumer();
        let mut packet = DataPacket::new(3, sample(40));
        packet.kind = tag::NAK;
        let outcome = c.handle_inbound(&packet.encode()).await;
        assert_eq!(
            outcome,
            ConsumeOutcome::Rejected(PacketError::WrongType(tag::NAK))
        );
        assert_eq!(c.transport.decoded(), vec![ResponsePacket::nak(3)]);
    }

    #[tokio::test]
    async fn size_mismatch_is_dropped_without_any_response() {
        let mut c = consumer();
        let outcome = c.handle_inbound(&[0u8; DATA_PACKET_LEN - 1]).await;
        assert!(matches!(
            outcome,
            ConsumeOutcome::Rejected(PacketError::SizeMismatch { .. })
        ));
        assert!(c.transport.responses.lock().unwrap().is_empty());
        assert!(c.sink.is_empty());
    }

    #[tokio::test]
    async fn nak_rejected_packet_does_not_advance_cursor() {
        let mut c = consumer();
        let mut bytes = DataPacket::new(0, sample(50)).encode();
        bytes[20] ^= 0xFF; // corrupt the stored checksum

        c.handle_inbound(&bytes).await;
        assert_eq!(c.cursor.next_expected, 0);

        // The producer resends the intact packet; it must still be new.
        let clean = DataPacket::new(0, sample(50)).encode();
        let outcome = c.handle_inbound(&clean).await;
        assert!(matches!(
            outcome,
            ConsumeOutcome::Accepted {
                class: SequenceClass::New,
                ..
            }
        ));
        assert_eq!(c.sink.len(), 1);
    }
}

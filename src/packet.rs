//! Wire-format definitions for telemetry datagrams.
//!
//! Every datagram exchanged between peers is either a [`DataPacket`] (one
//! telemetry sample in transit) or a [`ResponsePacket`] (ACK or NAK).  This
//! module is responsible for:
//! - Defining the on-wire binary layout of both packet shapes.
//! - Serialising packets into byte buffers ready for transmission.
//! - Deserialising raw byte slices back into packets, rejecting input of the
//!   wrong size.
//! - Computing and verifying the CRC-32 integrity checksum.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**; floats are 32-bit IEEE-754.
//! Both records are fixed-size, so there is no length-prefix framing: any
//! datagram of the wrong size is rejected before a single field is parsed.
//!
//! ```text
//! DataPacket (23 bytes)
//! +------+----------+-----------+-----------+-----------+-----------+----------+
//! | kind | sequence | timestamp | reading_a | reading_b | reading_c | checksum |
//! | u8   | u16      | u32       | f32       | f32       | f32       | u32      |
//! +------+----------+-----------+-----------+-----------+-----------+----------+
//!
//! ResponsePacket (7 bytes)
//! +------+--------------+----------+
//! | kind | ack_sequence | checksum |
//! | u8   | u16          | u32      |
//! +------+--------------+----------+
//! ```
//!
//! The checksum is CRC-32 (the conventional zlib/PNG variant) over every byte
//! of the packet preceding the checksum field, and is always written last.
//!
//! Decoding and validity are deliberately separate steps: [`DataPacket::decode`]
//! only gates on size, so a garbled-but-correctly-sized datagram can still be
//! decoded for diagnostics.  [`DataPacket::validate`] is the predicate that
//! judges the tag and checksum.

use thiserror::Error;

/// Tag values identifying the packet shape on the wire.
pub mod tag {
    /// A telemetry data packet.
    pub const DATA: u8 = 0x01;
    /// Positive acknowledgment.
    pub const ACK: u8 = 0x02;
    /// Negative acknowledgment — explicit request to resend.
    pub const NAK: u8 = 0x03;
}

/// Total encoded size of a [`DataPacket`] on the wire.
pub const DATA_PACKET_LEN: usize = 23;

/// Total encoded size of a [`ResponsePacket`] on the wire.
pub const RESPONSE_PACKET_LEN: usize = 7;

// Byte offsets of each field within a serialised DataPacket.
const OFF_KIND: usize = 0;
const OFF_SEQUENCE: usize = 1;
const OFF_TIMESTAMP: usize = 3;
const OFF_READING_A: usize = 7;
const OFF_READING_B: usize = 11;
const OFF_READING_C: usize = 15;
const OFF_DATA_CRC: usize = 19;

// Byte offsets within a serialised ResponsePacket.
const OFF_ACK_SEQUENCE: usize = 1;
const OFF_RESPONSE_CRC: usize = 3;

/// Compute the CRC-32 checksum (zlib polynomial, reflected) over `data`.
///
/// Pure and deterministic: identical input always yields identical output.
/// The caller passes exactly the bytes preceding the checksum field.
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can arise when decoding or validating a datagram.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// Datagram length differs from the fixed record size.
    #[error("datagram is {actual} bytes, expected exactly {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    /// The tag byte does not name the expected packet shape.
    #[error("unexpected packet tag 0x{0:02x}")]
    WrongType(u8),
    /// The stored checksum disagrees with the recomputed one.
    #[error("checksum mismatch: stored 0x{stored:08x}, computed 0x{computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
}

// ---------------------------------------------------------------------------
// TelemetrySample
// ---------------------------------------------------------------------------

/// One telemetry sample: a monotonic timestamp plus three sensor readings.
///
/// The readings are semantically temperature (°C), pressure (atm) and voltage
/// (V), but the protocol treats them as opaque 32-bit floats.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    /// Milliseconds since an arbitrary monotonic epoch (process start).
    pub timestamp_ms: u32,
    pub temperature: f32,
    pub pressure: f32,
    pub voltage: f32,
}

// ---------------------------------------------------------------------------
// DataPacket
// ---------------------------------------------------------------------------

/// One telemetry sample in transit, as carried on the wire.
///
/// Constructed fresh by the producer for each delivery via [`DataPacket::new`]
/// (which computes the checksum), or recovered from a datagram via
/// [`DataPacket::decode`].  Immutable once the checksum is computed.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPacket {
    /// Tag byte; [`tag::DATA`] on every packet built locally.  Kept raw so a
    /// decoded packet with a bad tag can still be inspected.
    pub kind: u8,
    /// Producer-assigned sequence number; wraps at 65536.
    pub sequence: u16,
    /// The sample being delivered.
    pub sample: TelemetrySample,
    /// CRC-32 over the 19 bytes preceding this field.
    pub checksum: u32,
}

impl DataPacket {
    /// Build a data packet for `sample`, computing the checksum.
    pub fn new(sequence: u16, sample: TelemetrySample) -> Self {
        let mut packet = Self {
            kind: tag::DATA,
            sequence,
            sample,
            checksum: 0,
        };
        packet.checksum = checksum(&packet.body_bytes());
        packet
    }

    /// The serialised bytes preceding the checksum field.
    fn body_bytes(&self) -> [u8; OFF_DATA_CRC] {
        let mut buf = [0u8; OFF_DATA_CRC];
        buf[OFF_KIND] = self.kind;
        buf[OFF_SEQUENCE..OFF_TIMESTAMP].copy_from_slice(&self.sequence.to_be_bytes());
        buf[OFF_TIMESTAMP..OFF_READING_A]
            .copy_from_slice(&self.sample.timestamp_ms.to_be_bytes());
        buf[OFF_READING_A..OFF_READING_B]
            .copy_from_slice(&self.sample.temperature.to_be_bytes());
        buf[OFF_READING_B..OFF_READING_C].copy_from_slice(&self.sample.pressure.to_be_bytes());
        buf[OFF_READING_C..OFF_DATA_CRC].copy_from_slice(&self.sample.voltage.to_be_bytes());
        buf
    }

    /// Serialise this packet into a newly allocated byte vector.
    ///
    /// The checksum is recomputed from the serialised body and appended last;
    /// any value already stored in the `checksum` field is ignored.  Output
    /// length is always [`DATA_PACKET_LEN`].
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(DATA_PACKET_LEN);
        buf.extend_from_slice(&self.body_bytes());
        let csum = checksum(&buf);
        buf.extend_from_slice(&csum.to_be_bytes());
        buf
    }

    /// Parse a [`DataPacket`] from a raw datagram.
    ///
    /// The only gate here is size: anything other than exactly
    /// [`DATA_PACKET_LEN`] bytes fails with [`PacketError::SizeMismatch`]
    /// without inspecting the contents.  Tag and checksum are *not* judged —
    /// call [`validate`](Self::validate) for that.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() != DATA_PACKET_LEN {
            return Err(PacketError::SizeMismatch {
                expected: DATA_PACKET_LEN,
                actual: buf.len(),
            });
        }

        // Length is checked above; the slice conversions cannot fail.
        let word = |at: usize| -> [u8; 4] { buf[at..at + 4].try_into().unwrap_or([0u8; 4]) };

        Ok(Self {
            kind: buf[OFF_KIND],
            sequence: u16::from_be_bytes([buf[OFF_SEQUENCE], buf[OFF_SEQUENCE + 1]]),
            sample: TelemetrySample {
                timestamp_ms: u32::from_be_bytes(word(OFF_TIMESTAMP)),
                temperature: f32::from_be_bytes(word(OFF_READING_A)),
                pressure: f32::from_be_bytes(word(OFF_READING_B)),
                voltage: f32::from_be_bytes(word(OFF_READING_C)),
            },
            checksum: u32::from_be_bytes(word(OFF_DATA_CRC)),
        })
    }

    /// Judge whether this packet is a well-formed telemetry packet: the tag
    /// must be [`tag::DATA`] and the recomputed checksum must equal the
    /// stored one.
    pub fn validate(&self) -> Result<(), PacketError> {
        if self.kind != tag::DATA {
            return Err(PacketError::WrongType(self.kind));
        }
        let computed = checksum(&self.body_bytes());
        if computed != self.checksum {
            return Err(PacketError::ChecksumMismatch {
                stored: self.checksum,
                computed,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ResponsePacket
// ---------------------------------------------------------------------------

/// Acknowledgment (positive or negative) answering one [`DataPacket`].
///
/// Correlated to the data packet solely by the echoed sequence number.  Sent
/// exactly once per inbound data packet; never retried — the retry burden
/// lives entirely on the producer side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePacket {
    /// Tag byte; [`tag::ACK`] or [`tag::NAK`] on locally built responses.
    pub kind: u8,
    /// Sequence number of the data packet being answered.
    pub ack_sequence: u16,
    /// CRC-32 over the 3 bytes preceding this field.
    pub checksum: u32,
}

impl ResponsePacket {
    /// Build a positive acknowledgment for `ack_sequence`.
    pub fn ack(ack_sequence: u16) -> Self {
        Self::with_kind(tag::ACK, ack_sequence)
    }

    /// Build a negative acknowledgment for `ack_sequence`.
    pub fn nak(ack_sequence: u16) -> Self {
        Self::with_kind(tag::NAK, ack_sequence)
    }

    fn with_kind(kind: u8, ack_sequence: u16) -> Self {
        let mut response = Self {
            kind,
            ack_sequence,
            checksum: 0,
        };
        response.checksum = checksum(&response.body_bytes());
        response
    }

    fn body_bytes(&self) -> [u8; OFF_RESPONSE_CRC] {
        let mut buf = [0u8; OFF_RESPONSE_CRC];
        buf[OFF_KIND] = self.kind;
        buf[OFF_ACK_SEQUENCE..OFF_RESPONSE_CRC]
            .copy_from_slice(&self.ack_sequence.to_be_bytes());
        buf
    }

    /// Serialise into a [`RESPONSE_PACKET_LEN`]-byte vector, checksum last.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RESPONSE_PACKET_LEN);
        buf.extend_from_slice(&self.body_bytes());
        let csum = checksum(&buf);
        buf.extend_from_slice(&csum.to_be_bytes());
        buf
    }

    /// Parse a [`ResponsePacket`] from a raw datagram.  Size is the only gate.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() != RESPONSE_PACKET_LEN {
            return Err(PacketError::SizeMismatch {
                expected: RESPONSE_PACKET_LEN,
                actual: buf.len(),
            });
        }
        Ok(Self {
            kind: buf[OFF_KIND],
            ack_sequence: u16::from_be_bytes([buf[OFF_ACK_SEQUENCE], buf[OFF_ACK_SEQUENCE + 1]]),
            checksum: u32::from_be_bytes(
                buf[OFF_RESPONSE_CRC..RESPONSE_PACKET_LEN]
                    .try_into()
                    .unwrap_or([0u8; 4]),
            ),
        })
    }

    /// Judge whether this is a well-formed response: the tag must be ACK or
    /// NAK and the recomputed checksum must equal the stored one.
    pub fn validate(&self) -> Result<(), PacketError> {
        if self.kind != tag::ACK && self.kind != tag::NAK {
            return Err(PacketError::WrongType(self.kind));
        }
        let computed = checksum(&self.body_bytes());
        if computed != self.checksum {
            return Err(PacketError::ChecksumMismatch {
                stored: self.checksum,
                computed,
            });
        }
        Ok(())
    }

    /// `true` when this response is a positive acknowledgment.
    pub fn is_ack(&self) -> bool {
        self.kind == tag::ACK
    }
}

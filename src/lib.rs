//! `telemetry-over-udp` — reliable stop-and-wait delivery of periodic
//! telemetry samples over an unreliable, unordered datagram transport.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐   DATA (23 B)   ┌──────────┐
//!  │ Producer │────────────────▶│ Consumer │──▶ sink
//!  └────┬─────┘                 └─────┬────┘
//!       │        ACK / NAK (7 B)      │
//!       │◀────────────────────────────┘
//!       │
//!  ┌────▼──────┐
//!  │ Transport │  (thin async wrapper around tokio UdpSocket)
//!  └───────────┘
//! ```
//!
//! The producer sends one packet at a time and blocks for its acknowledgment:
//! at most one unacknowledged packet exists in the system at any instant.
//! Retries are bounded (3 transmissions per packet, 1 s apart); exhaustion is
//! reported to the caller, never escalated.  The consumer validates every
//! datagram with a CRC-32 checksum, deduplicates by sequence number, and
//! answers each well-sized datagram with exactly one ACK or NAK.
//!
//! Each module has a single responsibility:
//! - [`packet`]    — wire format (serialise / deserialise / checksum)
//! - [`transport`] — datagram I/O behind a trait, plus the real UDP transport
//! - [`producer`]  — send → await-ack → retry state machine
//! - [`consumer`]  — validation, duplicate detection, acknowledgment, sink
//! - [`sampler`]   — periodic sensor-sample generation
//! - [`config`]    — fixed link parameters (ports, timeout, retry ceiling)

pub mod config;
pub mod consumer;
pub mod packet;
pub mod producer;
pub mod sampler;
pub mod transport;

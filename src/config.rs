//! Fixed link parameters.
//!
//! Nothing here is negotiated at runtime: both endpoints are built for one
//! loopback (or otherwise configured) peer, one response timeout, one retry
//! ceiling, and one sampling period.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default port the producer binds to.
pub const PRODUCER_PORT: u16 = 8080;

/// Default port the consumer binds to.
pub const CONSUMER_PORT: u16 = 8081;

/// How long the producer waits for an ACK/NAK before counting a failed attempt.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Maximum transmissions of one packet (total, including the first send).
/// A hard ceiling — never adaptive.
pub const MAX_ATTEMPTS: u32 = 3;

/// Interval between successive telemetry samples.
pub const SAMPLE_PERIOD: Duration = Duration::from_secs(2);

/// Adjustable parameters for one endpoint of the link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Local address to bind.
    pub bind_addr: SocketAddr,
    /// Remote peer address.
    pub peer_addr: SocketAddr,
    /// Producer-side wait for a response to each transmission.
    pub response_timeout: Duration,
    /// Producer-side transmission ceiling per packet.
    pub max_attempts: u32,
    /// Producer-side delay between samples.
    pub sample_period: Duration,
}

impl LinkConfig {
    /// Defaults for the producer role: bind 8080, peer 8081 on loopback.
    pub fn producer() -> Self {
        Self {
            bind_addr: loopback(PRODUCER_PORT),
            peer_addr: loopback(CONSUMER_PORT),
            response_timeout: RESPONSE_TIMEOUT,
            max_attempts: MAX_ATTEMPTS,
            sample_period: SAMPLE_PERIOD,
        }
    }

    /// Defaults for the consumer role: bind 8081, peer 8080 on loopback.
    pub fn consumer() -> Self {
        Self {
            bind_addr: loopback(CONSUMER_PORT),
            peer_addr: loopback(PRODUCER_PORT),
            ..Self::producer()
        }
    }
}

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

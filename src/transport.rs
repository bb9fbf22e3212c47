//! Datagram transport abstraction.
//!
//! The producer and consumer state machines never touch a socket directly;
//! they talk to a [`Transport`], which owns only byte I/O:
//! - `send` hands one datagram to the single fixed peer.
//! - `recv` blocks for the next datagram, optionally bounded by a deadline.
//!
//! [`UdpTransport`] is the real implementation — a thin wrapper around a
//! connected `tokio::net::UdpSocket`.  Tests substitute scripted in-memory
//! transports to drive the state machines deterministically.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::UdpSocket;

/// Maximum UDP payload size (theoretical limit; our records are far smaller).
const MAX_DATAGRAM: usize = 65_535;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can arise from transport operations.
///
/// Neither variant is fatal to a protocol loop: the producer counts a failed
/// attempt and the consumer logs and keeps serving.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying I/O error from the OS.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// No datagram arrived within the requested window.
    #[error("timed out waiting for a datagram")]
    TimeoutExpired,
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// One endpoint's view of the unreliable datagram link.
///
/// All methods are `&self`; implementations needing mutable state (scripted
/// test doubles, mainly) use interior mutability.
pub trait Transport {
    /// Send one datagram to the peer.
    fn send(
        &self,
        payload: &[u8],
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Receive the next datagram from the peer.
    ///
    /// With `wait = Some(d)` the call fails with
    /// [`TransportError::TimeoutExpired`] if nothing arrives within `d`.
    /// With `wait = None` it blocks until a datagram arrives.
    fn recv(
        &self,
        wait: Option<Duration>,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

// ---------------------------------------------------------------------------
// UdpTransport
// ---------------------------------------------------------------------------

/// A UDP socket bound locally and connected to one fixed peer.
///
/// Connecting lets the kernel filter datagrams from other sources, which is
/// all the peer discrimination this single-peer protocol needs.
#[derive(Debug)]
pub struct UdpTransport {
    /// Address this socket is bound to (filled in after the OS assigns an
    /// ephemeral port when binding to port 0).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl UdpTransport {
    /// Bind a new transport to `local_addr`.
    ///
    /// Passing `127.0.0.1:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, TransportError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Fix the remote peer for all subsequent sends and receives.
    pub async fn connect(&self, peer: SocketAddr) -> Result<(), TransportError> {
        self.inner.connect(peer).await?;
        Ok(())
    }
}

impl Transport for UdpTransport {
    async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.inner.send(payload).await?;
        Ok(())
    }

    async fn recv(&self, wait: Option<Duration>) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let n = match wait {
            Some(window) => match tokio::time::timeout(window, self.inner.recv(&mut buf)).await {
                Ok(result) => result?,
                Err(_elapsed) => return Err(TransportError::TimeoutExpired),
            },
            None => self.inner.recv(&mut buf).await?,
        };
        buf.truncate(n);
        Ok(buf)
    }
}

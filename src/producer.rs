//! Producer-side delivery state machine: stop-and-wait with bounded retry.
//!
//! The producer drives one packet end-to-end before touching the next — at
//! most one unacknowledged packet exists at any instant.  Each call to
//! [`Producer::deliver`] encodes the sample once and then loops:
//!
//! 1. send the encoded bytes;
//! 2. block up to the response timeout for an ACK/NAK;
//! 3. on ACK with matching sequence → `Delivered`;
//! 4. on NAK, timeout, garbled response, mismatched sequence, or send error →
//!    the attempt is consumed and the identical bytes are resent.
//!
//! After [`max_attempts`](Producer::max_attempts) transmissions without an
//! ACK the outcome is `Failed`; the caller decides whether that is fatal.
//! Nothing here panics and no error escapes the loop.
//!
//! The producer does not own the sequence counter: the next sequence number
//! is supplied by the caller, one per delivery.

use crate::config;
use crate::packet::{DataPacket, ResponsePacket, TelemetrySample};
use crate::transport::{Transport, TransportError};

use std::time::Duration;

/// Terminal result of one delivery attempt sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The consumer acknowledged the packet.
    Delivered,
    /// The transmission ceiling was exhausted without an acknowledgment.
    Failed,
}

/// Stop-and-wait producer bound to one transport.
#[derive(Debug)]
pub struct Producer<T> {
    transport: T,
    /// How long each attempt waits for a response.
    pub response_timeout: Duration,
    /// Total transmissions allowed per packet (including the first).
    pub max_attempts: u32,
}

impl<T: Transport> Producer<T> {
    /// Create a producer with the standard timeout and retry ceiling.
    pub fn new(transport: T) -> Self {
        Self::with_policy(transport, config::RESPONSE_TIMEOUT, config::MAX_ATTEMPTS)
    }

    /// Create a producer with an explicit timeout and retry ceiling.
    pub fn with_policy(transport: T, response_timeout: Duration, max_attempts: u32) -> Self {
        Self {
            transport,
            response_timeout,
            max_attempts,
        }
    }

    /// Deliver one sample under `sequence`, retrying up to the ceiling.
    ///
    /// Returns as soon as a matching ACK arrives; every other event costs one
    /// attempt.  The packet bytes are encoded once and resent unchanged.
    pub async fn deliver(&self, sample: &TelemetrySample, sequence: u16) -> DeliveryOutcome {
        let bytes = DataPacket::new(sequence, sample.clone()).encode();

        for attempt in 1..=self.max_attempts {
            if let Err(e) = self.transport.send(&bytes).await {
                log::warn!("[producer] send failed (attempt {attempt}/{}): {e}", self.max_attempts);
                continue;
            }
            log::debug!("[producer] → DATA seq={sequence} attempt={attempt}/{}", self.max_attempts);

            if self.await_ack(sequence, attempt).await {
                log::debug!("[producer] ← ACK seq={sequence} — delivered");
                return DeliveryOutcome::Delivered;
            }
        }

        log::warn!(
            "[producer] giving up on seq={sequence} after {} transmissions",
            self.max_attempts
        );
        DeliveryOutcome::Failed
    }

    /// Wait one timeout window for a response; `true` only on a valid ACK
    /// that answers `sequence`.
    async fn await_ack(&self, sequence: u16, attempt: u32) -> bool {
        let datagram = match self.transport.recv(Some(self.response_timeout)).await {
            Ok(bytes) => bytes,
            Err(TransportError::TimeoutExpired) => {
                log::debug!("[producer] no response for seq={sequence} (attempt {attempt})");
                return false;
            }
            Err(e) => {
                log::warn!("[producer] receive failed (attempt {attempt}): {e}");
                return false;
            }
        };

        let response = match ResponsePacket::decode(&datagram) {
            Ok(response) => response,
            Err(e) => {
                log::debug!("[producer] discarding response: {e}");
                return false;
            }
        };
        if let Err(e) = response.validate() {
            log::debug!("[producer] discarding response: {e}");
            return false;
        }
        // A stale or stray response answering some other packet is noise,
        // not a verdict on the outstanding one.
        if response.ack_sequence != sequence {
            log::debug!(
                "[producer] response answers seq={} while awaiting seq={sequence}; ignoring",
                response.ack_sequence
            );
            return false;
        }

        if response.is_ack() {
            true
        } else {
            log::debug!("[producer] ← NAK seq={sequence}; will resend");
            false
        }
    }
}

//! Hardware abstraction layer for the radio link
//!
//! Stations talk to a half-duplex point-to-point radio through
//! [`TransceiverInterface`]. The physical driver lives outside this crate;
//! the mock and line-oriented transceivers here cover tests and replay.

pub mod transceiver;
pub mod mock;
pub mod line;
pub mod error;

pub use transceiver::{TransceiverInterface, TransceiverStatus, TransceiverConfig};
pub use mock::MockTransceiver;
pub use line::LineTransceiver;
pub use error::{CommError, CommResult, RecoveryStrategy};

use std::time::Instant;

/// Frame received from the radio, with the link-reported signal strength
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub data: Vec<u8>,
    pub received_at: Instant,
    /// RSSI in dBm, when the link reports it
    pub signal_strength: Option<i32>,
}

impl RawMessage {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            received_at: Instant::now(),
            signal_strength: None,
        }
    }

    pub fn with_received_at(mut self, received_at: Instant) -> Self {
        self.received_at = received_at;
        self
    }

    pub fn with_signal_strength(mut self, rssi: i32) -> Self {
        self.signal_strength = Some(rssi);
        self
    }
}

//! Transceiver interface trait and configuration

use crate::hardware::{CommError, CommResult, RawMessage};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Half-duplex radio link used by every station role
pub trait TransceiverInterface {
    /// Wait up to `timeout` for a frame.
    /// Returns Ok(None) if nothing arrived in time.
    fn read_message(&mut self, timeout: Duration) -> CommResult<Option<RawMessage>>;

    /// Transmit a frame
    fn send_message(&mut self, data: &[u8]) -> CommResult<()>;

    /// Get current transceiver status
    fn get_status(&self) -> TransceiverStatus;

    /// Check if the link is up
    fn is_connected(&self) -> bool;
}

/// Transceiver status information
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransceiverStatus {
    pub connected: bool,
    pub last_signal_strength: Option<i32>,
    pub error_count: u32,
    pub messages_received: u32,
    pub messages_sent: u32,
}

impl TransceiverStatus {
    pub fn is_healthy(&self) -> bool {
        self.connected && self.error_count < 10
    }
}

/// Link-level parameters shared by transceiver implementations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransceiverConfig {
    /// Largest frame the link accepts, in bytes
    pub max_frame_size: usize,
}

impl Default for TransceiverConfig {
    fn default() -> Self {
        Self { max_frame_size: 240 }
    }
}

impl TransceiverConfig {
    pub fn validate(&self) -> CommResult<()> {
        if self.max_frame_size == 0 || self.max_frame_size > 4096 {
            return Err(CommError::ConfigurationError {
                parameter: "max_frame_size".to_string(),
                value: self.max_frame_size.to_string(),
            });
        }
        Ok(())
    }

    /// Reject payloads the link cannot carry
    pub fn check_frame(&self, data: &[u8]) -> CommResult<()> {
        if data.len() > self.max_frame_size {
            return Err(CommError::BufferError {
                operation: "send".to_string(),
                size: data.len(),
                limit: self.max_frame_size,
            });
        }
        Ok(())
    }
}

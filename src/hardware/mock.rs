//! Mock transceiver implementation for testing and development

use crate::hardware::{
    CommError, CommResult, RawMessage, TransceiverConfig, TransceiverInterface, TransceiverStatus,
};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Scripted transceiver: inbound frames are queued by the test,
/// outbound frames are recorded for inspection.
pub struct MockTransceiver {
    name: String,
    status: TransceiverStatus,
    config: TransceiverConfig,
    message_queue: VecDeque<RawMessage>,
    sent_messages: Vec<Vec<u8>>,
    failing_reads: u32,
    failing_sends: u32,
    connected: bool,
}

impl MockTransceiver {
    /// Create a new mock transceiver
    pub fn new(name: impl Into<String>) -> Self {
        let status = TransceiverStatus {
            connected: true,
            ..Default::default()
        };

        Self {
            name: name.into(),
            status,
            config: TransceiverConfig::default(),
            message_queue: VecDeque::new(),
            sent_messages: Vec::new(),
            failing_reads: 0,
            failing_sends: 0,
            connected: true,
        }
    }

    /// Queue a frame heard at `rssi` dBm
    pub fn add_message(&mut self, data: impl Into<Vec<u8>>, rssi: i32) {
        let message = RawMessage::new(data.into()).with_signal_strength(rssi);
        self.message_queue.push_back(message);
    }

    /// Queue a frame with an explicit reception instant
    pub fn add_message_at(&mut self, data: impl Into<Vec<u8>>, rssi: i32, received_at: Instant) {
        let message = RawMessage::new(data.into())
            .with_signal_strength(rssi)
            .with_received_at(received_at);
        self.message_queue.push_back(message);
    }

    /// Queue a frame for which the link reported no signal strength
    pub fn add_message_without_rssi(&mut self, data: impl Into<Vec<u8>>) {
        self.message_queue.push_back(RawMessage::new(data.into()));
    }

    /// Make the next `count` reads fail with a timeout
    pub fn fail_next_reads(&mut self, count: u32) {
        self.failing_reads = count;
    }

    /// Make the next `count` sends fail with a hardware error
    pub fn fail_next_sends(&mut self, count: u32) {
        self.failing_sends = count;
    }

    /// Simulate connection loss
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.status.connected = false;
    }

    /// Restore connection
    pub fn reconnect(&mut self) {
        self.connected = true;
        self.status.connected = true;
    }

    /// Get all frames that were sent through this transceiver
    pub fn get_sent_messages(&self) -> &[Vec<u8>] {
        &self.sent_messages
    }

    /// Sent frames decoded as UTF-8, for readable assertions
    pub fn sent_text(&self) -> Vec<String> {
        self.sent_messages
            .iter()
            .map(|frame| String::from_utf8_lossy(frame).into_owned())
            .collect()
    }

    /// Get the number of queued messages
    pub fn queued_message_count(&self) -> usize {
        self.message_queue.len()
    }

    fn connection_check(&self) -> CommResult<()> {
        if !self.connected {
            return Err(CommError::ConnectionLost {
                transceiver: self.name.clone(),
            });
        }
        Ok(())
    }
}

impl TransceiverInterface for MockTransceiver {
    fn read_message(&mut self, timeout: Duration) -> CommResult<Option<RawMessage>> {
        self.connection_check()?;

        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            self.status.error_count += 1;
            return Err(CommError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        if let Some(message) = self.message_queue.pop_front() {
            self.status.messages_received += 1;
            self.status.last_signal_strength = message.signal_strength;
            Ok(Some(message))
        } else {
            Ok(None)
        }
    }

    fn send_message(&mut self, data: &[u8]) -> CommResult<()> {
        self.connection_check()?;

        if self.failing_sends > 0 {
            self.failing_sends -= 1;
            self.status.error_count += 1;
            return Err(CommError::HardwareError {
                code: 1001,
                description: "Simulated send failure".to_string(),
            });
        }

        self.config.check_frame(data)?;

        self.sent_messages.push(data.to_vec());
        self.status.messages_sent += 1;
        Ok(())
    }

    fn get_status(&self) -> TransceiverStatus {
        self.status.clone()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

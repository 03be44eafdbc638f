//! Line-oriented transceiver for replay and simulation
//!
//! Each inbound line is one frame: `PAYLOAD|RSSI` (or just `PAYLOAD` when the
//! link has no signal strength). Outbound frames are written one per line.

use crate::hardware::{
    CommError, CommResult, RawMessage, TransceiverConfig, TransceiverInterface, TransceiverStatus,
};
use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

const RSSI_SEPARATOR: char = '|';

/// Transceiver backed by a line reader (fed from a background thread)
/// and a line writer.
pub struct LineTransceiver<W: Write> {
    name: String,
    lines: Receiver<(String, Instant)>,
    output: W,
    config: TransceiverConfig,
    status: TransceiverStatus,
    connected: bool,
}

impl<W: Write> LineTransceiver<W> {
    pub fn new<R>(name: impl Into<String>, input: R, output: W, config: TransceiverConfig) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                if tx.send((line, Instant::now())).is_err() {
                    break;
                }
            }
            log::debug!("line transceiver input closed");
        });

        Self {
            name: name.into(),
            lines: rx,
            output,
            config,
            status: TransceiverStatus {
                connected: true,
                ..Default::default()
            },
            connected: true,
        }
    }

    /// Split `PAYLOAD|RSSI` into a frame
    pub fn parse_frame(line: &str, received_at: Instant) -> CommResult<RawMessage> {
        let line = line.trim_end_matches(['\r', '\n']);
        match line.rsplit_once(RSSI_SEPARATOR) {
            Some((payload, rssi)) => {
                let rssi = rssi.trim().parse::<i32>().map_err(|_| CommError::InvalidFrame {
                    details: format!("bad signal strength field '{}'", rssi),
                })?;
                Ok(RawMessage::new(payload.as_bytes().to_vec())
                    .with_signal_strength(rssi)
                    .with_received_at(received_at))
            }
            None => Ok(RawMessage::new(line.as_bytes().to_vec()).with_received_at(received_at)),
        }
    }
}

impl<W: Write> TransceiverInterface for LineTransceiver<W> {
    fn read_message(&mut self, timeout: Duration) -> CommResult<Option<RawMessage>> {
        if !self.connected {
            return Err(CommError::ConnectionLost {
                transceiver: self.name.clone(),
            });
        }

        match self.lines.recv_timeout(timeout) {
            Ok((line, received_at)) => {
                if line.trim().is_empty() {
                    return Ok(None);
                }
                let message = Self::parse_frame(&line, received_at).inspect_err(|_| {
                    self.status.error_count += 1;
                })?;
                self.status.messages_received += 1;
                self.status.last_signal_strength = message.signal_strength;
                Ok(Some(message))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.connected = false;
                self.status.connected = false;
                Err(CommError::ConnectionLost {
                    transceiver: self.name.clone(),
                })
            }
        }
    }

    fn send_message(&mut self, data: &[u8]) -> CommResult<()> {
        self.config.check_frame(data)?;

        let result = self
            .output
            .write_all(data)
            .and_then(|_| self.output.write_all(b"\n"))
            .and_then(|_| self.output.flush());

        result.map_err(|e| {
            self.status.error_count += 1;
            CommError::HardwareError {
                code: 5,
                description: e.to_string(),
            }
        })?;
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

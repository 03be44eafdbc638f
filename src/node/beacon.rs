//! Wearable transmitter: periodic PING, or SOS while distress is latched

use crate::hardware::{CommResult, TransceiverInterface, TransceiverStatus};
use crate::node::StationNode;
use crate::processing::{Message, MessageParser};
use crate::utils::BeaconConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Beacon counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BeaconStats {
    pub pings_sent: u64,
    pub sos_sent: u64,
    pub send_failures: u64,
}

pub struct Beacon<T: TransceiverInterface> {
    device_id: String,
    transceiver: T,
    parser: MessageParser,
    interval: Duration,
    next_due: Option<Instant>,
    distress: Arc<AtomicBool>,
    stats: BeaconStats,
}

impl<T: TransceiverInterface> Beacon<T> {
    pub fn new(device_id: impl AsRef<str>, transceiver: T, interval: Duration) -> Self {
        Self {
            device_id: device_id.as_ref().trim().to_uppercase(),
            transceiver,
            parser: MessageParser::new(),
            interval,
            next_due: None,
            distress: Arc::new(AtomicBool::new(false)),
            stats: BeaconStats::default(),
        }
    }

    pub fn from_config(config: &BeaconConfig, transceiver: T) -> Self {
        Self::new(&config.device_id, transceiver, config.interval())
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Latch or clear distress mode
    pub fn set_distress(&self, active: bool) {
        self.distress.store(active, Ordering::Relaxed);
        log::info!("{}: distress {}", self.device_id, if active { "latched" } else { "cleared" });
    }

    /// Shared latch for a panic button on another thread
    pub fn distress_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.distress)
    }

    pub fn stats(&self) -> BeaconStats {
        self.stats
    }

    pub fn transceiver(&self) -> &T {
        &self.transceiver
    }

    pub fn transceiver_mut(&mut self) -> &mut T {
        &mut self.transceiver
    }

    fn transmit(&mut self) -> CommResult<()> {
        let distress = self.distress.load(Ordering::Relaxed);
        let message = if distress {
            Message::sos(&self.device_id)
        } else {
            Message::ping(&self.device_id)
        };

        match self.transceiver.send_message(&self.parser.encode(&message)) {
            Ok(()) => {
                if distress {
                    self.stats.sos_sent += 1;
                } else {
                    self.stats.pings_sent += 1;
                }
                log::debug!("sent {}", message);
                Ok(())
            }
            Err(e) => {
                self.stats.send_failures += 1;
                log::warn!("{}: beacon not sent: {}", self.device_id, e);
                Err(e)
            }
        }
    }
}

impl<T: TransceiverInterface> StationNode for Beacon<T> {
    fn name(&self) -> &str {
        &self.device_id
    }

    /// Transmit when due. A failed send waits for the next slot.
    fn poll_once(&mut self, now: Instant) -> CommResult<()> {
        if self.next_due.is_some_and(|due| now < due) {
            return Ok(());
        }
        self.next_due = Some(now + self.interval);
        self.transmit()
    }

    fn is_connected(&self) -> bool {
        self.transceiver.is_connected()
    }

    fn link_status(&self) -> TransceiverStatus {
        self.transceiver.get_status()
    }

    fn poll_interval(&self) -> Duration {
        crate::core::DEFAULT_POLL_INTERVAL.min(self.interval)
    }
}

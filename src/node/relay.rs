//! Relay station: measures beacons and reports them to the coordinator
//!
//! Each relay waits its own stagger delay after hearing a beacon before
//! transmitting, so relays sharing the channel do not collide. The delay is
//! a deadline checked by the loop, never a sleep.

use crate::core::StationId;
use crate::hardware::{CommResult, RawMessage, TransceiverInterface, TransceiverStatus};
use crate::node::{NodeError, NodeResult, StationNode};
use crate::processing::{Message, MessageParser};
use crate::utils::ConfigurationManager;
use crate::validation::MeasurementValidator;
use std::time::{Duration, Instant};

/// Relay counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub beacons_heard: u64,
    /// Beacons not reported: missing or out-of-range signal strength
    pub beacons_skipped: u64,
    pub reports_sent: u64,
    pub send_failures: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingReport {
    rssi: i32,
    due: Instant,
}

pub struct Relay<T: TransceiverInterface> {
    id: StationId,
    transceiver: T,
    parser: MessageParser,
    report_delay: Duration,
    receive_timeout: Duration,
    poll_interval: Duration,
    pending: Option<PendingReport>,
    stats: RelayStats,
}

impl<T: TransceiverInterface> Relay<T> {
    pub fn new(id: StationId, transceiver: T, report_delay: Duration) -> Self {
        Self {
            id,
            transceiver,
            parser: MessageParser::new(),
            report_delay,
            receive_timeout: crate::core::DEFAULT_RECEIVE_TIMEOUT,
            poll_interval: crate::core::DEFAULT_POLL_INTERVAL,
            pending: None,
            stats: RelayStats::default(),
        }
    }

    pub fn from_config(config: &ConfigurationManager, id: StationId, transceiver: T) -> NodeResult<Self> {
        let station = config
            .station(&id)
            .ok_or_else(|| NodeError::UnknownStation { station: id.clone() })?;
        if station.is_coordinator {
            return Err(NodeError::WrongRole {
                station: id,
                role: "relay",
            });
        }

        let mut relay = Self::new(station.id, transceiver, config.report_delay(&id));
        relay.receive_timeout = config.fusion().receive_timeout();
        relay.poll_interval = config.fusion().poll_interval();
        Ok(relay)
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    pub fn report_delay(&self) -> Duration {
        self.report_delay
    }

    /// When the scheduled report goes out, if one is pending
    pub fn next_report_due(&self) -> Option<Instant> {
        self.pending.map(|pending| pending.due)
    }

    pub fn transceiver(&self) -> &T {
        &self.transceiver
    }

    pub fn transceiver_mut(&mut self) -> &mut T {
        &mut self.transceiver
    }

    fn handle_frame(&mut self, raw: RawMessage) {
        let message = match self.parser.parse_message(&raw.data) {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(e) => {
                log::debug!("{}: dropping frame: {}", self.id, e);
                return;
            }
        };

        // Other relays' reports share the channel
        if let Message::Report { .. } = message {
            return;
        }

        self.stats.beacons_heard += 1;
        match raw.signal_strength {
            Some(rssi) if MeasurementValidator::is_valid_rssi(rssi) => {
                // A newer beacon replaces a report that has not gone out yet
                self.pending = Some(PendingReport {
                    rssi,
                    due: raw.received_at + self.report_delay,
                });
                log::debug!(
                    "{}: heard {} at {} dBm, reporting in {:?}",
                    self.id,
                    message,
                    rssi,
                    self.report_delay
                );
            }
            other => {
                self.stats.beacons_skipped += 1;
                log::warn!("{}: unusable signal strength {:?} for {}", self.id, other, message);
            }
        }
    }

    fn send_due_report(&mut self, now: Instant) -> CommResult<()> {
        let Some(pending) = self.pending else {
            return Ok(());
        };
        if now < pending.due {
            return Ok(());
        }
        self.pending = None;

        let report = self.parser.encode(&Message::report(self.id.clone(), pending.rssi));
        match self.transceiver.send_message(&report) {
            Ok(()) => {
                self.stats.reports_sent += 1;
                log::debug!("{}: reported {} dBm", self.id, pending.rssi);
                Ok(())
            }
            Err(e) => {
                self.stats.send_failures += 1;
                log::warn!("{}: report not sent: {}", self.id, e);
                Err(e)
            }
        }
    }
}

impl<T: TransceiverInterface> StationNode for Relay<T> {
    fn name(&self) -> &str {
        self.id.as_str()
    }

    fn poll_once(&mut self, now: Instant) -> CommResult<()> {
        let received = match self.transceiver.read_message(self.receive_timeout) {
            Ok(Some(raw)) => {
                self.handle_frame(raw);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        let sent = self.send_due_report(now);
        received.and(sent)
    }

    fn is_connected(&self) -> bool {
        self.transceiver.is_connected()
    }

    fn link_status(&self) -> TransceiverStatus {
        self.transceiver.get_status()
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

//! Coordinator station: hears beacons directly, collects relay reports,
//! and runs the fusion pipeline.

use crate::algorithms::Trilateration;
use crate::api::{Delivery, DispatchStats, PositionSink, SinkDispatcher, TextFormatter};
use crate::core::{RawMeasurement, StationId};
use crate::fusion::{Cycle, IngestOutcome, PositionEstimator, ReadingAggregator, ReadingSource};
use crate::hardware::{CommResult, RawMessage, TransceiverInterface, TransceiverStatus};
use crate::node::{NodeError, NodeResult, StationNode};
use crate::processing::{Message, MessageParser};
use crate::utils::{ConfigurationManager, FusionConfig};
use std::time::{Duration, Instant};

/// Coordinator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub frames_received: u64,
    pub decode_errors: u64,
    pub readings_rejected: u64,
    pub cycles_completed: u64,
    pub fixes_computed: u64,
    pub solve_failures: u64,
    pub timeouts: u64,
    /// Deliveries the sink queue refused
    pub deliveries_dropped: u64,
}

pub struct Coordinator<T: TransceiverInterface> {
    id: StationId,
    transceiver: T,
    parser: MessageParser,
    aggregator: ReadingAggregator,
    estimator: PositionEstimator,
    dispatcher: SinkDispatcher,
    receive_timeout: Duration,
    poll_interval: Duration,
    stats: CoordinatorStats,
}

impl<T: TransceiverInterface> Coordinator<T> {
    pub fn new(
        id: StationId,
        transceiver: T,
        aggregator: ReadingAggregator,
        estimator: PositionEstimator,
        dispatcher: SinkDispatcher,
        fusion: &FusionConfig,
    ) -> Self {
        Self {
            id,
            transceiver,
            parser: MessageParser::new(),
            aggregator,
            estimator,
            dispatcher,
            receive_timeout: fusion.receive_timeout(),
            poll_interval: fusion.poll_interval(),
            stats: CoordinatorStats::default(),
        }
    }

    /// Wire up a coordinator for the deployment's coordinating station
    pub fn from_config(
        config: &ConfigurationManager,
        transceiver: T,
        sink: Box<dyn PositionSink>,
    ) -> NodeResult<Self> {
        let station = config.coordinator()?;
        let stations = config.stations();
        let fusion = config.fusion();

        let aggregator = ReadingAggregator::from_config(&stations, fusion);
        let estimator = PositionEstimator::new(
            &stations,
            config.calibration(),
            Trilateration::with_min_geometry_conditioning(fusion.min_geometry_conditioning),
        );
        let dispatcher = SinkDispatcher::spawn(sink, config.sink()).map_err(NodeError::from)?;

        Ok(Self::new(station.id, transceiver, aggregator, estimator, dispatcher, fusion))
    }

    pub fn id(&self) -> &StationId {
        &self.id
    }

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            timeouts: self.aggregator.timeouts(),
            ..self.stats
        }
    }

    pub fn aggregator(&self) -> &ReadingAggregator {
        &self.aggregator
    }

    pub fn transceiver_mut(&mut self) -> &mut T {
        &mut self.transceiver
    }

    /// Stop the sink worker after it drains the queue
    pub fn shutdown(self) -> (CoordinatorStats, DispatchStats) {
        let stats = self.stats();
        (stats, self.dispatcher.shutdown())
    }

    fn handle_frame(&mut self, raw: RawMessage) {
        self.stats.frames_received += 1;

        let message = match self.parser.parse_message(&raw.data) {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(e) if e.is_transport_fault() => {
                log::trace!("dropping unreadable frame: {}", e);
                return;
            }
            Err(e) => {
                log::warn!("malformed frame dropped: {}", e);
                self.stats.decode_errors += 1;
                return;
            }
        };

        let distress = message.is_distress();
        let (measurement, source) = match message {
            Message::Ping { device_id } | Message::Sos { device_id } => {
                let Some(rssi) = raw.signal_strength else {
                    log::debug!("beacon from {} carried no signal strength", device_id);
                    self.stats.readings_rejected += 1;
                    return;
                };
                (
                    RawMeasurement {
                        station: self.id.clone(),
                        rssi,
                        received_at: raw.received_at,
                    },
                    ReadingSource::Direct { device_id, distress },
                )
            }
            Message::Report { station, rssi } => (
                RawMeasurement {
                    station,
                    rssi,
                    received_at: raw.received_at,
                },
                ReadingSource::Relayed,
            ),
        };

        match self.aggregator.ingest(measurement, source) {
            IngestOutcome::Rejected(e) => {
                log::warn!("reading rejected: {}", e);
                self.stats.readings_rejected += 1;
            }
            IngestOutcome::Recorded { stations } => {
                log::debug!("{}/{} stations reported", stations, self.aggregator.quorum());
            }
            IngestOutcome::Complete(cycle) => self.complete_cycle(cycle),
        }
    }

    fn complete_cycle(&mut self, cycle: Cycle) {
        self.stats.cycles_completed += 1;

        let delivery = match self.estimator.estimate(&cycle) {
            Ok(estimate) => {
                self.stats.fixes_computed += 1;
                log::info!("fix: {}", TextFormatter::new().format_estimate(&estimate));
                Delivery::Estimate(estimate)
            }
            Err(failure) => {
                self.stats.solve_failures += 1;
                log::warn!("no fix for completed cycle: {}", failure.error);
                Delivery::Failure(failure)
            }
        };

        if !self.dispatcher.dispatch(delivery) {
            self.stats.deliveries_dropped += 1;
        }
    }
}

impl<T: TransceiverInterface> StationNode for Coordinator<T> {
    fn name(&self) -> &str {
        self.id.as_str()
    }

    fn poll_once(&mut self, now: Instant) -> CommResult<()> {
        let result = match self.transceiver.read_message(self.receive_timeout) {
            Ok(Some(raw)) => {
                self.handle_frame(raw);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        self.aggregator.check_timeout(now);

        result
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

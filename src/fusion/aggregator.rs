//! Per-coordinator reading aggregation
//!
//! ```text
//! EMPTY --valid reading--> COLLECTING --quorum reached--> COMPLETE --> EMPTY
//!                               |
//!                               +--no reading for > timeout--> EMPTY
//! ```

use crate::core::{RawMeasurement, Station};
use crate::fusion::cycle::{Cycle, CycleState};
use crate::utils::FusionConfig;
use crate::validation::{FixError, MeasurementValidator};
use std::time::{Duration, Instant};

/// Where a reading came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadingSource {
    /// The coordinator heard the beacon itself
    Direct { device_id: String, distress: bool },
    /// A relay station reported what it heard
    Relayed,
}

/// Result of feeding one reading to the aggregator
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Discarded before touching the cycle
    Rejected(FixError),
    /// Stored; `stations` distinct stations so far
    Recorded { stations: usize },
    /// Quorum reached. The aggregator is EMPTY again and the cycle is handed out.
    Complete(Cycle),
}

/// Collects one reading per station until quorum or timeout
#[derive(Debug)]
pub struct ReadingAggregator {
    validator: MeasurementValidator,
    quorum: usize,
    cycle_timeout: Duration,
    cycle: Option<Cycle>,
    /// Cycles discarded for inactivity, whether swept by the loop or by `ingest`
    timeouts: u64,
}

impl ReadingAggregator {
    pub fn new(stations: &[Station], quorum: usize, cycle_timeout: Duration) -> Self {
        Self {
            validator: MeasurementValidator::new(stations),
            quorum,
            cycle_timeout,
            cycle: None,
            timeouts: 0,
        }
    }

    pub fn from_config(stations: &[Station], fusion: &FusionConfig) -> Self {
        Self::new(stations, fusion.quorum, fusion.cycle_timeout())
    }

    pub fn state(&self) -> CycleState {
        match self.cycle {
            Some(_) => CycleState::Collecting,
            None => CycleState::Empty,
        }
    }

    /// The live cycle, if any
    pub fn cycle(&self) -> Option<&Cycle> {
        self.cycle.as_ref()
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts
    }

    /// Feed one reading. `measurement.received_at` is the activity time.
    pub fn ingest(&mut self, measurement: RawMeasurement, source: ReadingSource) -> IngestOutcome {
        if let Err(error) = self.validator.validate(&measurement) {
            return IngestOutcome::Rejected(error);
        }

        let now = measurement.received_at;

        // A stale cycle the loop has not swept yet must not absorb this reading
        self.check_timeout(now);

        let cycle = self.cycle.get_or_insert_with(|| {
            log::debug!("cycle started by {}", measurement.station);
            Cycle::start(now)
        });

        if let ReadingSource::Direct { device_id, distress } = &source {
            cycle.note_beacon(device_id, *distress);
        }

        let station = measurement.station;
        if !cycle.record(station.clone(), measurement.rssi, now) {
            log::debug!("repeat reading from {} overwrites the earlier one", station);
        }

        let stations = cycle.station_count();
        if stations >= self.quorum {
            return match self.cycle.take() {
                Some(cycle) => {
                    log::info!(
                        "cycle complete: {} stations, device {}",
                        cycle.station_count(),
                        cycle.device_id().unwrap_or("?")
                    );
                    IngestOutcome::Complete(cycle)
                }
                None => IngestOutcome::Recorded { stations },
            };
        }

        IngestOutcome::Recorded { stations }
    }

    /// Discard the live cycle if it has been silent for longer than the
    /// timeout. Returns true if a cycle was discarded.
    pub fn check_timeout(&mut self, now: Instant) -> bool {
        let expired = self
            .cycle
            .as_ref()
            .is_some_and(|cycle| cycle.is_expired(now, self.cycle_timeout));

        if expired {
            if let Some(cycle) = self.cycle.take() {
                self.timeouts += 1;
                log::info!(
                    "cycle timed out with {}/{} stations",
                    cycle.station_count(),
                    self.quorum
                );
            }
        }
        expired
    }

    /// Drop any partial cycle
    pub fn reset(&mut self) {
        self.cycle = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Point2, StationId};

    fn stations() -> Vec<Station> {
        vec![
            Station {
                id: StationId::new("MASTER"),
                position: Point2::new(0.0, 0.0),
                is_coordinator: true,
            },
            Station {
                id: StationId::new("STATION_B"),
                position: Point2::new(10.0, 0.0),
                is_coordinator: false,
            },
            Station {
                id: StationId::new("STATION_C"),
                position: Point2::new(5.0, 8.66),
                is_coordinator: false,
            },
            Station {
                id: StationId::new("STATION_D"),
                position: Point2::new(5.0, -8.66),
                is_coordinator: false,
            },
        ]
    }

    fn aggregator() -> ReadingAggregator {
        ReadingAggregator::new(&stations(), 3, Duration::from_secs(10))
    }

    fn at(station: &str, rssi: i32, received_at: Instant) -> RawMeasurement {
        RawMeasurement {
            station: StationId::new(station),
            rssi,
            received_at,
        }
    }

    fn ping(device: &str) -> ReadingSource {
        ReadingSource::Direct {
            device_id: device.to_string(),
            distress: false,
        }
    }

    fn sos(device: &str) -> ReadingSource {
        ReadingSource::Direct {
            device_id: device.to_string(),
            distress: true,
        }
    }

    #[test]
    fn test_quorum_completes_once() {
        let t0 = Instant::now();
        let mut agg = aggregator();
        assert_eq!(agg.state(), CycleState::Empty);

        let outcome = agg.ingest(at("MASTER", -50, t0), ping("DEV1"));
        assert_eq!(outcome, IngestOutcome::Recorded { stations: 1 });
        assert_eq!(agg.state(), CycleState::Collecting);

        let outcome = agg.ingest(at("STATION_B", -60, t0), ReadingSource::Relayed);
        assert_eq!(outcome, IngestOutcome::Recorded { stations: 2 });

        let cycle = match agg.ingest(at("STATION_C", -55, t0), ReadingSource::Relayed) {
            IngestOutcome::Complete(cycle) => cycle,
            other => panic!("expected completion, got {:?}", other),
        };
        assert_eq!(cycle.station_count(), 3);
        assert_eq!(cycle.device_id(), Some("DEV1"));
        assert!(!cycle.emergency());
        assert_eq!(agg.state(), CycleState::Empty);
    }

    #[test]
    fn test_repeat_station_does_not_count_toward_quorum() {
        let t0 = Instant::now();
        let mut agg = aggregator();

        agg.ingest(at("MASTER", -50, t0), ping("DEV1"));
        agg.ingest(at("STATION_B", -70, t0), ReadingSource::Relayed);
        let outcome = agg.ingest(at("STATION_B", -60, t0), ReadingSource::Relayed);
        assert_eq!(outcome, IngestOutcome::Recorded { stations: 2 });
        assert_eq!(agg.cycle().unwrap().readings()[&StationId::new("STATION_B")], -60);

        let outcome = agg.ingest(at("MASTER", -52, t0), ping("DEV1"));
        assert_eq!(outcome, IngestOutcome::Recorded { stations: 2 });

        assert!(matches!(
            agg.ingest(at("STATION_C", -55, t0), ReadingSource::Relayed),
            IngestOutcome::Complete(_)
        ));
    }

    #[test]
    fn test_quorum_reached_without_coordinator() {
        let t0 = Instant::now();
        let mut agg = aggregator();
        agg.ingest(at("STATION_B", -60, t0), ReadingSource::Relayed);
        agg.ingest(at("STATION_C", -61, t0), ReadingSource::Relayed);
        match agg.ingest(at("STATION_D", -62, t0), ReadingSource::Relayed) {
            IngestOutcome::Complete(cycle) => assert_eq!(cycle.device_id(), None),
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_discards_cycle() {
        let t0 = Instant::now();
        let mut agg = aggregator();
        agg.ingest(at("MASTER", -50, t0), ping("DEV1"));

        assert!(!agg.check_timeout(t0 + Duration::from_secs(5)));
        assert_eq!(agg.state(), CycleState::Collecting);

        assert!(agg.check_timeout(t0 + Duration::from_millis(10_001)));
        assert_eq!(agg.state(), CycleState::Empty);
        assert!(!agg.check_timeout(t0 + Duration::from_secs(30)));
        assert_eq!(agg.timeouts(), 1);
    }

    #[test]
    fn test_reading_at_9_9_seconds_keeps_cycle_alive() {
        let t0 = Instant::now();
        let mut agg = aggregator();
        agg.ingest(at("MASTER", -50, t0), ping("DEV1"));

        let t1 = t0 + Duration::from_millis(9_900);
        agg.ingest(at("STATION_B", -60, t1), ReadingSource::Relayed);

        // 15 s after the first reading but only 5.1 s after the last
        assert!(!agg.check_timeout(t0 + Duration::from_secs(15)));
        assert_eq!(agg.cycle().unwrap().station_count(), 2);

        assert!(matches!(
            agg.ingest(at("STATION_C", -55, t0 + Duration::from_secs(15)), ReadingSource::Relayed),
            IngestOutcome::Complete(_)
        ));
    }

    #[test]
    fn test_stale_cycle_swept_on_ingest() {
        let t0 = Instant::now();
        let mut agg = aggregator();
        agg.ingest(at("MASTER", -50, t0), ping("DEV1"));
        agg.ingest(at("STATION_B", -60, t0), ReadingSource::Relayed);

        let late = t0 + Duration::from_secs(11);
        let outcome = agg.ingest(at("STATION_C", -55, late), ReadingSource::Relayed);
        assert_eq!(outcome, IngestOutcome::Recorded { stations: 1 });
        assert_eq!(agg.cycle().unwrap().started_at(), late);
        assert_eq!(agg.timeouts(), 1);
    }

    #[test]
    fn test_emergency_is_sticky() {
        let t0 = Instant::now();
        let mut agg = aggregator();
        agg.ingest(at("STATION_B", -60, t0), ReadingSource::Relayed);
        agg.ingest(at("MASTER", -50, t0), sos("DEV1"));
        agg.ingest(at("MASTER", -51, t0), ping("DEV1"));

        match agg.ingest(at("STATION_C", -55, t0), ReadingSource::Relayed) {
            IngestOutcome::Complete(cycle) => assert!(cycle.emergency()),
            other => panic!("expected completion, got {:?}", other),
        }

        // Next cycle starts clean
        agg.ingest(at("MASTER", -50, t0), ping("DEV1"));
        assert!(!agg.cycle().unwrap().emergency());
    }

    #[test]
    fn test_device_id_first_seen_wins() {
        let t0 = Instant::now();
        let mut agg = aggregator();
        agg.ingest(at("MASTER", -50, t0), ping("DEV1"));
        agg.ingest(at("MASTER", -50, t0), ping("DEV2"));
        assert_eq!(agg.cycle().unwrap().device_id(), Some("DEV1"));
    }

    #[test]
    fn test_invalid_readings_never_touch_cycle() {
        let t0 = Instant::now();
        let mut agg = aggregator();

        let outcome = agg.ingest(at("STATION_B", 0, t0), ReadingSource::Relayed);
        assert!(matches!(
            outcome,
            IngestOutcome::Rejected(FixError::InvalidMeasurement { rssi: 0, .. })
        ));
        assert_eq!(agg.state(), CycleState::Empty);

        let outcome = agg.ingest(at("STRANGER", -40, t0), ReadingSource::Relayed);
        assert!(matches!(
            outcome,
            IngestOutcome::Rejected(FixError::UnknownStation { .. })
        ));
        assert_eq!(agg.state(), CycleState::Empty);

        agg.ingest(at("MASTER", -50, t0), ping("DEV1"));
        agg.ingest(at("STATION_B", 12, t0), sos("DEV1"));
        assert_eq!(agg.cycle().unwrap().station_count(), 1);
    }

    #[test]
    fn test_rejected_reading_does_not_refresh_timeout() {
        let t0 = Instant::now();
        let mut agg = aggregator();
        agg.ingest(at("MASTER", -50, t0), ping("DEV1"));
        agg.ingest(at("STATION_B", 5, t0 + Duration::from_secs(8)), ReadingSource::Relayed);
        assert!(agg.check_timeout(t0 + Duration::from_secs(11)));
    }

    #[test]
    fn test_larger_quorum() {
        let t0 = Instant::now();
        let mut agg = ReadingAggregator::new(&stations(), 4, Duration::from_secs(10));
        agg.ingest(at("MASTER", -50, t0), ping("DEV1"));
        agg.ingest(at("STATION_B", -51, t0), ReadingSource::Relayed);
        let outcome = agg.ingest(at("STATION_C", -52, t0), ReadingSource::Relayed);
        assert_eq!(outcome, IngestOutcome::Recorded { stations: 3 });
        assert!(matches!(
            agg.ingest(at("STATION_D", -53, t0), ReadingSource::Relayed),
            IngestOutcome::Complete(_)
        ));
    }
}

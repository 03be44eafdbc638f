//! One collection cycle: the readings gathered for a single beacon burst

use crate::core::StationId;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Observable aggregator state. COMPLETE is transient: the completing
/// ingest hands the cycle out and the aggregator is already EMPTY again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Empty,
    Collecting,
}

/// Readings collected for one beacon burst
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    device_id: Option<String>,
    emergency: bool,
    readings: BTreeMap<StationId, i32>,
    started_at: Instant,
    last_reading_at: Instant,
}

impl Cycle {
    pub(crate) fn start(now: Instant) -> Self {
        Self {
            device_id: None,
            emergency: false,
            readings: BTreeMap::new(),
            started_at: now,
            last_reading_at: now,
        }
    }

    /// Store a station's reading. Returns true if the station is new to this cycle;
    /// a repeat overwrites the earlier value.
    pub(crate) fn record(&mut self, station: StationId, rssi: i32, now: Instant) -> bool {
        self.last_reading_at = now;
        self.readings.insert(station, rssi).is_none()
    }

    /// First device id seen wins; distress is sticky
    pub(crate) fn note_beacon(&mut self, device_id: &str, distress: bool) {
        if self.device_id.is_none() {
            self.device_id = Some(device_id.to_string());
        }
        self.emergency |= distress;
    }

    pub(crate) fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_reading_at) > timeout
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn emergency(&self) -> bool {
        self.emergency
    }

    /// Station readings in label order
    pub fn readings(&self) -> &BTreeMap<StationId, i32> {
        &self.readings
    }

    pub fn station_count(&self) -> usize {
        self.readings.len()
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn last_reading_at(&self) -> Instant {
        self.last_reading_at
    }

    pub fn mean_rssi(&self) -> f64 {
        if self.readings.is_empty() {
            return 0.0;
        }
        let sum: i64 = self.readings.values().map(|&rssi| rssi as i64).sum();
        sum as f64 / self.readings.len() as f64
    }
}

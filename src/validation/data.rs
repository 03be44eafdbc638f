//! Admission checks applied before a reading reaches a cycle

use crate::core::{RawMeasurement, Station, StationId};
use crate::validation::error::{FixError, FixResult};
use std::collections::HashMap;

/// Checks readings against the station table and the sensor's valid range
#[derive(Debug, Clone)]
pub struct MeasurementValidator {
    stations: HashMap<StationId, Station>,
}

impl MeasurementValidator {
    pub fn new(stations: &[Station]) -> Self {
        Self {
            stations: stations
                .iter()
                .map(|station| (station.id.clone(), station.clone()))
                .collect(),
        }
    }

    /// A received signal strength of 0 dBm or above cannot come from this
    /// hardware class; it means the field was mis-parsed upstream.
    pub fn is_valid_rssi(rssi: i32) -> bool {
        rssi < 0
    }

    pub fn station(&self, id: &StationId) -> Option<&Station> {
        self.stations.get(id)
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn validate(&self, measurement: &RawMeasurement) -> FixResult<()> {
        if !self.stations.contains_key(&measurement.station) {
            return Err(FixError::UnknownStation {
                station: measurement.station.clone(),
            });
        }

        if !Self::is_valid_rssi(measurement.rssi) {
            return Err(FixError::InvalidMeasurement {
                station: measurement.station.clone(),
                rssi: measurement.rssi,
            });
        }

        Ok(())
    }
}

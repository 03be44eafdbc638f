//! Core data types for the positioning system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::core::constants::{DEFAULT_PATH_LOSS_EXPONENT, DEFAULT_RSSI_AT_1M};

/// Station label, normalized to trimmed upper case
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct StationId(String);

impl StationId {
    pub fn new(label: impl AsRef<str>) -> Self {
        StationId(label.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for StationId {
    fn from(label: String) -> Self {
        StationId::new(label)
    }
}

impl From<&str> for StationId {
    fn from(label: &str) -> Self {
        StationId::new(label)
    }
}

impl From<StationId> for String {
    fn from(id: StationId) -> Self {
        id.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Planar position in meters, local deployment frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Fixed radio node with a known position
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: StationId,
    pub position: Point2,
    pub is_coordinator: bool,
}

/// Log-distance path loss calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// Measured RSSI at 1 meter (dBm, negative)
    #[serde(default = "default_rssi_at_1m")]
    pub rssi_at_1m: f64,
    /// Environment factor: 2.0 open space, 3.0 light obstacles, 4.0 indoor
    #[serde(default = "default_path_loss_exponent")]
    pub path_loss_exponent: f64,
}

fn default_rssi_at_1m() -> f64 {
    DEFAULT_RSSI_AT_1M
}

fn default_path_loss_exponent() -> f64 {
    DEFAULT_PATH_LOSS_EXPONENT
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            rssi_at_1m: DEFAULT_RSSI_AT_1M,
            path_loss_exponent: DEFAULT_PATH_LOSS_EXPONENT,
        }
    }
}

/// One station's signal strength reading of the transmitter
#[derive(Debug, Clone, PartialEq)]
pub struct RawMeasurement {
    pub station: StationId,
    pub rssi: i32,
    pub received_at: Instant,
}

/// Solved transmitter position for one completed cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionEstimate {
    pub device_id: Option<String>,
    pub x: f64,
    pub y: f64,
    pub contributing_stations: Vec<StationId>,
    pub mean_rssi: f64,
    pub emergency: bool,
}

impl PositionEstimate {
    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

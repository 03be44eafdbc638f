use crate::core::{
    CalibrationParams, Point2, Station, StationId, DEFAULT_BEACON_INTERVAL,
    DEFAULT_CYCLE_TIMEOUT, DEFAULT_MIN_GEOMETRY_CONDITIONING, DEFAULT_POLL_INTERVAL,
    DEFAULT_QUORUM, DEFAULT_RECEIVE_TIMEOUT, DEFAULT_REPORT_DELAY, MIN_STATIONS,
    PATH_LOSS_EXPONENT_RANGE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Layouts whose normalized triangle area falls below this are reported as collinear
const COLLINEARITY_WARNING_THRESHOLD: f64 = 0.01;

/// Station table entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Easting in meters (local frame)
    pub x: f64,
    /// Northing in meters (local frame)
    pub y: f64,
    /// Exactly one station runs the fusion loop
    #[serde(default)]
    pub coordinator: bool,
    /// Relay stagger before reporting a beacon (milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_delay_ms: Option<u64>,
}

/// Cycle aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Distinct stations needed to complete a cycle
    pub quorum: usize,
    /// Inactivity before an incomplete cycle is discarded (milliseconds)
    pub cycle_timeout_ms: u64,
    /// Sleep between loop iterations (milliseconds)
    pub poll_interval_ms: u64,
    /// Bounded wait for one transport receive (milliseconds)
    pub receive_timeout_ms: u64,
    /// Solver rejects layouts conditioned worse than this
    pub min_geometry_conditioning: f64,
}

/// Sink delivery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Publish attempts per delivery before it is dropped
    pub max_attempts: u32,
    /// Pause between attempts (milliseconds)
    pub retry_delay_ms: u64,
    /// Deliveries buffered ahead of the worker
    pub queue_capacity: usize,
}

/// Transmitter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    pub device_id: String,
    /// Beacon period (milliseconds)
    pub interval_ms: u64,
}

/// Complete deployment file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub stations: BTreeMap<String, StationConfig>,
    #[serde(default)]
    pub calibration: CalibrationParams,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub beacon: BeaconConfig,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            quorum: DEFAULT_QUORUM,
            cycle_timeout_ms: DEFAULT_CYCLE_TIMEOUT.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT.as_millis() as u64,
            min_geometry_conditioning: DEFAULT_MIN_GEOMETRY_CONDITIONING,
        }
    }
}

impl FusionConfig {
    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_millis(self.cycle_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 200,
            queue_capacity: 16,
        }
    }
}

impl SinkConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            device_id: "DEV1".to_string(),
            interval_ms: DEFAULT_BEACON_INTERVAL.as_millis() as u64,
        }
    }
}

impl BeaconConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid parameter {parameter} = {value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("Missing parameter {parameter}")]
    MissingParameter { parameter: String },
    #[error("I/O error: {message}")]
    IoError { message: String },
    #[error("Serialization error: {message}")]
    SerializationError { message: String },
    #[error("Station {station}: {reason}")]
    StationConflict { station: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration validation result
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// No fatal errors were found
    pub is_valid: bool,
    /// Fatal problems; any one prevents startup
    pub errors: Vec<ConfigError>,
    /// Suspicious but usable settings
    pub warnings: Vec<String>,
    /// Suggested corrections
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    fn finish(mut self) -> Self {
        self.is_valid = self.errors.is_empty();
        self
    }
}

/// Loads, validates and exposes one deployment
pub struct ConfigurationManager {
    config: DeploymentConfig,
    config_file_path: Option<String>,
    warnings: Vec<String>,
}

impl ConfigurationManager {
    /// Validate and adopt a configuration. Fatal problems are returned as the
    /// first error; warnings are logged and kept.
    pub fn new(config: DeploymentConfig) -> ConfigResult<Self> {
        let validation = Self::validate(&config);
        if let Some(error) = validation.errors.into_iter().next() {
            return Err(error);
        }
        for warning in &validation.warnings {
            log::warn!("config: {}", warning);
        }
        for suggestion in &validation.suggestions {
            log::info!("config suggestion: {}", suggestion);
        }

        Ok(Self {
            config,
            config_file_path: None,
            warnings: validation.warnings,
        })
    }

    /// Create configuration manager and load from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let mut manager = Self::from_json_str(&content)?;
        manager.config_file_path = Some(path_str);
        Ok(manager)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: DeploymentConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to parse config: {}", e),
            })?;
        Self::new(config)
    }

    /// Save configuration to JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> ConfigResult<()> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(&self.config).map_err(|e| {
            ConfigError::SerializationError {
                message: format!("Failed to serialize config: {}", e),
            }
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })?;

        self.config_file_path = Some(path_str);
        Ok(())
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    pub fn config_file_path(&self) -> Option<&str> {
        self.config_file_path.as_deref()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn calibration(&self) -> CalibrationParams {
        self.config.calibration
    }

    pub fn fusion(&self) -> &FusionConfig {
        &self.config.fusion
    }

    pub fn sink(&self) -> &SinkConfig {
        &self.config.sink
    }

    pub fn beacon(&self) -> &BeaconConfig {
        &self.config.beacon
    }

    /// Station table in label order
    pub fn stations(&self) -> Vec<Station> {
        self.config
            .stations
            .iter()
            .map(|(label, entry)| Station {
                id: StationId::new(label),
                position: Point2::new(entry.x, entry.y),
                is_coordinator: entry.coordinator,
            })
            .collect()
    }

    /// The single coordinating station
    pub fn coordinator(&self) -> ConfigResult<Station> {
        self.stations()
            .into_iter()
            .find(|station| station.is_coordinator)
            .ok_or(ConfigError::MissingParameter {
                parameter: "stations.*.coordinator".to_string(),
            })
    }

    pub fn station(&self, id: &StationId) -> Option<Station> {
        self.stations().into_iter().find(|station| &station.id == id)
    }

    /// Stagger a relay waits before reporting.
    ///
    /// Without an explicit `report_delay_ms`, the n-th non-coordinator station
    /// in label order waits `n × 500 ms` so relays do not transmit over each other.
    pub fn report_delay(&self, id: &StationId) -> Duration {
        // Rank on the normalized id so "station_b" sorts before "STATION_C"
        let mut relays: Vec<(StationId, &StationConfig)> = self
            .config
            .stations
            .iter()
            .filter(|(_, entry)| !entry.coordinator)
            .map(|(label, entry)| (StationId::new(label), entry))
            .collect();
        relays.sort_by(|(a, _), (b, _)| a.cmp(b));

        for (rank, (relay, entry)) in relays.iter().enumerate() {
            if relay == id {
                return match entry.report_delay_ms {
                    Some(ms) => Duration::from_millis(ms),
                    None => DEFAULT_REPORT_DELAY * (rank as u32 + 1),
                };
            }
        }
        DEFAULT_REPORT_DELAY
    }

    /// Check a deployment without adopting it
    pub fn validate(config: &DeploymentConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_stations(config, &mut result);
        Self::validate_calibration(&config.calibration, &mut result);
        Self::validate_fusion(config, &mut result);
        Self::validate_sink(&config.sink, &mut result);
        Self::validate_beacon(&config.beacon, &mut result);

        result.finish()
    }

    fn validate_stations(config: &DeploymentConfig, result: &mut ValidationResult) {
        let stations = &config.stations;

        if stations.len() < MIN_STATIONS {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "stations".to_string(),
                value: stations.len().to_string(),
                reason: format!("at least {} stations are required", MIN_STATIONS),
            });
        }

        let mut normalized: BTreeMap<StationId, &str> = BTreeMap::new();
        for (label, entry) in stations {
            let id = StationId::new(label);
            if id.as_str().is_empty() || id.as_str().contains(crate::core::FIELD_DELIMITER) {
                result.errors.push(ConfigError::StationConflict {
                    station: label.clone(),
                    reason: "label must be non-empty and free of ':'".to_string(),
                });
            }
            if let Some(previous) = normalized.insert(id, label) {
                result.errors.push(ConfigError::StationConflict {
                    station: label.clone(),
                    reason: format!("same label as '{}' after normalization", previous),
                });
            }
            if !entry.x.is_finite() || !entry.y.is_finite() {
                result.errors.push(ConfigError::StationConflict {
                    station: label.clone(),
                    reason: format!("non-finite position ({}, {})", entry.x, entry.y),
                });
            }
        }

        let coordinators = stations.values().filter(|entry| entry.coordinator).count();
        if coordinators != 1 {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "stations.*.coordinator".to_string(),
                value: coordinators.to_string(),
                reason: "exactly one coordinator is required".to_string(),
            });
        }

        let positions: Vec<(&String, Point2)> = stations
            .iter()
            .filter(|(_, entry)| entry.x.is_finite() && entry.y.is_finite())
            .map(|(label, entry)| (label, Point2::new(entry.x, entry.y)))
            .collect();

        for (i, (label_a, a)) in positions.iter().enumerate() {
            for (label_b, b) in positions.iter().skip(i + 1) {
                if a.distance_to(b) < 1e-6 {
                    result
                        .warnings
                        .push(format!("Stations {} and {} share a position", label_a, label_b));
                }
            }
        }

        if positions.len() >= MIN_STATIONS {
            let points: Vec<Point2> = positions.iter().map(|(_, p)| *p).collect();
            if is_collinear(&points) {
                result
                    .warnings
                    .push("Station layout is collinear; every fix will fail".to_string());
                result
                    .suggestions
                    .push("Move one station off the line joining the others".to_string());
            }
        }
    }

    fn validate_calibration(calibration: &CalibrationParams, result: &mut ValidationResult) {
        if !calibration.rssi_at_1m.is_finite() || calibration.rssi_at_1m >= 0.0 {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "calibration.rssi_at_1m".to_string(),
                value: calibration.rssi_at_1m.to_string(),
                reason: "must be a negative dBm value".to_string(),
            });
        }

        let n = calibration.path_loss_exponent;
        if !n.is_finite() || n <= 0.0 {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "calibration.path_loss_exponent".to_string(),
                value: n.to_string(),
                reason: "must be positive".to_string(),
            });
        } else if n < PATH_LOSS_EXPONENT_RANGE.0 || n > PATH_LOSS_EXPONENT_RANGE.1 {
            result.warnings.push(format!(
                "Path loss exponent {} is outside the usual {}..{} range",
                n, PATH_LOSS_EXPONENT_RANGE.0, PATH_LOSS_EXPONENT_RANGE.1
            ));
            result
                .suggestions
                .push("Use 2.0 for open space, 3.0 for light obstacles, 4.0 indoors".to_string());
        }
    }

    fn validate_fusion(config: &DeploymentConfig, result: &mut ValidationResult) {
        let fusion = &config.fusion;

        if fusion.quorum < MIN_STATIONS {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "fusion.quorum".to_string(),
                value: fusion.quorum.to_string(),
                reason: format!("a 2-D fix needs at least {} stations", MIN_STATIONS),
            });
        }
        if fusion.quorum > config.stations.len() {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "fusion.quorum".to_string(),
                value: fusion.quorum.to_string(),
                reason: format!("only {} stations are deployed", config.stations.len()),
            });
        }
        if fusion.cycle_timeout_ms == 0 {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "fusion.cycle_timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !(fusion.min_geometry_conditioning > 0.0 && fusion.min_geometry_conditioning < 1.0) {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "fusion.min_geometry_conditioning".to_string(),
                value: fusion.min_geometry_conditioning.to_string(),
                reason: "must lie strictly between 0 and 1".to_string(),
            });
        }
        if fusion.receive_timeout_ms > fusion.cycle_timeout_ms {
            result.warnings.push(format!(
                "Receive timeout {} ms exceeds cycle timeout {} ms",
                fusion.receive_timeout_ms, fusion.cycle_timeout_ms
            ));
        }

        // A report held this long misses the cycle its beacon opened
        for (label, entry) in &config.stations {
            if let Some(delay) = entry.report_delay_ms {
                if delay >= fusion.cycle_timeout_ms {
                    result.warnings.push(format!(
                        "Station {} report delay {} ms is not below cycle timeout {} ms",
                        label, delay, fusion.cycle_timeout_ms
                    ));
                    result.suggestions.push(format!(
                        "Drop report_delay_ms for {} to use the default stagger",
                        label
                    ));
                }
            }
        }
    }

    fn validate_beacon(beacon: &BeaconConfig, result: &mut ValidationResult) {
        if beacon.device_id.trim().is_empty() {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "beacon.device_id".to_string(),
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }
        if beacon.interval_ms == 0 {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "beacon.interval_ms".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
    }

    fn validate_sink(sink: &SinkConfig, result: &mut ValidationResult) {
        if sink.max_attempts == 0 {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "sink.max_attempts".to_string(),
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        if sink.queue_capacity == 0 {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "sink.queue_capacity".to_string(),
                value: "0".to_string(),
                reason: "queue must hold at least one delivery".to_string(),
            });
        }
    }
}

/// Whether every station lies near the line through the two farthest apart
fn is_collinear(points: &[Point2]) -> bool {
    let mut farthest = (0, 0, 0.0);
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let d = points[i].distance_to(&points[j]);
            if d > farthest.2 {
                farthest = (i, j, d);
            }
        }
    }

    let (i, j, baseline) = farthest;
    if baseline <= 0.0 {
        return true;
    }

    let (a, b) = (points[i], points[j]);
    points.iter().all(|p| {
        // Perpendicular offset relative to the baseline length
        let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        (cross / baseline).abs() / baseline < COLLINEARITY_WARNING_THRESHOLD
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DEPLOYMENT: &str = r#"{
        "stations": {
            "MASTER":  { "x": 0.0,  "y": 0.0, "coordinator": true },
            "ANCHOR_2": { "x": 10.0, "y": 0.0 },
            "anchor_3": { "x": 5.0,  "y": 8.66, "report_delay_ms": 750 }
        },
        "calibration": { "rssi_at_1m": -45.0, "path_loss_exponent": 3.0 }
    }"#;

    fn deployment() -> DeploymentConfig {
        serde_json::from_str(DEPLOYMENT).unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let manager = ConfigurationManager::from_json_str(DEPLOYMENT).unwrap();
        assert_eq!(manager.fusion().quorum, 3);
        assert_eq!(manager.fusion().cycle_timeout(), Duration::from_secs(10));
        assert_eq!(manager.sink().max_attempts, 3);
        assert_eq!(manager.beacon().interval(), Duration::from_secs(2));
        assert!(manager.warnings().is_empty());
    }

    #[test]
    fn test_station_table() {
        let manager = ConfigurationManager::from_json_str(DEPLOYMENT).unwrap();
        let stations = manager.stations();
        assert_eq!(stations.len(), 3);

        let coordinator = manager.coordinator().unwrap();
        assert_eq!(coordinator.id, StationId::new("MASTER"));
        assert_eq!(coordinator.position, Point2::new(0.0, 0.0));

        let third = manager.station(&StationId::new("ANCHOR_3")).unwrap();
        assert!(!third.is_coordinator);
        assert_eq!(third.position, Point2::new(5.0, 8.66));
    }

    #[test]
    fn test_report_delay_stagger() {
        let manager = ConfigurationManager::from_json_str(DEPLOYMENT).unwrap();
        assert_eq!(
            manager.report_delay(&StationId::new("ANCHOR_2")),
            Duration::from_millis(500)
        );
        assert_eq!(
            manager.report_delay(&StationId::new("ANCHOR_3")),
            Duration::from_millis(750)
        );
    }

    #[test]
    fn test_report_delay_ranks_normalized_labels() {
        let manager = ConfigurationManager::from_json_str(
            r#"{
                "stations": {
                    "MASTER":    { "x": 0.0,  "y": 0.0, "coordinator": true },
                    "STATION_C": { "x": 5.0,  "y": 8.66 },
                    "station_b": { "x": 10.0, "y": 0.0 }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(
            manager.report_delay(&StationId::new("STATION_B")),
            Duration::from_millis(500)
        );
        assert_eq!(
            manager.report_delay(&StationId::new("STATION_C")),
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn test_zero_beacon_interval_is_fatal() {
        let mut config = deployment();
        config.beacon.interval_ms = 0;

        let validation = ConfigurationManager::validate(&config);
        assert!(!validation.is_valid);
        assert!(validation.errors.iter().any(|e| matches!(
            e,
            ConfigError::InvalidParameter { parameter, .. } if parameter == "beacon.interval_ms"
        )));

        let json = DEPLOYMENT.replacen(
            r#""calibration""#,
            r#""beacon": { "interval_ms": 0 }, "calibration""#,
            1,
        );
        assert!(ConfigurationManager::from_json_str(&json).is_err());
    }

    #[test]
    fn test_report_delay_beyond_cycle_timeout_warns() {
        let mut config = deployment();
        config.stations.get_mut("anchor_3").unwrap().report_delay_ms = Some(u64::MAX);

        let validation = ConfigurationManager::validate(&config);
        assert!(validation.is_valid);
        assert!(validation.warnings.iter().any(|w| w.contains("anchor_3")));

        config.stations.get_mut("anchor_3").unwrap().report_delay_ms = Some(10_000);
        let validation = ConfigurationManager::validate(&config);
        assert_eq!(validation.warnings.len(), 1);

        config.stations.get_mut("anchor_3").unwrap().report_delay_ms = Some(9_999);
        assert!(ConfigurationManager::validate(&config).warnings.is_empty());
    }

    #[test]
    fn test_too_few_stations_is_fatal() {
        let mut config = deployment();
        config.stations.remove("anchor_3");
        config.fusion.quorum = 2;

        let validation = ConfigurationManager::validate(&config);
        assert!(!validation.is_valid);
        assert!(validation.errors.iter().any(|e| matches!(
            e,
            ConfigError::InvalidParameter { parameter, .. } if parameter == "stations"
        )));
        assert!(ConfigurationManager::new(config).is_err());
    }

    #[test]
    fn test_coordinator_count_is_enforced() {
        let mut config = deployment();
        config.stations.get_mut("ANCHOR_2").unwrap().coordinator = true;
        assert!(!ConfigurationManager::validate(&config).is_valid);

        for entry in config.stations.values_mut() {
            entry.coordinator = false;
        }
        assert!(!ConfigurationManager::validate(&config).is_valid);
    }

    #[test]
    fn test_quorum_bounds() {
        let mut config = deployment();
        config.fusion.quorum = 4;
        assert!(!ConfigurationManager::validate(&config).is_valid);

        config.fusion.quorum = 2;
        assert!(!ConfigurationManager::validate(&config).is_valid);
    }

    #[test]
    fn test_calibration_checks() {
        let mut config = deployment();
        config.calibration.rssi_at_1m = 3.0;
        assert!(!ConfigurationManager::validate(&config).is_valid);

        let mut config = deployment();
        config.calibration.path_loss_exponent = 0.0;
        assert!(!ConfigurationManager::validate(&config).is_valid);

        let mut config = deployment();
        config.calibration.path_loss_exponent = 5.5;
        let validation = ConfigurationManager::validate(&config);
        assert!(validation.is_valid);
        assert_eq!(validation.warnings.len(), 1);
        assert!(!validation.suggestions.is_empty());
    }

    #[test]
    fn test_collinear_layout_warns() {
        let mut config = deployment();
        config.stations.get_mut("anchor_3").unwrap().x = 20.0;
        config.stations.get_mut("anchor_3").unwrap().y = 0.0;

        let validation = ConfigurationManager::validate(&config);
        assert!(validation.is_valid);
        assert!(validation.warnings.iter().any(|w| w.contains("collinear")));
    }

    #[test]
    fn test_duplicate_labels_after_normalization() {
        let mut config = deployment();
        config.stations.insert(
            "master".to_string(),
            StationConfig {
                x: 3.0,
                y: 3.0,
                coordinator: false,
                report_delay_ms: None,
            },
        );
        assert!(!ConfigurationManager::validate(&config).is_valid);
    }

    #[test]
    fn test_non_finite_position_is_fatal() {
        let mut config = deployment();
        config.stations.get_mut("ANCHOR_2").unwrap().x = f64::NAN;
        assert!(!ConfigurationManager::validate(&config).is_valid);
    }

    #[test]
    fn test_file_round_trip() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(DEPLOYMENT.as_bytes()).unwrap();

        let mut manager = ConfigurationManager::from_file(file.path()).unwrap();
        assert!(manager.config_file_path().is_some());

        let copy = NamedTempFile::new().unwrap();
        manager.save_to_file(copy.path()).unwrap();
        let reloaded = ConfigurationManager::from_file(copy.path()).unwrap();
        assert_eq!(reloaded.config(), manager.config());
    }

    #[test]
    fn test_missing_file_and_bad_json() {
        assert!(matches!(
            ConfigurationManager::from_file("/nonexistent/deployment.json"),
            Err(ConfigError::IoError { .. })
        ));
        assert!(matches!(
            ConfigurationManager::from_json_str("{ not json"),
            Err(ConfigError::SerializationError { .. })
        ));
    }
}

//! Position output formatting
//!
//! The JSON form is the sink payload consumed downstream:
//! `{device_id, x, y, mean_rssi, emergency_flag}`.

use crate::core::PositionEstimate;
use crate::fusion::SolveFailure;
use serde::Serialize;
use std::fmt::Write as _;

/// Wire payload for a delivered fix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionPayload<'a> {
    pub device_id: Option<&'a str>,
    pub x: f64,
    pub y: f64,
    pub mean_rssi: f64,
    pub emergency_flag: bool,
}

impl<'a> From<&'a PositionEstimate> for PositionPayload<'a> {
    fn from(estimate: &'a PositionEstimate) -> Self {
        Self {
            device_id: estimate.device_id.as_deref(),
            x: estimate.x,
            y: estimate.y,
            mean_rssi: estimate.mean_rssi,
            emergency_flag: estimate.emergency,
        }
    }
}

/// Payload for a cycle that completed without a fix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailurePayload<'a> {
    pub device_id: Option<&'a str>,
    pub emergency_flag: bool,
    pub stations: Vec<&'a str>,
    pub error: String,
}

impl<'a> From<&'a SolveFailure> for FailurePayload<'a> {
    fn from(failure: &'a SolveFailure) -> Self {
        Self {
            device_id: failure.device_id.as_deref(),
            emergency_flag: failure.emergency,
            stations: failure
                .contributing_stations
                .iter()
                .map(|station| station.as_str())
                .collect(),
            error: failure.error.to_string(),
        }
    }
}

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// One human-readable line
    Text,
    /// Comma-separated rows
    Csv,
}

impl OutputFormat {
    pub fn format_estimate(&self, estimate: &PositionEstimate) -> Result<String, serde_json::Error> {
        match self {
            OutputFormat::Json => JsonFormatter::new().format_estimate(estimate),
            OutputFormat::Text => Ok(TextFormatter::new().format_estimate(estimate)),
            OutputFormat::Csv => Ok(CsvFormatter::new().format_estimate(estimate)),
        }
    }

    pub fn format_failure(&self, failure: &SolveFailure) -> Result<String, serde_json::Error> {
        match self {
            OutputFormat::Json => JsonFormatter::new().format_failure(failure),
            OutputFormat::Text => Ok(TextFormatter::new().format_failure(failure)),
            OutputFormat::Csv => Ok(CsvFormatter::new().format_failure(failure)),
        }
    }
}

/// Human-readable one-line summaries
#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    /// List contributing stations
    pub include_stations: bool,
}

impl TextFormatter {
    pub fn new() -> Self {
        Self {
            include_stations: true,
        }
    }

    pub fn compact() -> Self {
        Self::default()
    }

    pub fn format_estimate(&self, estimate: &PositionEstimate) -> String {
        let mut output = String::new();
        if estimate.emergency {
            output.push_str("SOS ");
        }
        let _ = write!(
            output,
            "{} at ({:.2}, {:.2}) m, mean {:.1} dBm",
            estimate.device_id.as_deref().unwrap_or("unknown device"),
            estimate.x,
            estimate.y,
            estimate.mean_rssi
        );
        if self.include_stations {
            let stations: Vec<&str> = estimate
                .contributing_stations
                .iter()
                .map(|s| s.as_str())
                .collect();
            let _ = write!(output, " [{}]", stations.join(", "));
        }
        output
    }

    pub fn format_failure(&self, failure: &SolveFailure) -> String {
        let mut output = String::new();
        if failure.emergency {
            output.push_str("SOS ");
        }
        let _ = write!(
            output,
            "{}: no fix ({})",
            failure.device_id.as_deref().unwrap_or("unknown device"),
            failure.error
        );
        output
    }
}

/// JSON formatter for the sink payload
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn format_estimate(&self, estimate: &PositionEstimate) -> Result<String, serde_json::Error> {
        self.to_string(&PositionPayload::from(estimate))
    }

    pub fn format_failure(&self, failure: &SolveFailure) -> Result<String, serde_json::Error> {
        self.to_string(&FailurePayload::from(failure))
    }

    fn to_string<T: Serialize>(&self, value: &T) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }
}

/// CSV formatter for data logging
#[derive(Debug, Clone, Default)]
pub struct CsvFormatter;

impl CsvFormatter {
    pub fn new() -> Self {
        CsvFormatter
    }

    pub fn header(&self) -> &'static str {
        "device_id,x,y,mean_rssi,emergency_flag,stations,error"
    }

    pub fn format_estimate(&self, estimate: &PositionEstimate) -> String {
        let stations: Vec<&str> = estimate
            .contributing_stations
            .iter()
            .map(|s| s.as_str())
            .collect();
        format!(
            "{},{:.3},{:.3},{:.2},{},{},",
            estimate.device_id.as_deref().unwrap_or(""),
            estimate.x,
            estimate.y,
            estimate.mean_rssi,
            estimate.emergency,
            stations.join(";")
        )
    }

    pub fn format_failure(&self, failure: &SolveFailure) -> String {
        let stations: Vec<&str> = failure
            .contributing_stations
            .iter()
            .map(|s| s.as_str())
            .collect();
        format!(
            "{},,,,{},{},\"{}\"",
            failure.device_id.as_deref().unwrap_or(""),
            failure.emergency,
            stations.join(";"),
            failure.error.to_string().replace('"', "'")
        )
    }
}

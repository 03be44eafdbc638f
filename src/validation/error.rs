//! Why a position fix could not be produced

use crate::core::StationId;
use serde::Serialize;
use thiserror::Error;

/// Kind of degenerate station layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GeometryIssue {
    /// Stations on (or very near) one line
    Collinear,
    /// Two or more stations at the same position
    Coincident,
}

/// Failure reasons for readings and solves
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum FixError {
    #[error("Insufficient stations: {available} available, {required} required")]
    InsufficientStations { available: usize, required: usize },

    #[error("Degenerate station geometry ({issue:?}): measure {measure:.3e} below {threshold:.3e}")]
    DegenerateGeometry {
        issue: GeometryIssue,
        measure: f64,
        threshold: f64,
    },

    #[error("Invalid measurement from {station}: {rssi} dBm")]
    InvalidMeasurement { station: StationId, rssi: i32 },

    #[error("Unknown station {station}")]
    UnknownStation { station: StationId },

    #[error("Invalid range {distance} m for station {station}")]
    InvalidRange { station: StationId, distance: f64 },

    #[error("Solver produced a non-finite position")]
    NonFiniteSolution,
}

pub type FixResult<T> = Result<T, FixError>;

impl FixError {
    /// Failures caused by the deployment layout rather than by one reading
    pub fn is_geometry_failure(&self) -> bool {
        matches!(
            self,
            FixError::DegenerateGeometry { .. } | FixError::NonFiniteSolution
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = FixError::InvalidMeasurement {
            station: StationId::new("ANCHOR_2"),
            rssi: 0,
        };
        assert_eq!(err.to_string(), "Invalid measurement from ANCHOR_2: 0 dBm");

        let err = FixError::InsufficientStations { available: 2, required: 3 };
        assert_eq!(err.to_string(), "Insufficient stations: 2 available, 3 required");
    }

    #[test]
    fn test_geometry_classification() {
        let degenerate = FixError::DegenerateGeometry {
            issue: GeometryIssue::Collinear,
            measure: 0.0,
            threshold: 1e-3,
        };
        assert!(degenerate.is_geometry_failure());
        assert!(!FixError::UnknownStation { station: "X".into() }.is_geometry_failure());
    }
}

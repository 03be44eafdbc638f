//! Turns a completed cycle into a position estimate

use crate::algorithms::{RangeObservation, Trilateration};
use crate::core::{CalibrationParams, Point2, PositionEstimate, Station, StationId};
use crate::fusion::cycle::Cycle;
use crate::processing::PathLossModel;
use crate::validation::{FixError, FixResult};
use serde::Serialize;
use std::collections::HashMap;

/// A completed cycle whose solve failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveFailure {
    pub device_id: Option<String>,
    pub emergency: bool,
    pub contributing_stations: Vec<StationId>,
    pub error: FixError,
}

/// Applies the distance model and the solver to completed cycles
#[derive(Debug, Clone)]
pub struct PositionEstimator {
    model: PathLossModel,
    solver: Trilateration,
    positions: HashMap<StationId, Point2>,
}

impl PositionEstimator {
    pub fn new(stations: &[Station], calibration: CalibrationParams, solver: Trilateration) -> Self {
        Self {
            model: PathLossModel::new(calibration),
            solver,
            positions: stations
                .iter()
                .map(|station| (station.id.clone(), station.position))
                .collect(),
        }
    }

    pub fn model(&self) -> &PathLossModel {
        &self.model
    }

    /// Solve one cycle
    pub fn estimate(&self, cycle: &Cycle) -> Result<PositionEstimate, SolveFailure> {
        self.solve(cycle).map_err(|error| SolveFailure {
            device_id: cycle.device_id().map(str::to_string),
            emergency: cycle.emergency(),
            contributing_stations: cycle.readings().keys().cloned().collect(),
            error,
        })
    }

    fn solve(&self, cycle: &Cycle) -> FixResult<PositionEstimate> {
        let observations = cycle
            .readings()
            .iter()
            .map(|(station, &rssi)| {
                let position = *self
                    .positions
                    .get(station)
                    .ok_or_else(|| FixError::UnknownStation {
                        station: station.clone(),
                    })?;
                let distance = self.model.distance(rssi as f64);
                log::trace!("{}: {} dBm -> {:.2} m", station, rssi, distance);
                Ok(RangeObservation {
                    station: station.clone(),
                    position,
                    distance,
                })
            })
            .collect::<FixResult<Vec<_>>>()?;

        let solution = self.solver.solve(&observations)?;
        log::debug!(
            "fix ({:.2}, {:.2}) residual {:.2} m, conditioning {:.3}",
            solution.position.x,
            solution.position.y,
            solution.residual_rms,
            solution.geometry_conditioning
        );

        Ok(PositionEstimate {
            device_id: cycle.device_id().map(str::to_string),
            x: solution.position.x,
            y: solution.position.y,
            contributing_stations: observations.into_iter().map(|obs| obs.station).collect(),
            mean_rssi: cycle.mean_rssi(),
            emergency: cycle.emergency(),
        })
    }
}

//! Log-distance path loss model

use crate::core::CalibrationParams;

/// Converts RSSI readings to estimated distances:
///
/// `d = 10 ^ ((rssi_at_1m - rssi) / (10 * n))`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathLossModel {
    calibration: CalibrationParams,
}

impl PathLossModel {
    pub fn new(calibration: CalibrationParams) -> Self {
        Self { calibration }
    }

    pub fn calibration(&self) -> &CalibrationParams {
        &self.calibration
    }

    /// Estimated distance in meters for a reading in dBm.
    /// Callers must have rejected non-negative readings already.
    pub fn distance(&self, rssi: f64) -> f64 {
        let exponent = (self.calibration.rssi_at_1m - rssi)
            / (10.0 * self.calibration.path_loss_exponent);
        10f64.powf(exponent)
    }

    /// Inverse of [`distance`](Self::distance), handy for simulation
    pub fn expected_rssi(&self, distance_m: f64) -> f64 {
        self.calibration.rssi_at_1m
            - 10.0 * self.calibration.path_loss_exponent * distance_m.log10()
    }
}

impl Default for PathLossModel {
    fn default() -> Self {
        Self::new(CalibrationParams::default())
    }
}

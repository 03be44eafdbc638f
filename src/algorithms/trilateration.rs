//! 2-D trilateration / multilateration from range estimates
//!
//! Each station contributes a circle `(x - xi)² + (y - yi)² = di²`. Subtracting
//! the reference station's circle from every other circle cancels the
//! quadratic terms and leaves a linear system `A [x y]ᵀ = b` with one row per
//! non-reference station:
//!
//! ```text
//! 2 (xi - x0) x + 2 (yi - y0) y = d0² - di² + xi² - x0² + yi² - y0²
//! ```
//!
//! Three stations give a square 2×2 system solved directly; more stations
//! are solved in the least-squares sense.

use crate::core::{Point2, StationId, DEFAULT_MIN_GEOMETRY_CONDITIONING, MIN_STATIONS};
use crate::validation::{FixError, FixResult, GeometryIssue};
use nalgebra::{DMatrix, DVector, Matrix2, Vector2};

/// Stations closer than this (meters) share a position
const COINCIDENT_DISTANCE: f64 = 1e-9;

/// Singular values below this are treated as zero by the SVD solve
const SVD_EPSILON: f64 = 1e-12;

/// Station position paired with its estimated range
#[derive(Debug, Clone, PartialEq)]
pub struct RangeObservation {
    pub station: StationId,
    pub position: Point2,
    pub distance: f64,
}

/// Solved position with quality diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct TrilaterationSolution {
    pub position: Point2,
    /// RMS of `|p - si| - di` over all observations (meters)
    pub residual_rms: f64,
    /// Reciprocal condition number of the row-normalized system (0..1]
    pub geometry_conditioning: f64,
}

/// Linearized least-squares trilateration
#[derive(Debug, Clone)]
pub struct Trilateration {
    /// Systems whose row-normalized reciprocal condition number falls below
    /// this are rejected as degenerate.
    pub min_geometry_conditioning: f64,
}

impl Default for Trilateration {
    fn default() -> Self {
        Self {
            min_geometry_conditioning: DEFAULT_MIN_GEOMETRY_CONDITIONING,
        }
    }
}

impl Trilateration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_geometry_conditioning(threshold: f64) -> Self {
        Self {
            min_geometry_conditioning: threshold,
        }
    }

    /// Solve for the transmitter position
    pub fn solve(&self, observations: &[RangeObservation]) -> FixResult<TrilaterationSolution> {
        if observations.len() < MIN_STATIONS {
            return Err(FixError::InsufficientStations {
                available: observations.len(),
                required: MIN_STATIONS,
            });
        }

        for obs in observations {
            if !obs.distance.is_finite() || obs.distance < 0.0 {
                return Err(FixError::InvalidRange {
                    station: obs.station.clone(),
                    distance: obs.distance,
                });
            }
        }

        Self::check_coincident(observations)?;

        // The closest station linearizes best: its circle carries the
        // smallest absolute range error.
        let reference_index = observations
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.distance.total_cmp(&b.distance))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let reference = &observations[reference_index];

        let (rows, rhs) = Self::linearize(reference, observations, reference_index);

        let conditioning = Self::geometry_conditioning(&rows);
        if conditioning < self.min_geometry_conditioning {
            return Err(FixError::DegenerateGeometry {
                issue: GeometryIssue::Collinear,
                measure: conditioning,
                threshold: self.min_geometry_conditioning,
            });
        }

        let solution = if rows.len() == 2 {
            Self::solve_exact(&rows, &rhs, conditioning, self.min_geometry_conditioning)?
        } else {
            Self::solve_least_squares(&rows, &rhs)?
        };

        let position = Point2::new(solution.x, solution.y);
        if !position.is_finite() {
            return Err(FixError::NonFiniteSolution);
        }

        Ok(TrilaterationSolution {
            position,
            residual_rms: Self::residual_rms(&position, observations),
            geometry_conditioning: conditioning,
        })
    }

    /// Subtract the reference circle from every other circle
    fn linearize(
        reference: &RangeObservation,
        observations: &[RangeObservation],
        reference_index: usize,
    ) -> (Vec<Vector2<f64>>, Vec<f64>) {
        let p0 = reference.position;
        let d0 = reference.distance;

        let mut rows = Vec::with_capacity(observations.len() - 1);
        let mut rhs = Vec::with_capacity(observations.len() - 1);

        for (i, obs) in observations.iter().enumerate() {
            if i == reference_index {
                continue;
            }
            let pi = obs.position;
            rows.push(Vector2::new(2.0 * (pi.x - p0.x), 2.0 * (pi.y - p0.y)));
            rhs.push(
                d0.powi(2) - obs.distance.powi(2) + pi.x.powi(2) - p0.x.powi(2) + pi.y.powi(2)
                    - p0.y.powi(2),
            );
        }

        (rows, rhs)
    }

    /// Any two stations at one position, whichever of them is the reference
    fn check_coincident(observations: &[RangeObservation]) -> FixResult<()> {
        for (i, a) in observations.iter().enumerate() {
            for b in &observations[i + 1..] {
                let separation = a.position.distance_to(&b.position);
                if separation < COINCIDENT_DISTANCE {
                    return Err(FixError::DegenerateGeometry {
                        issue: GeometryIssue::Coincident,
                        measure: separation,
                        threshold: COINCIDENT_DISTANCE,
                    });
                }
            }
        }
        Ok(())
    }

    /// Reciprocal condition number of the system with every row scaled to
    /// unit length. Scaling removes the effect of station spacing so the
    /// measure reflects only angular spread: 0 for collinear stations.
    fn geometry_conditioning(rows: &[Vector2<f64>]) -> f64 {
        let mut gram = Matrix2::zeros();
        for row in rows {
            let unit = row / row.norm();
            gram += unit * unit.transpose();
        }

        // Closed-form eigenvalues of the symmetric 2×2 Gram matrix
        let (a, b, c) = (gram[(0, 0)], gram[(0, 1)], gram[(1, 1)]);
        let half_trace = (a + c) / 2.0;
        let spread = (((a - c) / 2.0).powi(2) + b * b).sqrt();
        let lambda_max = half_trace + spread;
        let lambda_min = (half_trace - spread).max(0.0);

        if lambda_max <= 0.0 {
            return 0.0;
        }
        (lambda_min / lambda_max).sqrt()
    }

    /// Exactly three stations: square system
    fn solve_exact(
        rows: &[Vector2<f64>],
        rhs: &[f64],
        conditioning: f64,
        threshold: f64,
    ) -> FixResult<Vector2<f64>> {
        let a = Matrix2::new(rows[0].x, rows[0].y, rows[1].x, rows[1].y);
        let b = Vector2::new(rhs[0], rhs[1]);

        let inverse = a.try_inverse().ok_or(FixError::DegenerateGeometry {
            issue: GeometryIssue::Collinear,
            measure: conditioning,
            threshold,
        })?;
        Ok(inverse * b)
    }

    /// Four or more stations: least squares via SVD
    fn solve_least_squares(rows: &[Vector2<f64>], rhs: &[f64]) -> FixResult<Vector2<f64>> {
        let a = DMatrix::from_fn(rows.len(), 2, |r, c| rows[r][c]);
        let b = DVector::from_column_slice(rhs);

        let solution = a
            .svd(true, true)
            .solve(&b, SVD_EPSILON)
            .map_err(|_| FixError::NonFiniteSolution)?;

        Ok(Vector2::new(solution[0], solution[1]))
    }

    fn residual_rms(position: &Point2, observations: &[RangeObservation]) -> f64 {
        let sum_sq: f64 = observations
            .iter()
            .map(|obs| (position.distance_to(&obs.position) - obs.distance).powi(2))
            .sum();
        (sum_sq / observations.len() as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observe(id: &str, x: f64, y: f64, target: Point2) -> RangeObservation {
        let position = Point2::new(x, y);
        RangeObservation {
            station: StationId::new(id),
            position,
            distance: position.distance_to(&target),
        }
    }

    fn obs(id: &str, x: f64, y: f64, distance: f64) -> RangeObservation {
        RangeObservation {
            station: StationId::new(id),
            position: Point2::new(x, y),
            distance,
        }
    }

    #[test]
    fn test_three_station_round_trip() {
        let observations = vec![
            obs("A", 0.0, 0.0, 13f64.sqrt()),
            obs("B", 10.0, 0.0, 53f64.sqrt()),
            obs("C", 5.0, 8.66, 48.3556f64.sqrt()),
        ];

        let solution = Trilateration::new().solve(&observations).unwrap();
        assert!((solution.position.x - 3.0).abs() < 0.01);
        assert!((solution.position.y - 2.0).abs() < 0.01);
        assert!(solution.residual_rms < 0.01);
    }

    #[test]
    fn test_rounded_ranges_still_within_tolerance() {
        let observations = vec![
            obs("A", 0.0, 0.0, 3.6056),
            obs("B", 10.0, 0.0, 7.2801),
            obs("C", 5.0, 8.66, 6.9540),
        ];

        let solution = Trilateration::new().solve(&observations).unwrap();
        assert!((solution.position.x - 3.0).abs() < 0.01);
        assert!((solution.position.y - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_overdetermined_least_squares() {
        let target = Point2::new(12.5, -4.0);
        let observations = vec![
            observe("A", 0.0, 0.0, target),
            observe("B", 30.0, 0.0, target),
            observe("C", 30.0, 25.0, target),
            observe("D", 0.0, 25.0, target),
            observe("E", 15.0, -20.0, target),
        ];

        let solution = Trilateration::new().solve(&observations).unwrap();
        assert!(solution.position.distance_to(&target) < 1e-6);
    }

    #[test]
    fn test_overdetermined_with_noise_is_close() {
        let target = Point2::new(20.0, 15.0);
        let mut observations = vec![
            observe("A", 0.0, 0.0, target),
            observe("B", 50.0, 0.0, target),
            observe("C", 50.0, 40.0, target),
            observe("D", 0.0, 40.0, target),
        ];
        observations[0].distance += 0.3;
        observations[2].distance -= 0.2;

        let solution = Trilateration::new().solve(&observations).unwrap();
        assert!(solution.position.distance_to(&target) < 1.0);
        assert!(solution.residual_rms > 0.0);
    }

    #[test]
    fn test_collinear_stations_fail() {
        let observations = vec![
            obs("A", 0.0, 0.0, 4.0),
            obs("B", 5.0, 0.0, 3.0),
            obs("C", 10.0, 0.0, 7.0),
        ];

        let result = Trilateration::new().solve(&observations);
        assert!(matches!(
            result,
            Err(FixError::DegenerateGeometry {
                issue: GeometryIssue::Collinear,
                ..
            })
        ));
    }

    #[test]
    fn test_nearly_collinear_stations_fail() {
        let observations = vec![
            obs("A", 0.0, 0.0, 4.0),
            obs("B", 5.0, 0.0005, 3.0),
            obs("C", 10.0, 0.0, 7.0),
        ];
        assert!(matches!(
            Trilateration::new().solve(&observations),
            Err(FixError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_collinear_overdetermined_fails() {
        let observations = vec![
            obs("A", 0.0, 0.0, 4.0),
            obs("B", 5.0, 5.0, 3.0),
            obs("C", 10.0, 10.0, 7.0),
            obs("D", 20.0, 20.0, 9.0),
        ];
        assert!(matches!(
            Trilateration::new().solve(&observations),
            Err(FixError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_coincident_stations_fail() {
        let observations = vec![
            obs("A", 0.0, 0.0, 1.0),
            obs("B", 0.0, 0.0, 2.0),
            obs("C", 10.0, 0.0, 7.0),
        ];
        assert!(matches!(
            Trilateration::new().solve(&observations),
            Err(FixError::DegenerateGeometry {
                issue: GeometryIssue::Coincident,
                ..
            })
        ));
    }

    #[test]
    fn test_coincident_pair_fails_regardless_of_reference() {
        // C and D share a position. Near (3, 2) A is the reference; near
        // (5, 8) C is.
        for target in [Point2::new(3.0, 2.0), Point2::new(5.0, 8.0)] {
            let mut observations = vec![
                observe("A", 0.0, 0.0, target),
                observe("B", 10.0, 0.0, target),
                observe("C", 5.0, 8.66, target),
                observe("D", 5.0, 8.66, target),
            ];
            observations[3].distance += 0.5;

            assert!(matches!(
                Trilateration::new().solve(&observations),
                Err(FixError::DegenerateGeometry {
                    issue: GeometryIssue::Coincident,
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_insufficient_stations() {
        let observations = vec![obs("A", 0.0, 0.0, 1.0), obs("B", 10.0, 0.0, 9.0)];
        assert_eq!(
            Trilateration::new().solve(&observations),
            Err(FixError::InsufficientStations {
                available: 2,
                required: 3
            })
        );
    }

    #[test]
    fn test_invalid_range_rejected() {
        let observations = vec![
            obs("A", 0.0, 0.0, 1.0),
            obs("B", 10.0, 0.0, f64::NAN),
            obs("C", 5.0, 8.0, 7.0),
        ];
        assert!(matches!(
            Trilateration::new().solve(&observations),
            Err(FixError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_result_is_not_clamped() {
        // Target well outside the station triangle
        let target = Point2::new(-40.0, 75.0);
        let observations = vec![
            observe("A", 0.0, 0.0, target),
            observe("B", 10.0, 0.0, target),
            observe("C", 5.0, 8.66, target),
        ];
        let solution = Trilateration::new().solve(&observations).unwrap();
        assert!(solution.position.distance_to(&target) < 1e-6);
    }
}

//! Cycle aggregation and position estimation

pub mod aggregator;
pub mod cycle;
pub mod estimator;

pub use aggregator::{IngestOutcome, ReadingAggregator, ReadingSource};
pub use cycle::{Cycle, CycleState};
pub use estimator::{PositionEstimator, SolveFailure};

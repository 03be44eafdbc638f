//! RSSI Position Fusion
//!
//! Locates a wearable radio transmitter from received signal strength at
//! three or more fixed stations. Relays report what they hear to a
//! coordinator, which collects one reading per station per cycle, converts
//! each reading to a range with a log-distance path loss model, and solves
//! for the transmitter position by trilateration.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod fusion;
pub mod utils;
pub mod hardware;
pub mod api;
pub mod node;

// Re-export commonly used types
pub use core::{CalibrationParams, Point2, PositionEstimate, RawMeasurement, Station, StationId};
pub use algorithms::{RangeObservation, Trilateration, TrilaterationSolution};
pub use processing::{Message, MessageParser, ParseError, PathLossModel};
pub use validation::{FixError, FixResult, GeometryIssue, MeasurementValidator};
pub use fusion::{Cycle, CycleState, IngestOutcome, PositionEstimator, ReadingAggregator, ReadingSource, SolveFailure};
pub use utils::{ConfigError, ConfigurationManager, DeploymentConfig};
pub use hardware::{TransceiverInterface, TransceiverStatus, TransceiverConfig, RawMessage, CommError, CommResult};
pub use api::{Delivery, OutputFormat, PositionSink, SinkDispatcher, SinkError, WriterSink};
pub use node::{Beacon, Coordinator, NodeError, Relay, StationNode};

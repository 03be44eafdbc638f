//! Measurement validation and fix failure reasons

pub mod data;
pub mod error;

pub use data::MeasurementValidator;
pub use error::{FixError, FixResult, GeometryIssue};

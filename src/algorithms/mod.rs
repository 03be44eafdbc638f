//! Position solving

pub mod trilateration;

pub use trilateration::{RangeObservation, Trilateration, TrilaterationSolution};

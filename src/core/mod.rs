//! Core types and constants for the RSSI positioning system

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;

//! Frame decoding and signal processing

pub mod parser;
pub mod distance;

pub use parser::{Message, MessageParser, ParseError};
pub use distance::PathLossModel;

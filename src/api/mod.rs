//! Delivery of completed cycles to downstream consumers

pub mod dispatcher;
pub mod formatting;
pub mod sink;

pub use dispatcher::{Delivery, DispatchStats, SinkDispatcher};
pub use formatting::{CsvFormatter, JsonFormatter, OutputFormat, PositionPayload, TextFormatter};
pub use sink::{MemorySink, PositionSink, SinkError, SinkResult, WriterSink};

//! Position sinks: where completed cycles are delivered

use crate::api::formatting::OutputFormat;
use crate::core::PositionEstimate;
use crate::fusion::SolveFailure;
use std::io::Write;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Delivery errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("Sink I/O error: {message}")]
    Io { message: String },
    #[error("Payload serialization failed: {message}")]
    Serialization { message: String },
    #[error("Sink rejected delivery: {reason}")]
    Rejected { reason: String },
    #[error("Sink is closed")]
    Closed,
}

pub type SinkResult<T> = Result<T, SinkError>;

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        SinkError::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(e: serde_json::Error) -> Self {
        SinkError::Serialization {
            message: e.to_string(),
        }
    }
}

/// Receiver of completed cycles. Runs on the dispatcher's worker thread.
pub trait PositionSink: Send {
    /// Deliver a fix
    fn publish(&mut self, estimate: &PositionEstimate) -> SinkResult<()>;

    /// Told about a cycle that completed without a fix
    fn record_failure(&mut self, failure: &SolveFailure) -> SinkResult<()> {
        log::debug!("sink ignores failed cycle: {}", failure.error);
        Ok(())
    }
}

/// Writes one formatted line per delivery
pub struct WriterSink<W: Write + Send> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    /// JSON-lines output
    pub fn json_lines(writer: W) -> Self {
        Self::new(writer, OutputFormat::Json)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &str) -> SinkResult<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> PositionSink for WriterSink<W> {
    fn publish(&mut self, estimate: &PositionEstimate) -> SinkResult<()> {
        let line = self.format.format_estimate(estimate)?;
        self.write_line(&line)
    }

    fn record_failure(&mut self, failure: &SolveFailure) -> SinkResult<()> {
        let line = self.format.format_failure(failure)?;
        self.write_line(&line)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    estimates: Vec<PositionEstimate>,
    failures: Vec<SolveFailure>,
    attempts: u32,
    failing_publishes: u32,
}

/// In-memory sink with scripted failures. Clones share storage, so a test
/// can keep a handle after moving the sink into a dispatcher.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` publish attempts fail
    pub fn fail_next_publishes(&self, count: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_publishes = count;
        }
    }

    pub fn estimates(&self) -> Vec<PositionEstimate> {
        self.state
            .lock()
            .map(|state| state.estimates.clone())
            .unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<SolveFailure> {
        self.state
            .lock()
            .map(|state| state.failures.clone())
            .unwrap_or_default()
    }

    /// Publish attempts, including failed ones
    pub fn attempts(&self) -> u32 {
        self.state.lock().map(|state| state.attempts).unwrap_or(0)
    }
}

impl PositionSink for MemorySink {
    fn publish(&mut self, estimate: &PositionEstimate) -> SinkResult<()> {
        let mut state = self.state.lock().map_err(|_| SinkError::Closed)?;
        state.attempts += 1;
        if state.failing_publishes > 0 {
            state.failing_publishes -= 1;
            return Err(SinkError::Rejected {
                reason: "simulated failure".to_string(),
            });
        }
        state.estimates.push(estimate.clone());
        Ok(())
    }

    fn record_failure(&mut self, failure: &SolveFailure) -> SinkResult<()> {
        let mut state = self.state.lock().map_err(|_| SinkError::Closed)?;
        state.failures.push(failure.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StationId;
    use crate::validation::FixError;

    fn estimate() -> PositionEstimate {
        PositionEstimate {
            device_id: Some("DEV1".to_string()),
            x: 1.5,
            y: -2.0,
            contributing_stations: vec![StationId::new("A")],
            mean_rssi: -60.0,
            emergency: false,
        }
    }

    #[test]
    fn test_json_lines_output() {
        let mut sink = WriterSink::json_lines(Vec::new());
        sink.publish(&estimate()).unwrap();
        sink.publish(&estimate()).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"device_id":"DEV1","x":1.5,"y":-2.0,"mean_rssi":-60.0,"emergency_flag":false}"#
        );
    }

    #[test]
    fn test_writer_sink_records_failures() {
        let mut sink = WriterSink::new(Vec::new(), OutputFormat::Text);
        let failure = SolveFailure {
            device_id: Some("DEV1".to_string()),
            emergency: true,
            contributing_stations: vec![],
            error: FixError::NonFiniteSolution,
        };
        sink.record_failure(&failure).unwrap();
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.starts_with("SOS DEV1: no fix"));
    }

    #[test]
    fn test_memory_sink_scripted_failures() {
        let sink = MemorySink::new();
        let mut handle = sink.clone();
        sink.fail_next_publishes(1);

        assert!(handle.publish(&estimate()).is_err());
        assert!(handle.publish(&estimate()).is_ok());
        assert_eq!(sink.attempts(), 2);
        assert_eq!(sink.estimates().len(), 1);
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_io_errors_surface() {
        let mut sink = WriterSink::json_lines(BrokenWriter);
        assert!(matches!(sink.publish(&estimate()), Err(SinkError::Io { .. })));
    }
}

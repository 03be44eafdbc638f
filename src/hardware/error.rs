//! Communication error types and handling

use thiserror::Error;

/// Communication error types for radio transceivers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommError {
    /// Link to the transceiver failed or was lost
    #[error("Connection lost to transceiver {transceiver}")]
    ConnectionLost { transceiver: String },
    /// Timeout waiting for the link
    #[error("Communication timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// Frame could not be interpreted at the link level
    #[error("Invalid frame: {details}")]
    InvalidFrame { details: String },
    /// Transceiver reported a hardware fault
    #[error("Hardware error {code}: {description}")]
    HardwareError { code: u32, description: String },
    /// Transceiver configuration rejected
    #[error("Configuration error: invalid {parameter} = {value}")]
    ConfigurationError { parameter: String, value: String },
    /// Payload does not fit the link buffer
    #[error("Buffer error during {operation}: {size} bytes exceeds {limit}")]
    BufferError { operation: String, size: usize, limit: usize },
}

/// Result type for communication operations
pub type CommResult<T> = Result<T, CommError>;

/// Error recovery strategy for communication failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecoveryStrategy {
    /// Retry the operation immediately
    Retry,
    /// Wait and then retry
    RetryWithDelay { delay_ms: u32 },
    /// Skip this operation and continue
    Skip,
    /// Fail permanently
    Fail,
}

impl CommError {
    /// Get the recommended recovery strategy for this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            CommError::ConnectionLost { .. } => RecoveryStrategy::RetryWithDelay { delay_ms: 1000 },
            CommError::Timeout { .. } => RecoveryStrategy::RetryWithDelay { delay_ms: 100 },
            CommError::InvalidFrame { .. } => RecoveryStrategy::Skip,
            CommError::HardwareError { .. } => RecoveryStrategy::Retry,
            CommError::ConfigurationError { .. } => RecoveryStrategy::Fail,
            CommError::BufferError { .. } => RecoveryStrategy::Skip,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.recovery_strategy(), RecoveryStrategy::Fail)
    }
}

//! Station roles and their control loop
//!
//! Every role is driven the same way: poll the transport with a short bounded
//! wait, process what arrived, run time-based housekeeping, sleep briefly,
//! repeat until the stop flag is raised.

pub mod beacon;
pub mod coordinator;
pub mod relay;

pub use beacon::{Beacon, BeaconStats};
pub use coordinator::{Coordinator, CoordinatorStats};
pub use relay::{Relay, RelayStats};

use crate::api::SinkError;
use crate::core::StationId;
use crate::hardware::{CommError, CommResult, RecoveryStrategy, TransceiverStatus};
use crate::utils::ConfigError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Startup and fatal runtime errors for a station
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Comm(#[from] CommError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("Station {station} is not part of the deployment")]
    UnknownStation { station: StationId },
    #[error("Station {station} cannot run as {role}")]
    WrongRole { station: StationId, role: &'static str },
}

pub type NodeResult<T> = Result<T, NodeError>;

/// One iteration of a station loop
pub trait StationNode {
    /// Label used in logs
    fn name(&self) -> &str;

    /// Receive, process and run timers once. `now` drives every timer.
    fn poll_once(&mut self, now: Instant) -> CommResult<()>;

    fn is_connected(&self) -> bool;

    /// Counters of the underlying link
    fn link_status(&self) -> TransceiverStatus;

    fn poll_interval(&self) -> Duration;
}

/// Tracks link health between polls so a change is logged once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkMonitor {
    healthy: bool,
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self { healthy: true }
    }
}

impl LinkMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    /// Returns the new health when it differs from the last observation
    pub fn observe(&mut self, status: &TransceiverStatus) -> Option<bool> {
        let healthy = status.is_healthy();
        if healthy == self.healthy {
            return None;
        }
        self.healthy = healthy;
        Some(healthy)
    }
}

/// Drive a station until `stop` is raised or its link goes away for good.
///
/// Transport faults are absorbed here: they are logged at debug level and
/// the loop carries on.
pub fn run<N: StationNode + ?Sized>(node: &mut N, stop: &AtomicBool) -> CommResult<()> {
    log::info!("{} running", node.name());
    let mut monitor = LinkMonitor::new();

    while !stop.load(Ordering::Relaxed) {
        if let Err(e) = node.poll_once(Instant::now()) {
            if !node.is_connected() {
                log::info!("{}: link closed ({})", node.name(), e);
                return Err(e);
            }
            if !e.is_recoverable() {
                log::error!("{}: {}", node.name(), e);
                return Err(e);
            }
            match e.recovery_strategy() {
                RecoveryStrategy::RetryWithDelay { delay_ms } => {
                    log::debug!("{}: {}; retrying in {} ms", node.name(), e, delay_ms);
                    thread::sleep(Duration::from_millis(delay_ms as u64));
                }
                _ => log::debug!("{}: {}", node.name(), e),
            }
        }

        let status = node.link_status();
        match monitor.observe(&status) {
            Some(false) => log::warn!(
                "{}: link unhealthy ({} errors, connected: {})",
                node.name(),
                status.error_count,
                status.connected
            ),
            Some(true) => log::info!("{}: link healthy again", node.name()),
            None => {}
        }

        thread::sleep(node.poll_interval());
    }

    log::info!("{} stopped", node.name());
    Ok(())
}

//! Off-loop sink delivery
//!
//! The receive loop hands completed cycles to a bounded queue and moves on.
//! A worker thread owns the sink and retries each delivery a bounded number
//! of times before dropping it.

use crate::api::sink::{PositionSink, SinkError, SinkResult};
use crate::core::PositionEstimate;
use crate::fusion::SolveFailure;
use crate::utils::SinkConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One unit of work for the sink
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Estimate(PositionEstimate),
    Failure(SolveFailure),
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    retries: AtomicU64,
    dropped: AtomicU64,
}

/// Delivery counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub retries: u64,
    /// Deliveries lost to a full queue or exhausted retries
    pub dropped: u64,
}

/// Bounded-queue front of a sink worker thread
pub struct SinkDispatcher {
    sender: Option<SyncSender<Delivery>>,
    worker: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl SinkDispatcher {
    /// Start the worker thread
    pub fn spawn(sink: Box<dyn PositionSink>, config: &SinkConfig) -> SinkResult<Self> {
        let (sender, receiver) = mpsc::sync_channel(config.queue_capacity);
        let counters = Arc::new(Counters::default());

        let worker_counters = Arc::clone(&counters);
        let max_attempts = config.max_attempts.max(1);
        let retry_delay = config.retry_delay();

        let worker = thread::Builder::new()
            .name("position-sink".to_string())
            .spawn(move || {
                run_worker(sink, receiver, worker_counters, max_attempts, retry_delay)
            })
            .map_err(SinkError::from)?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            counters,
        })
    }

    /// Queue a delivery without blocking. Returns false if it was dropped.
    pub fn dispatch(&self, delivery: Delivery) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        match sender.try_send(delivery) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                log::error!("sink queue full, delivery dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                log::error!("sink worker gone, delivery dropped");
                false
            }
        }
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Close the queue, wait for queued deliveries to finish, and return the
    /// final counters.
    pub fn shutdown(mut self) -> DispatchStats {
        self.close();
        self.stats()
    }

    fn close(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("sink worker panicked");
            }
        }
    }
}

impl Drop for SinkDispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker(
    mut sink: Box<dyn PositionSink>,
    receiver: Receiver<Delivery>,
    counters: Arc<Counters>,
    max_attempts: u32,
    retry_delay: Duration,
) {
    for delivery in receiver {
        let mut attempt = 1;
        loop {
            let result = match &delivery {
                Delivery::Estimate(estimate) => sink.publish(estimate),
                Delivery::Failure(failure) => sink.record_failure(failure),
            };

            match result {
                Ok(()) => {
                    counters.delivered.fetch_add(1, Ordering::Relaxed);
                    break;
                }
                Err(e) if attempt < max_attempts => {
                    log::warn!("sink attempt {}/{} failed: {}", attempt, max_attempts, e);
                    counters.retries.fetch_add(1, Ordering::Relaxed);
                    attempt += 1;
                    thread::sleep(retry_delay);
                }
                Err(e) => {
                    log::error!("delivery dropped after {} attempts: {}", attempt, e);
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }
        }
    }
    log::debug!("sink worker stopped");
}

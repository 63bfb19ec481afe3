//! Runner: drives a worker until shutdown.

use crate::error::Result;
use crate::queue::Queue;
use crate::session::QueueSession;
use crate::worker::{RunOutcome, Worker};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info};

/// Configuration for the runner loop.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Sleep between runs when the queue is empty or the wait timed out.
    pub poll_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Calls [`Worker::run`] in a loop.
///
/// Shutdown is only observed between runs. A blocked `queue_wait` is never
/// interrupted, so a claim is always resolved before the loop exits.
pub struct Runner<Q, S> {
    worker: Worker<Q, S>,
    config: RunnerConfig,
    shutdown: Arc<Notify>,
}

/// Handle for stopping a [`Runner`] from another task.
#[derive(Clone)]
pub struct ShutdownHandle {
    shutdown: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

impl<Q: Queue, S: QueueSession> Runner<Q, S> {
    pub fn new(worker: Worker<Q, S>, config: RunnerConfig) -> Self {
        Self {
            worker,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// Process jobs until shutdown, then close the worker.
    ///
    /// Returns the number of jobs completed. Fails if the worker closes
    /// itself after an unrecoverable claim.
    pub async fn run(mut self) -> Result<u64> {
        info!(table = self.worker.table_name(), "runner started");
        let mut completed = 0u64;

        loop {
            let idle = match self.worker.run(false).await {
                Ok(RunOutcome::Completed(_)) => {
                    completed += 1;
                    false
                }
                Ok(RunOutcome::Idle | RunOutcome::TimedOut) => true,
                Err(e) if self.worker.is_closed() => {
                    error!(table = self.worker.table_name(), error = %e, "worker closed, runner stopping");
                    return Err(e);
                }
                Err(e) => {
                    error!(table = self.worker.table_name(), error = %e, "run error");
                    true
                }
            };

            let stop = if idle {
                tokio::select! {
                    _ = self.shutdown.notified() => true,
                    _ = tokio::time::sleep(self.config.poll_interval) => false,
                }
            } else {
                // Consume a pending shutdown without waiting.
                tokio::select! {
                    biased;
                    _ = self.shutdown.notified() => true,
                    _ = std::future::ready(()) => false,
                }
            };

            if stop {
                info!(table = self.worker.table_name(), completed, "runner shutting down");
                break;
            }
        }

        self.worker.shutdown().await?;
        Ok(completed)
    }
}

//! Worker pool running notification pipelines off the ingestion path.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::{Error, Result};

/// Configuration for the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Maximum number of runs executing at once (0 = unbounded).
    pub max_concurrent_runs: usize,
    /// How long `shutdown` waits for in-flight runs (0 = wait indefinitely).
    pub shutdown_timeout_secs: u64,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: 64,
            shutdown_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Default)]
struct PoolCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
    rejected: AtomicU64,
}

/// Snapshot of worker pool activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPoolStats {
    pub submitted: u64,
    pub completed: u64,
    pub panicked: u64,
    pub rejected: u64,
    /// Runs spawned and not yet finished, including those waiting for a slot.
    pub in_flight: usize,
}

/// Process-wide pool for notification runs.
///
/// Created once at startup and shut down explicitly; `submit` never waits for
/// the submitted work. Must be used from within a tokio runtime.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    permits: Option<Arc<Semaphore>>,
    tracker: TaskTracker,
    counters: Arc<PoolCounters>,
}

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig) -> Self {
        let permits = (config.max_concurrent_runs > 0)
            .then(|| Arc::new(Semaphore::new(config.max_concurrent_runs)));

        info!(
            max_concurrent_runs = config.max_concurrent_runs,
            "Worker pool started"
        );

        Self {
            config,
            permits,
            tracker: TaskTracker::new(),
            counters: Arc::new(PoolCounters::default()),
        }
    }

    /// Queue `work` and return immediately.
    ///
    /// Fails only when the pool has been shut down.
    pub fn submit<F>(&self, label: impl Into<String>, work: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let label = label.into();
        if self.tracker.is_closed() {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(task = %label, "Rejecting run submitted after shutdown");
            return Err(Error::Other("Worker pool is shut down".to_string()));
        }

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        let permits = self.permits.clone();
        let counters = self.counters.clone();

        self.tracker.spawn(async move {
            let _permit = match permits {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        warn!(task = %label, "Worker pool semaphore closed, dropping run");
                        return;
                    }
                },
                None => None,
            };

            debug!(task = %label, "Run started");
            match AssertUnwindSafe(work).catch_unwind().await {
                Ok(()) => {
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                    debug!(task = %label, "Run finished");
                }
                Err(_) => {
                    counters.panicked.fetch_add(1, Ordering::Relaxed);
                    error!(task = %label, "Run panicked");
                }
            }
        });

        Ok(())
    }

    pub fn stats(&self) -> WorkerPoolStats {
        WorkerPoolStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            in_flight: self.tracker.len(),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Stop accepting runs and wait for in-flight ones.
    ///
    /// Returns `false` if the timeout elapsed with runs still in flight.
    pub async fn shutdown(&self) -> bool {
        self.tracker.close();
        info!(in_flight = self.tracker.len(), "Worker pool shutting down");

        if self.config.shutdown_timeout_secs == 0 {
            self.tracker.wait().await;
            return true;
        }

        let timeout = Duration::from_secs(self.config.shutdown_timeout_secs);
        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => {
                info!("Worker pool drained");
                true
            }
            Err(_) => {
                warn!(
                    in_flight = self.tracker.len(),
                    "Worker pool shutdown timed out with runs still in flight"
                );
                false
            }
        }
    }
}

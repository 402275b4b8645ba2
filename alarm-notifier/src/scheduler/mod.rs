//! Scheduling of notification runs.
//!
//! The worker pool is an explicitly owned resource: the binary creates one at
//! startup, hands it to the notification service, and shuts it down on exit so
//! in-flight deliveries can finish.

mod pool;

pub use pool::{WorkerPool, WorkerPoolConfig, WorkerPoolStats};

//! Alarm push notification pipeline.
//!
//! Every stored machine status runs through the same stages:
//!
//! - `delta`: compare against the machine's previous status and gate the run
//! - `audience`: pick eligible company users and trim their alarm lists
//! - `composer`: render the title and per-recipient body
//! - `dispatch`: send one push per (user, device token) concurrently
//!
//! `NotificationService` validates the event synchronously and hands the rest
//! to the worker pool.
//!
//! # Example
//!
//! ```ignore
//! use alarm_notifier::notification::{NotificationService, NotificationServiceConfig, NotificationStores};
//!
//! let service = NotificationService::new(
//!     NotificationServiceConfig::default(),
//!     NotificationStores::sqlite(&pool),
//!     transport,
//!     worker_pool,
//! );
//! service.send_notifications(status).await?;
//! ```

pub mod audience;
pub mod composer;
pub mod delta;
pub mod dispatch;
pub mod service;
pub mod transport;

#[cfg(test)]
mod testing;

pub use audience::Recipient;
pub use composer::{MessageComposer, build_body, build_title};
pub use delta::AlarmDelta;
pub use dispatch::{DispatchEngine, DispatchReport};
pub use service::{
    NotificationService, NotificationServiceConfig, NotificationStores, RunOutcome, StatusRun,
};
pub use transport::{FcmConfig, FcmTransport, PushTransport, ServiceAccountKey};

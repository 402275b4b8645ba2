//! alarm-notifier library crate.
//!
//! Turns machine status events into push notifications for the users of the
//! machine's company. The binary wires these modules together; integration
//! tests drive them directly.

pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod logging;
pub mod notification;
pub mod scheduler;
pub mod utils;

pub use error::{Error, Result};

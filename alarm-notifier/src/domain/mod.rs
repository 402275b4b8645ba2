//! Domain layer for alarm-notifier.
//!
//! Machines, their status history, users with their notification preferences,
//! and the record of a delivered push notification.

pub mod machine;
pub mod notification;
pub mod user;

pub use machine::{AlarmDetail, Machine, MachineStatus, SignalLight, SignalLights};
pub use notification::{PushMessage, SentNotification};
pub use user::{User, UserConfig};

//! Database models for alarm-notifier.
//!
//! These models map directly to the database schema and handle
//! conversion of JSON and enum columns to the domain types.

pub mod machine;
pub mod notification;
pub mod user;

pub use machine::*;
pub use notification::*;
pub use user::*;

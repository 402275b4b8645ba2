//! Repository layer for database access.
//!
//! The notification engine only depends on the traits; the `Sqlx*` types are the
//! SQLite implementations wired up by the binary and the integration tests.

pub mod machine;
pub mod notification;
pub mod status;
pub mod user;

pub use machine::*;
pub use notification::*;
pub use status::*;
pub use user::*;

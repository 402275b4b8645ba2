//! Push delivery transports.
//!
//! - Firebase Cloud Messaging (HTTP v1 API)

mod fcm;

pub use fcm::{FcmConfig, FcmTransport, ServiceAccountKey};

use async_trait::async_trait;

use crate::Result;
use crate::domain::PushMessage;

/// Trait for push transports.
///
/// `send` returns `Ok(())` only when the provider accepted the message; any `Err`
/// is treated as a failed delivery for that single token.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Get the transport name used in logs.
    fn transport_type(&self) -> &'static str;

    /// Deliver one message to the device addressed by `message.token`.
    async fn send(&self, message: &PushMessage) -> Result<()>;
}

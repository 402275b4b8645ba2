//! Sent notification database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::time::{datetime_to_ms, ms_to_datetime};
use crate::domain::{PushMessage, SentNotification};

/// Sent notification database model.
/// Stores every push message the transport confirmed as delivered.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SentNotificationDbModel {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub token: String,
    pub title: String,
    pub body: String,
    /// Unix epoch milliseconds (UTC)
    pub sent_at: i64,
}

impl From<&SentNotification> for SentNotificationDbModel {
    fn from(sent: &SentNotification) -> Self {
        Self {
            id: sent.id.clone(),
            user_id: sent.user_id.clone(),
            user_email: sent.user_email.clone(),
            token: sent.message.token.clone(),
            title: sent.message.title.clone(),
            body: sent.message.body.clone(),
            sent_at: datetime_to_ms(sent.sent_at),
        }
    }
}

impl From<SentNotificationDbModel> for SentNotification {
    fn from(row: SentNotificationDbModel) -> Self {
        SentNotification {
            id: row.id,
            message: PushMessage::new(row.token, row.title, row.body),
            user_id: row.user_id,
            user_email: row.user_email,
            sent_at: ms_to_datetime(row.sent_at),
        }
    }
}

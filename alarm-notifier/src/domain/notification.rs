//! Rendered push messages and the record of their delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// A notification addressed to a single device token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
}

impl PushMessage {
    pub fn new(
        token: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            title: title.into(),
            body: body.into(),
        }
    }
}

/// A message the push transport confirmed as sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentNotification {
    pub id: String,
    pub message: PushMessage,
    pub user_id: String,
    pub user_email: String,
    pub sent_at: DateTime<Utc>,
}

impl SentNotification {
    pub fn new(message: PushMessage, user: &User) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message,
            user_id: user.id.clone(),
            user_email: user.email.clone(),
            sent_at: Utc::now(),
        }
    }
}

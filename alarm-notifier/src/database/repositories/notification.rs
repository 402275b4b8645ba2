//! Sent notification repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::models::SentNotificationDbModel;
use crate::domain::SentNotification;

/// Sent notification repository trait.
#[async_trait]
pub trait SentNotificationRepository: Send + Sync {
    async fn save(&self, sent: &SentNotification) -> Result<()>;

    /// Newest first. Used by operators; the dispatch path never reads it back.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<SentNotification>>;
}

/// SQLx implementation of SentNotificationRepository.
pub struct SqlxSentNotificationRepository {
    pool: SqlitePool,
}

impl SqlxSentNotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SentNotificationRepository for SqlxSentNotificationRepository {
    async fn save(&self, sent: &SentNotification) -> Result<()> {
        let row = SentNotificationDbModel::from(sent);
        sqlx::query(
            r#"
            INSERT INTO sent_notifications (id, user_id, user_email, token, title, body, sent_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.user_id)
        .bind(&row.user_email)
        .bind(&row.token)
        .bind(&row.title)
        .bind(&row.body)
        .bind(row.sent_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<SentNotification>> {
        let rows = sqlx::query_as::<_, SentNotificationDbModel>(
            r#"
            SELECT id, user_id, user_email, token, title, body, sent_at
            FROM sent_notifications
            WHERE user_id = ?
            ORDER BY sent_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SentNotification::from).collect())
    }
}

//! User repository for database operations.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::models::UserDbModel;
use crate::domain::User;

/// User repository trait for user data access operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All users belonging to a company.
    async fn find_by_company_id(&self, company_id: &str) -> Result<Vec<User>>;

    /// Create a user or replace its email, company and notification config.
    async fn upsert(&self, user: &User) -> Result<()>;
}

/// SQLx implementation of UserRepository.
pub struct SqlxUserRepository {
    pool: SqlitePool,
}

impl SqlxUserRepository {
    /// Create a new SqlxUserRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn find_by_company_id(&self, company_id: &str) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserDbModel>(
            "SELECT id, email, company_id, user_config FROM users WHERE company_id = ? ORDER BY email",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match User::try_from(row) {
                Ok(user) => users.push(user),
                Err(e) => {
                    // One corrupt config must not hide the rest of the company.
                    tracing::warn!(
                        user_id = %id,
                        error = %e,
                        "Skipping user with unreadable config"
                    );
                }
            }
        }
        Ok(users)
    }

    async fn upsert(&self, user: &User) -> Result<()> {
        let row = UserDbModel::try_from(user)?;
        sqlx::query(
            r#"
            INSERT INTO users (id, email, company_id, user_config)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                company_id = excluded.company_id,
                user_config = excluded.user_config
            "#,
        )
        .bind(&row.id)
        .bind(&row.email)
        .bind(&row.company_id)
        .bind(&row.user_config)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

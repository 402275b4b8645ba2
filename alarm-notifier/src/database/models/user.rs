//! User database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::domain::{User, UserConfig};
use crate::{Error, Result};

/// User database model.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserDbModel {
    pub id: String,
    pub email: String,
    pub company_id: String,
    /// JSON blob of the user's notification config, NULL when never configured
    pub user_config: Option<String>,
}

impl TryFrom<UserDbModel> for User {
    type Error = Error;

    fn try_from(row: UserDbModel) -> Result<Self> {
        let config = row
            .user_config
            .as_deref()
            .map(serde_json::from_str::<UserConfig>)
            .transpose()?;
        Ok(User {
            id: row.id,
            email: row.email,
            company_id: row.company_id,
            config,
        })
    }
}

impl TryFrom<&User> for UserDbModel {
    type Error = Error;

    fn try_from(user: &User) -> Result<Self> {
        Ok(Self {
            id: user.id.clone(),
            email: user.email.clone(),
            company_id: user.company_id.clone(),
            user_config: user.config.as_ref().map(serde_json::to_string).transpose()?,
        })
    }
}

//! Machine status history repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::models::MachineStatusDbModel;
use crate::domain::MachineStatus;

/// Machine status repository trait.
#[async_trait]
pub trait MachineStatusRepository: Send + Sync {
    /// Append a newly observed status.
    async fn insert(&self, status: &MachineStatus) -> Result<()>;

    /// The status recorded just before the newest one, if any.
    ///
    /// Callers store the incoming status first, so this is the status that was
    /// current before the event being processed.
    async fn find_penultimate_by_machine_id(&self, machine_id: &str)
    -> Result<Option<MachineStatus>>;
}

/// SQLx implementation of MachineStatusRepository.
pub struct SqlxMachineStatusRepository {
    pool: SqlitePool,
}

impl SqlxMachineStatusRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MachineStatusRepository for SqlxMachineStatusRepository {
    async fn insert(&self, status: &MachineStatus) -> Result<()> {
        let row = MachineStatusDbModel::try_from(status)?;
        sqlx::query(
            r#"
            INSERT INTO machine_status (
                id, machine_id, green_light, yellow_light, red_light, blue_light,
                alarm_details, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.machine_id)
        .bind(&row.green_light)
        .bind(&row.yellow_light)
        .bind(&row.red_light)
        .bind(&row.blue_light)
        .bind(&row.alarm_details)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_penultimate_by_machine_id(
        &self,
        machine_id: &str,
    ) -> Result<Option<MachineStatus>> {
        let row = sqlx::query_as::<_, MachineStatusDbModel>(
            r#"
            SELECT id, machine_id, green_light, yellow_light, red_light, blue_light,
                   alarm_details, created_at
            FROM machine_status
            WHERE machine_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1 OFFSET 1
            "#,
        )
        .bind(machine_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MachineStatus::try_from).transpose()
    }
}

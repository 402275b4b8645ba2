//! Machine repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::models::MachineDbModel;
use crate::domain::Machine;

/// Machine repository trait.
#[async_trait]
pub trait MachineRepository: Send + Sync {
    async fn find_by_machine_id(&self, machine_id: &str) -> Result<Option<Machine>>;
    async fn upsert(&self, machine: &Machine) -> Result<()>;
}

/// SQLx implementation of MachineRepository.
pub struct SqlxMachineRepository {
    pool: SqlitePool,
}

impl SqlxMachineRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MachineRepository for SqlxMachineRepository {
    async fn find_by_machine_id(&self, machine_id: &str) -> Result<Option<Machine>> {
        let row = sqlx::query_as::<_, MachineDbModel>(
            "SELECT machine_id, name, company_id FROM machines WHERE machine_id = ?",
        )
        .bind(machine_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Machine::from))
    }

    async fn upsert(&self, machine: &Machine) -> Result<()> {
        let row = MachineDbModel::from(machine);
        sqlx::query(
            r#"
            INSERT INTO machines (machine_id, name, company_id)
            VALUES (?, ?, ?)
            ON CONFLICT(machine_id) DO UPDATE SET
                name = excluded.name,
                company_id = excluded.company_id
            "#,
        )
        .bind(&row.machine_id)
        .bind(&row.name)
        .bind(&row.company_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

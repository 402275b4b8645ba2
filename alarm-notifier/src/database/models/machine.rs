//! Machine and machine status database models.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::time::{datetime_to_ms, ms_to_datetime};
use crate::domain::{AlarmDetail, Machine, MachineStatus, SignalLight, SignalLights};
use crate::{Error, Result};

/// Machine database model.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MachineDbModel {
    pub machine_id: String,
    pub name: String,
    pub company_id: String,
}

impl From<MachineDbModel> for Machine {
    fn from(row: MachineDbModel) -> Self {
        Machine {
            machine_id: row.machine_id,
            name: row.name,
            company_id: row.company_id,
        }
    }
}

impl From<&Machine> for MachineDbModel {
    fn from(machine: &Machine) -> Self {
        Self {
            machine_id: machine.machine_id.clone(),
            name: machine.name.clone(),
            company_id: machine.company_id.clone(),
        }
    }
}

/// Machine status database model.
/// One row per observed status; lights are stored as text, alarms as a JSON array.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MachineStatusDbModel {
    pub id: String,
    pub machine_id: String,
    pub green_light: String,
    pub yellow_light: String,
    pub red_light: String,
    pub blue_light: String,
    /// JSON array of `{alarm_id, alarm_description}`
    pub alarm_details: String,
    /// Unix epoch milliseconds (UTC)
    pub created_at: i64,
}

fn parse_light(column: &str, value: &str) -> Result<SignalLight> {
    SignalLight::from_str(value.trim()).map_err(|_| {
        Error::Database(format!("Invalid signal light in {}: {}", column, value))
    })
}

impl TryFrom<MachineStatusDbModel> for MachineStatus {
    type Error = Error;

    fn try_from(row: MachineStatusDbModel) -> Result<Self> {
        let lights = SignalLights {
            green: parse_light("green_light", &row.green_light)?,
            yellow: parse_light("yellow_light", &row.yellow_light)?,
            red: parse_light("red_light", &row.red_light)?,
            blue: parse_light("blue_light", &row.blue_light)?,
        };
        let alarm_details: Vec<AlarmDetail> = serde_json::from_str(&row.alarm_details)?;

        Ok(MachineStatus {
            id: row.id,
            machine_id: row.machine_id,
            lights,
            alarm_details,
            created_at: ms_to_datetime(row.created_at),
        })
    }
}

impl TryFrom<&MachineStatus> for MachineStatusDbModel {
    type Error = Error;

    fn try_from(status: &MachineStatus) -> Result<Self> {
        Ok(Self {
            id: status.id.clone(),
            machine_id: status.machine_id.clone(),
            green_light: status.lights.green.to_string(),
            yellow_light: status.lights.yellow.to_string(),
            red_light: status.lights.red.to_string(),
            blue_light: status.lights.blue.to_string(),
            alarm_details: serde_json::to_string(&status.alarm_details)?,
            created_at: datetime_to_ms(status.created_at),
        })
    }
}

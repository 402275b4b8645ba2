//! Machine and machine status entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monitored machine. Owned by exactly one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub machine_id: String,
    pub name: String,
    pub company_id: String,
}

impl Machine {
    pub fn new(
        machine_id: impl Into<String>,
        name: impl Into<String>,
        company_id: impl Into<String>,
    ) -> Self {
        Self {
            machine_id: machine_id.into(),
            name: name.into(),
            company_id: company_id.into(),
        }
    }
}

/// State of one signal-light channel.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalLight {
    #[default]
    Off,
    On,
    Blinking,
}

/// The four signal-light channels of a machine's light tower.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalLights {
    #[serde(default)]
    pub green: SignalLight,
    #[serde(default)]
    pub yellow: SignalLight,
    #[serde(default)]
    pub red: SignalLight,
    #[serde(default)]
    pub blue: SignalLight,
}

impl SignalLights {
    /// Channels in display order: green, yellow, red, blue.
    pub fn channels(&self) -> [SignalLight; 4] {
        [self.green, self.yellow, self.red, self.blue]
    }

    pub fn all_off(&self) -> bool {
        self.channels().iter().all(|l| *l == SignalLight::Off)
    }
}

/// A single active alarm reported by a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmDetail {
    pub alarm_id: String,
    pub alarm_description: String,
}

impl AlarmDetail {
    pub fn new(alarm_id: impl Into<String>, alarm_description: impl Into<String>) -> Self {
        Self {
            alarm_id: alarm_id.into(),
            alarm_description: alarm_description.into(),
        }
    }
}

/// One observed status of a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineStatus {
    #[serde(default = "new_status_id")]
    pub id: String,
    pub machine_id: String,
    #[serde(default)]
    pub lights: SignalLights,
    #[serde(default)]
    pub alarm_details: Vec<AlarmDetail>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn new_status_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl MachineStatus {
    pub fn new(
        machine_id: impl Into<String>,
        lights: SignalLights,
        alarm_details: Vec<AlarmDetail>,
    ) -> Self {
        Self {
            id: new_status_id(),
            machine_id: machine_id.into(),
            lights,
            alarm_details,
            created_at: Utc::now(),
        }
    }
}

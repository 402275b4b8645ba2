//! User entity and per-user notification preferences.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

/// Notification preferences of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Push tokens, one per registered device.
    #[serde(default)]
    pub notification_tokens: BTreeSet<String>,
    /// Machines the user never wants to hear about.
    #[serde(default)]
    pub blacklisted_machines: HashSet<String>,
    /// Alarm ids the user never wants to hear about, on any machine.
    #[serde(default)]
    pub blacklisted_alarms: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub company_id: String,
    #[serde(default)]
    pub config: Option<UserConfig>,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        company_id: impl Into<String>,
        config: Option<UserConfig>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            company_id: company_id.into(),
            config,
        }
    }

    /// Registered delivery tokens, `None` when the user cannot be reached at all.
    pub fn delivery_tokens(&self) -> Option<&BTreeSet<String>> {
        self.config
            .as_ref()
            .map(|c| &c.notification_tokens)
            .filter(|tokens| !tokens.is_empty())
    }

    pub fn blacklists_machine(&self, machine_id: &str) -> bool {
        self.config
            .as_ref()
            .is_some_and(|c| c.blacklisted_machines.contains(machine_id))
    }

    pub fn blacklists_alarm(&self, alarm_id: &str) -> bool {
        self.config
            .as_ref()
            .is_some_and(|c| c.blacklisted_alarms.contains(alarm_id))
    }
}

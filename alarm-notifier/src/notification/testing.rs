//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::transport::PushTransport;
use crate::database::repositories::{
    MachineRepository, MachineStatusRepository, SentNotificationRepository, UserRepository,
};
use crate::domain::{Machine, MachineStatus, PushMessage, SentNotification, User};
use crate::{Error, Result};

/// Records every message; fails for the configured tokens.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<PushMessage>>,
    attempts: Mutex<usize>,
    failing_tokens: HashSet<String>,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn failing_for(tokens: &[&str]) -> Self {
        Self {
            failing_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sent_tokens(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.token.clone()).collect()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    fn transport_type(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &PushMessage) -> Result<()> {
        *self.attempts.lock() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_tokens.contains(&message.token) {
            return Err(Error::transport(format!("token {} unregistered", message.token)));
        }
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySentNotifications {
    items: Mutex<Vec<SentNotification>>,
    fail: bool,
}

impl MemorySentNotifications {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn all(&self) -> Vec<SentNotification> {
        self.items.lock().clone()
    }
}

#[async_trait]
impl SentNotificationRepository for MemorySentNotifications {
    async fn save(&self, sent: &SentNotification) -> Result<()> {
        if self.fail {
            return Err(Error::Database("disk full".to_string()));
        }
        self.items.lock().push(sent.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<SentNotification>> {
        Ok(self
            .items
            .lock()
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryMachines {
    machines: Mutex<HashMap<String, Machine>>,
}

impl MemoryMachines {
    pub fn with(machines: Vec<Machine>) -> Self {
        Self {
            machines: Mutex::new(
                machines
                    .into_iter()
                    .map(|m| (m.machine_id.clone(), m))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl MachineRepository for MemoryMachines {
    async fn find_by_machine_id(&self, machine_id: &str) -> Result<Option<Machine>> {
        Ok(self.machines.lock().get(machine_id).cloned())
    }

    async fn upsert(&self, machine: &Machine) -> Result<()> {
        self.machines
            .lock()
            .insert(machine.machine_id.clone(), machine.clone());
        Ok(())
    }
}

/// Keeps insertion order; the penultimate entry is the second newest.
#[derive(Default)]
pub struct MemoryStatuses {
    statuses: Mutex<Vec<MachineStatus>>,
}

#[async_trait]
impl MachineStatusRepository for MemoryStatuses {
    async fn insert(&self, status: &MachineStatus) -> Result<()> {
        self.statuses.lock().push(status.clone());
        Ok(())
    }

    async fn find_penultimate_by_machine_id(
        &self,
        machine_id: &str,
    ) -> Result<Option<MachineStatus>> {
        Ok(self
            .statuses
            .lock()
            .iter()
            .rev()
            .filter(|s| s.machine_id == machine_id)
            .nth(1)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryUsers {
    users: Vec<User>,
    fail: bool,
}

impl MemoryUsers {
    pub fn with(users: Vec<User>) -> Self {
        Self { users, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            users: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn find_by_company_id(&self, company_id: &str) -> Result<Vec<User>> {
        if self.fail {
            return Err(Error::Database("connection reset".to_string()));
        }
        Ok(self
            .users
            .iter()
            .filter(|u| u.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, _user: &User) -> Result<()> {
        Ok(())
    }
}

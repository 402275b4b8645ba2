//! Notification service implementation.
//!
//! The NotificationService is responsible for:
//! - Validating incoming machine status events against the machine store
//! - Handing each accepted event to the worker pool as a `StatusRun`
//! - Running the delta gate, audience resolution, composition and dispatch
//!   for that event without blocking the caller

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::audience;
use super::composer::MessageComposer;
use super::delta::AlarmDelta;
use super::dispatch::{DispatchEngine, DispatchReport};
use super::transport::PushTransport;
use crate::database::DbPool;
use crate::database::repositories::{
    MachineRepository, MachineStatusRepository, SentNotificationRepository,
    SqlxMachineRepository, SqlxMachineStatusRepository, SqlxSentNotificationRepository,
    SqlxUserRepository, UserRepository,
};
use crate::domain::{Machine, MachineStatus};
use crate::scheduler::WorkerPool;
use crate::{Error, Result};

const INVALID_MACHINE_MESSAGE: &str = "Machine ID in received machine status is invalid.";

/// Configuration for the notification service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationServiceConfig {
    /// Whether the notification service is enabled.
    pub enabled: bool,
    /// Maximum in-flight sends within one run (0 = unbounded).
    pub send_concurrency: usize,
}

impl Default for NotificationServiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            send_concurrency: 16,
        }
    }
}

/// The stores the service reads from and writes to.
#[derive(Clone)]
pub struct NotificationStores {
    pub machines: Arc<dyn MachineRepository>,
    pub statuses: Arc<dyn MachineStatusRepository>,
    pub users: Arc<dyn UserRepository>,
    pub sent_notifications: Arc<dyn SentNotificationRepository>,
}

impl NotificationStores {
    /// SQLite-backed stores sharing one pool.
    pub fn sqlite(pool: &DbPool) -> Self {
        Self {
            machines: Arc::new(SqlxMachineRepository::new(pool.clone())),
            statuses: Arc::new(SqlxMachineStatusRepository::new(pool.clone())),
            users: Arc::new(SqlxUserRepository::new(pool.clone())),
            sent_notifications: Arc::new(SqlxSentNotificationRepository::new(pool.clone())),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// At least one alarm was already present in the previous status.
    AlreadyNotified,
    /// Nothing left to notify about.
    NoAlarms,
    /// The company's users could not be loaded.
    UserLookupFailed,
    /// Messages were dispatched.
    Dispatched(DispatchReport),
}

/// One end-to-end notification run for a single status event.
#[derive(Debug, Clone)]
pub struct StatusRun {
    pub machine: Machine,
    pub current: MachineStatus,
    pub penultimate: Option<MachineStatus>,
}

impl StatusRun {
    pub async fn execute(
        self,
        users: &dyn UserRepository,
        dispatcher: &DispatchEngine,
    ) -> RunOutcome {
        let StatusRun {
            machine,
            current,
            penultimate,
        } = self;
        let machine_id = current.machine_id.as_str();

        let delta = AlarmDelta::filter(
            current.alarm_details.clone(),
            penultimate.as_ref().map(|p| p.alarm_details.as_slice()),
        );

        if delta.suppressed_any {
            let previous: Vec<&str> = penultimate
                .iter()
                .flat_map(|p| p.alarm_details.iter().map(|a| a.alarm_id.as_str()))
                .collect();
            info!(
                machine_id,
                previous_alarms = ?previous,
                "User already received a message for those alarm details"
            );
            return RunOutcome::AlreadyNotified;
        }
        if !delta.should_notify() {
            debug!(machine_id, "Status has no alarms to notify");
            return RunOutcome::NoAlarms;
        }

        let composer = MessageComposer::new(&machine.name, &current.lights, &delta.remaining);

        let candidates = match users.find_by_company_id(&machine.company_id).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(
                    machine_id,
                    company_id = %machine.company_id,
                    error = %e,
                    "Failed to load users for notification"
                );
                return RunOutcome::UserLookupFailed;
            }
        };

        let audience = audience::resolve(machine_id, &delta.remaining, candidates);
        debug!(
            machine_id,
            recipients = audience.len(),
            alarms = delta.remaining.len(),
            "Resolved notification audience"
        );

        let report = dispatcher.dispatch(&composer, &audience).await;
        info!(
            machine_id,
            title = %composer.title(),
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "Notification run finished"
        );
        RunOutcome::Dispatched(report)
    }
}

/// The notification service.
pub struct NotificationService {
    config: NotificationServiceConfig,
    machines: Arc<dyn MachineRepository>,
    statuses: Arc<dyn MachineStatusRepository>,
    users: Arc<dyn UserRepository>,
    dispatcher: Arc<DispatchEngine>,
    pool: Arc<WorkerPool>,
}

impl NotificationService {
    pub fn new(
        config: NotificationServiceConfig,
        stores: NotificationStores,
        transport: Arc<dyn PushTransport>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        let dispatcher = Arc::new(DispatchEngine::new(
            transport,
            stores.sent_notifications,
            config.send_concurrency,
        ));

        info!(
            enabled = config.enabled,
            send_concurrency = config.send_concurrency,
            "Notification service initialized"
        );

        Self {
            config,
            machines: stores.machines,
            statuses: stores.statuses,
            users: stores.users,
            dispatcher,
            pool,
        }
    }

    /// The worker pool runs are submitted to.
    pub fn worker_pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Accept a freshly stored status and notify about it in the background.
    ///
    /// Returns `Error::BadRequest` without queuing anything when the status
    /// references an unknown machine, whether or not notifications are enabled.
    /// Delivery outcomes are never reported here.
    pub async fn send_notifications(&self, status: MachineStatus) -> Result<()> {
        let penultimate = self
            .statuses
            .find_penultimate_by_machine_id(&status.machine_id)
            .await?;

        let Some(machine) = self.machines.find_by_machine_id(&status.machine_id).await? else {
            warn!(machine_id = %status.machine_id, "{}", INVALID_MACHINE_MESSAGE);
            return Err(Error::bad_request(INVALID_MACHINE_MESSAGE));
        };

        if !self.config.enabled {
            debug!(
                machine_id = %status.machine_id,
                "Notifications disabled, not scheduling a run"
            );
            return Ok(());
        }

        let label = format!("status:{}:{}", status.machine_id, status.id);
        let run = StatusRun {
            machine,
            current: status,
            penultimate,
        };
        let users = self.users.clone();
        let dispatcher = self.dispatcher.clone();

        self.pool.submit(label, async move {
            run.execute(users.as_ref(), &dispatcher).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AlarmDetail, SignalLight, SignalLights, User, UserConfig};
    use crate::notification::testing::{
        MemoryMachines, MemorySentNotifications, MemoryStatuses, MemoryUsers, RecordingTransport,
    };
    use crate::scheduler::WorkerPoolConfig;

    fn machine() -> Machine {
        Machine::new("m-1", "Press 4", "c1")
    }

    fn user(id: &str, tokens: &[&str]) -> User {
        let config = UserConfig {
            notification_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        };
        User::new(id, format!("{}@example.com", id), "c1", Some(config))
    }

    fn status(alarms: &[(&str, &str)]) -> MachineStatus {
        MachineStatus::new(
            "m-1",
            SignalLights {
                red: SignalLight::On,
                ..Default::default()
            },
            alarms
                .iter()
                .map(|(id, desc)| AlarmDetail::new(*id, *desc))
                .collect(),
        )
    }

    fn engine(
        transport: Arc<RecordingTransport>,
        store: Arc<MemorySentNotifications>,
    ) -> DispatchEngine {
        DispatchEngine::new(transport, store, 8)
    }

    #[test]
    fn test_notification_service_config_default() {
        let config = NotificationServiceConfig::default();
        assert!(config.enabled);
        assert_eq!(config.send_concurrency, 16);
    }

    #[tokio::test]
    async fn test_run_without_previous_status_dispatches() {
        let transport = Arc::new(RecordingTransport::default());
        let store = Arc::new(MemorySentNotifications::default());
        let users = MemoryUsers::with(vec![user("u1", &["t1"])]);

        let run = StatusRun {
            machine: machine(),
            current: status(&[("A1", "Door open"), ("A2", "Overheat")]),
            penultimate: None,
        };
        let outcome = run.execute(&users, &engine(transport.clone(), store.clone())).await;

        assert_eq!(
            outcome,
            RunOutcome::Dispatched(DispatchReport {
                attempted: 1,
                delivered: 1,
                failed: 0
            })
        );
        let sent = store.all();
        assert_eq!(sent[0].message.title, "Press 4 | 🔴");
        assert_eq!(sent[0].message.body, "ERR:\nA1 | Door open\nA2 | Overheat\n");
    }

    #[tokio::test]
    async fn test_repeated_alarm_sends_nothing() {
        let transport = Arc::new(RecordingTransport::default());
        let store = Arc::new(MemorySentNotifications::default());
        let users = MemoryUsers::with(vec![user("u1", &["t1"])]);

        let run = StatusRun {
            machine: machine(),
            current: status(&[("A1", "Door open")]),
            penultimate: Some(status(&[("A1", "Door open")])),
        };
        let outcome = run.execute(&users, &engine(transport.clone(), store.clone())).await;

        assert_eq!(outcome, RunOutcome::AlreadyNotified);
        assert_eq!(transport.attempts(), 0);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_new_alarm_alongside_repeated_one_sends_nothing() {
        let transport = Arc::new(RecordingTransport::default());
        let store = Arc::new(MemorySentNotifications::default());
        let users = MemoryUsers::with(vec![user("u1", &["t1"])]);

        let run = StatusRun {
            machine: machine(),
            current: status(&[("A1", "Door open"), ("A7", "Spindle stall")]),
            penultimate: Some(status(&[("A1", "Door open")])),
        };
        let outcome = run.execute(&users, &engine(transport.clone(), store.clone())).await;

        assert_eq!(outcome, RunOutcome::AlreadyNotified);
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test]
    async fn test_status_without_alarms_sends_nothing() {
        let transport = Arc::new(RecordingTransport::default());
        let store = Arc::new(MemorySentNotifications::default());
        let users = MemoryUsers::with(vec![user("u1", &["t1"])]);

        let run = StatusRun {
            machine: machine(),
            current: status(&[]),
            penultimate: Some(status(&[("A1", "Door open")])),
        };
        let outcome = run.execute(&users, &engine(transport.clone(), store.clone())).await;

        assert_eq!(outcome, RunOutcome::NoAlarms);
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test]
    async fn test_user_lookup_failure_ends_run_quietly() {
        let transport = Arc::new(RecordingTransport::default());
        let store = Arc::new(MemorySentNotifications::default());

        let run = StatusRun {
            machine: machine(),
            current: status(&[("A1", "Door open")]),
            penultimate: None,
        };
        let outcome = run
            .execute(&MemoryUsers::failing(), &engine(transport.clone(), store))
            .await;
        assert_eq!(outcome, RunOutcome::UserLookupFailed);
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test]
    async fn test_unknown_machine_is_bad_request() {
        let stores = NotificationStores {
            machines: Arc::new(MemoryMachines::default()),
            statuses: Arc::new(MemoryStatuses::default()),
            users: Arc::new(MemoryUsers::with(vec![user("u1", &["t1"])])),
            sent_notifications: Arc::new(MemorySentNotifications::default()),
        };
        let pool = Arc::new(WorkerPool::new(WorkerPoolConfig::default()));
        let transport = Arc::new(RecordingTransport::default());
        let service = NotificationService::new(
            NotificationServiceConfig::default(),
            stores,
            transport.clone(),
            pool.clone(),
        );

        let err = service
            .send_notifications(status(&[("A1", "Door open")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert!(err.is_client_error());
        assert_eq!(pool.stats().submitted, 0);

        assert!(pool.shutdown().await);
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test]
    async fn test_send_notifications_runs_in_background() {
        let statuses = Arc::new(MemoryStatuses::default());
        let store = Arc::new(MemorySentNotifications::default());
        let stores = NotificationStores {
            machines: Arc::new(MemoryMachines::with(vec![machine()])),
            statuses: statuses.clone(),
            users: Arc::new(MemoryUsers::with(vec![user("u1", &["t1", "t2"])])),
            sent_notifications: store.clone(),
        };
        let pool = Arc::new(WorkerPool::new(WorkerPoolConfig::default()));
        let transport = Arc::new(
            RecordingTransport::default().with_delay(std::time::Duration::from_millis(50)),
        );
        let service = NotificationService::new(
            NotificationServiceConfig::default(),
            stores,
            transport.clone(),
            pool.clone(),
        );

        let current = status(&[("A1", "Door open")]);
        statuses.insert(&current).await.unwrap();
        service.send_notifications(current).await.unwrap();

        // The sends are still sleeping in the transport when submit returns.
        assert_eq!(store.len(), 0);
        assert_eq!(pool.stats().submitted, 1);

        assert!(service.worker_pool().shutdown().await);
        assert_eq!(store.len(), 2);
    }

    fn disabled_service(machines: Vec<Machine>) -> (NotificationService, Arc<WorkerPool>) {
        let stores = NotificationStores {
            machines: Arc::new(MemoryMachines::with(machines)),
            statuses: Arc::new(MemoryStatuses::default()),
            users: Arc::new(MemoryUsers::with(vec![user("u1", &["t1"])])),
            sent_notifications: Arc::new(MemorySentNotifications::default()),
        };
        let pool = Arc::new(WorkerPool::new(WorkerPoolConfig::default()));
        let service = NotificationService::new(
            NotificationServiceConfig {
                enabled: false,
                ..Default::default()
            },
            stores,
            Arc::new(RecordingTransport::default()),
            pool.clone(),
        );
        (service, pool)
    }

    #[tokio::test]
    async fn test_disabled_service_skips_known_machine() {
        let (service, pool) = disabled_service(vec![machine()]);

        service
            .send_notifications(status(&[("A1", "Door open")]))
            .await
            .unwrap();
        assert_eq!(pool.stats().submitted, 0);
    }

    #[tokio::test]
    async fn test_disabled_service_still_rejects_unknown_machine() {
        let (service, pool) = disabled_service(Vec::new());

        let err = service
            .send_notifications(status(&[("A1", "Door open")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(pool.stats().submitted, 0);
    }
}

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use alarm_notifier::config::AppConfig;
use alarm_notifier::database::{self, repositories::MachineStatusRepository};
use alarm_notifier::domain::MachineStatus;
use alarm_notifier::logging;
use alarm_notifier::notification::{FcmTransport, NotificationService, NotificationStores};
use alarm_notifier::scheduler::WorkerPool;
use alarm_notifier::{Error, utils::http_client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let (logging_config, _log_guard) = logging::init_logging(&config.log_dir, config.log_format)?;
    if let Some(directive) = &config.log_filter {
        if let Err(e) = logging_config.set_filter(directive) {
            warn!(error = %e, "Ignoring LOG_FILTER");
        }
    }
    info!(
        log_dir = %logging_config.log_dir().display(),
        filter = %logging_config.get_filter(),
        "Logging initialized"
    );
    let cancel = CancellationToken::new();
    logging_config.start_retention_cleanup(cancel.clone());

    http_client::install_rustls_provider();

    // Initialize database
    let pool = database::init_pool(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    database::run_migrations(&pool).await?;

    let fcm = config
        .fcm
        .clone()
        .ok_or_else(|| Error::config("FCM_SERVICE_ACCOUNT_PATH must be set"))?;
    info!(project_id = %fcm.project_id, "Using FCM transport");
    let transport = Arc::new(FcmTransport::new(fcm)?);

    let stores = NotificationStores::sqlite(&pool);
    let statuses = stores.statuses.clone();
    let worker_pool = Arc::new(WorkerPool::new(config.worker_pool.clone()));
    let service = NotificationService::new(
        config.notification.clone(),
        stores,
        transport,
        worker_pool.clone(),
    );

    info!("alarm-notifier initialized, reading machine status events from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("stdin closed");
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let status: MachineStatus = match serde_json::from_str(line) {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Skipping malformed machine status event");
                continue;
            }
        };

        if let Err(e) = statuses.insert(&status).await {
            error!(machine_id = %status.machine_id, error = %e, "Failed to store machine status");
            continue;
        }

        let machine_id = status.machine_id.clone();
        match service.send_notifications(status).await {
            Ok(()) => {}
            Err(e) if e.is_client_error() => {
                warn!(
                    machine_id = %machine_id,
                    status = %e.status_code(),
                    error = %e,
                    "Rejected machine status"
                );
            }
            Err(e) => {
                error!(machine_id = %machine_id, error = %e, "Failed to schedule notifications");
            }
        }
    }

    if !worker_pool.shutdown().await {
        warn!("Exiting with notification runs still in flight");
    }
    let stats = worker_pool.stats();
    info!(
        submitted = stats.submitted,
        completed = stats.completed,
        panicked = stats.panicked,
        "alarm-notifier stopped"
    );

    cancel.cancel();
    pool.close().await;
    Ok(())
}

//! Process configuration loaded from the environment.
//!
//! `.env` files are honoured through `dotenvy` by the binary before
//! [`AppConfig::from_env`] is called.

use std::path::PathBuf;
use std::str::FromStr;

use crate::logging::LogFormat;
use crate::notification::{FcmConfig, NotificationServiceConfig};
use crate::scheduler::WorkerPoolConfig;
use crate::{Error, Result};

pub const DEFAULT_DATABASE_URL: &str = "sqlite:alarm-notifier.db?mode=rwc";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Top-level configuration for the notifier process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_dir: PathBuf,
    pub log_format: LogFormat,
    /// Filter directive applied over the default once logging is up.
    pub log_filter: Option<String>,
    pub worker_pool: WorkerPoolConfig,
    pub notification: NotificationServiceConfig,
    /// `None` when no FCM service account is configured.
    pub fcm: Option<FcmConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration reading variables through `lookup`.
    ///
    /// Unset or blank variables fall back to their defaults; values that are
    /// present but unparsable are configuration errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let pool_defaults = WorkerPoolConfig::default();
        let notification_defaults = NotificationServiceConfig::default();

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            log_dir: get("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            log_format: parse_or("LOG_FORMAT", get("LOG_FORMAT"), LogFormat::default())?,
            log_filter: get("LOG_FILTER"),
            worker_pool: WorkerPoolConfig {
                max_concurrent_runs: parse_or(
                    "NOTIFIER_MAX_CONCURRENT_RUNS",
                    get("NOTIFIER_MAX_CONCURRENT_RUNS"),
                    pool_defaults.max_concurrent_runs,
                )?,
                shutdown_timeout_secs: parse_or(
                    "NOTIFIER_SHUTDOWN_TIMEOUT_SECS",
                    get("NOTIFIER_SHUTDOWN_TIMEOUT_SECS"),
                    pool_defaults.shutdown_timeout_secs,
                )?,
            },
            notification: NotificationServiceConfig {
                enabled: parse_or(
                    "NOTIFIER_ENABLED",
                    get("NOTIFIER_ENABLED"),
                    notification_defaults.enabled,
                )?,
                send_concurrency: parse_or(
                    "NOTIFIER_SEND_CONCURRENCY",
                    get("NOTIFIER_SEND_CONCURRENCY"),
                    notification_defaults.send_concurrency,
                )?,
            },
            fcm: FcmConfig::from_lookup(&lookup)?,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::config(format!("Invalid value for {}: {}", key, raw))),
        None => Ok(default),
    }
}

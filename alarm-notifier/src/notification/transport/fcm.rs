//! Firebase Cloud Messaging transport (HTTP v1 API).
//!
//! Authenticates with a Google service account: an RS256-signed assertion is
//! exchanged for a short-lived OAuth2 access token, which is cached until shortly
//! before it expires.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::PushTransport;
use crate::domain::PushMessage;
use crate::utils::http_client;
use crate::{Error, Result};

const DEFAULT_API_BASE: &str = "https://fcm.googleapis.com";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const ACCESS_TOKEN_SKEW_SECS: i64 = 60;
const MAX_ERROR_BODY_CHARS: usize = 500;

/// The fields of a Google service-account key file that FCM needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read FCM service account {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("Invalid FCM service account JSON: {}", e)))
    }
}

/// FCM transport configuration.
#[derive(Debug, Clone)]
pub struct FcmConfig {
    pub project_id: String,
    pub service_account: ServiceAccountKey,
    pub request_timeout_secs: u64,
    pub api_base: String,
}

impl FcmConfig {
    pub fn new(project_id: impl Into<String>, service_account: ServiceAccountKey) -> Self {
        Self {
            project_id: project_id.into(),
            service_account,
            request_timeout_secs: 15,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Load from `FCM_SERVICE_ACCOUNT_PATH`, `FCM_PROJECT_ID` and `FCM_REQUEST_TIMEOUT_SECS`.
    ///
    /// Returns `Ok(None)` when no service account is configured. The project id
    /// defaults to the one in the key file.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`FcmConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let Some(path) = get("FCM_SERVICE_ACCOUNT_PATH") else {
            if get("FCM_PROJECT_ID").is_some() {
                return Err(Error::config(
                    "FCM_PROJECT_ID is set but FCM_SERVICE_ACCOUNT_PATH is missing",
                ));
            }
            return Ok(None);
        };

        let service_account = ServiceAccountKey::from_file(Path::new(&path))?;
        let project_id = get("FCM_PROJECT_ID")
            .or_else(|| service_account.project_id.clone())
            .ok_or_else(|| {
                Error::config("FCM_PROJECT_ID must be set when the key file has no project_id")
            })?;

        let mut config = Self::new(project_id, service_account);
        if let Some(timeout) = get("FCM_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = timeout.parse().map_err(|_| {
                Error::config(format!("Invalid FCM_REQUEST_TIMEOUT_SECS: {}", timeout))
            })?;
        }
        Ok(Some(config))
    }

    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.api_base.trim_end_matches('/'),
            self.project_id
        )
    }
}

#[derive(Debug, Clone)]
struct CachedAccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedAccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - chrono::Duration::seconds(ACCESS_TOKEN_SKEW_SECS) > now
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Firebase Cloud Messaging push transport.
pub struct FcmTransport {
    config: FcmConfig,
    encoding_key: EncodingKey,
    client: Client,
    access_token: RwLock<Option<CachedAccessToken>>,
    /// Held while exchanging the assertion so only one refresh is in flight.
    refresh: tokio::sync::Mutex<()>,
}

impl FcmTransport {
    pub fn new(config: FcmConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.service_account.private_key.as_bytes())
            .map_err(|e| {
                Error::config(format!("Invalid FCM service account private key: {}", e))
            })?;
        let client = http_client::build_client(Duration::from_secs(config.request_timeout_secs))?;

        info!(
            project_id = %config.project_id,
            client_email = %config.service_account.client_email,
            "FCM transport initialized"
        );

        Ok(Self {
            config,
            encoding_key,
            client,
            access_token: RwLock::new(None),
            refresh: tokio::sync::Mutex::new(()),
        })
    }

    fn cached_access_token(&self) -> Option<String> {
        self.access_token
            .read()
            .as_ref()
            .filter(|c| c.is_fresh(Utc::now()))
            .map(|c| c.token.clone())
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cached_access_token() {
            return Ok(token);
        }

        let _refresh = self.refresh.lock().await;
        // Another send may have refreshed while we waited.
        if let Some(token) = self.cached_access_token() {
            return Ok(token);
        }

        let fresh = self.fetch_access_token().await?;
        let token = fresh.token.clone();
        *self.access_token.write() = Some(fresh);
        Ok(token)
    }

    async fn fetch_access_token(&self) -> Result<CachedAccessToken> {
        let account = &self.config.service_account;
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &account.client_email,
            scope: MESSAGING_SCOPE,
            aud: &account.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| Error::transport(format!("Failed to sign FCM assertion: {}", e)))?;

        let response = self
            .client
            .post(&account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| Error::transport(format!("FCM token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::transport(format!(
                "FCM token exchange failed: status {} body {}",
                status,
                truncate_string(&body, MAX_ERROR_BODY_CHARS)
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::transport(format!("Invalid FCM token response: {}", e)))?;
        debug!(expires_in = token.expires_in, "Obtained FCM access token");

        Ok(CachedAccessToken {
            token: token.access_token,
            expires_at: now + chrono::Duration::seconds(token.expires_in),
        })
    }
}

/// Build the HTTP v1 request body for a message.
fn build_payload(message: &PushMessage) -> serde_json::Value {
    json!({
        "message": {
            "token": message.token,
            "notification": {
                "title": message.title,
                "body": message.body,
            }
        }
    })
}

#[async_trait]
impl PushTransport for FcmTransport {
    fn transport_type(&self) -> &'static str {
        "fcm"
    }

    async fn send(&self, message: &PushMessage) -> Result<()> {
        let access_token = self.access_token().await?;

        let response = self
            .client
            .post(self.config.send_url())
            .bearer_auth(access_token)
            .json(&build_payload(message))
            .send()
            .await
            .map_err(|e| Error::transport(format!("FCM request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status == StatusCode::UNAUTHORIZED {
            // Force a fresh token on the next send.
            *self.access_token.write() = None;
        }

        let body = response.text().await.unwrap_or_default();
        let body = truncate_string(&body, MAX_ERROR_BODY_CHARS);
        warn!(status = %status, "FCM rejected message");
        Err(Error::transport(format!(
            "FCM send failed: status {} body {}",
            status, body
        )))
    }
}

fn truncate_string(input: &str, max_chars: usize) -> String {
    let mut iter = input.chars();
    let mut out: String = iter.by_ref().take(max_chars).collect();
    if iter.next().is_some() {
        out.push('…');
    }
    out
}

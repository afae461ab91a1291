pub mod analytics;
pub mod bi;
pub mod salesforce;
pub mod sap;
pub mod totvs;

pub use analytics::AnalyticsConnector;
pub use bi::BiConnector;
pub use salesforce::SalesforceConnector;
pub use sap::SapConnector;
pub use totvs::TotvsConnector;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::models::{ConnectorKind, ConnectorSyncSummary, Result, SyncEngineError};

/// Capability surface every vendor connector implements. The gateway depends
/// only on this trait, never on concrete connector types.
#[async_trait]
pub trait Connector: Send + Sync {
    fn id(&self) -> &str;
    fn kind(&self) -> ConnectorKind;

    /// Acquires or refreshes the bearer token. Returns false on failure so
    /// callers can degrade gracefully instead of unwinding.
    async fn authenticate(&self) -> bool;

    /// Runs every fetch operation the connector exposes and aggregates the
    /// per-entity counts. Individual fetch failures degrade that entity's
    /// count to zero; they never abort the connector sync.
    async fn sync_all(&self) -> ConnectorSyncSummary;

    /// Authenticates and issues one minimal probe call.
    async fn test_connection(&self) -> bool;
}

/// Uniform envelope every vendor fetch operation maps its native response
/// shape into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub data: Value,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorSettings {
    pub base_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl VendorSettings {
    pub fn from_value(connector_id: &str, settings: &Value) -> Result<Self> {
        serde_json::from_value(settings.clone()).map_err(|e| {
            SyncEngineError::Configuration(format!(
                "invalid vendor settings for connector '{}': {}",
                connector_id, e
            ))
        })
    }
}

#[derive(Debug, Default)]
struct TokenState {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    fn is_fresh(&self) -> bool {
        match (&self.token, self.expires_at) {
            (Some(_), Some(expiry)) => Utc::now() < expiry,
            _ => false,
        }
    }
}

/// Shared HTTP client for vendor connectors: bearer-token acquisition with
/// expiry tracking, and an ensure-fresh guard invoked before every remote
/// call.
pub struct VendorClient {
    http: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<TokenState>,
}

impl VendorClient {
    pub fn new(settings: VendorSettings, cfg: Option<&Config>) -> Self {
        let timeout = cfg.map(|c| c.http_timeout_ms).unwrap_or(60_000);
        let ua = cfg
            .map(|c| c.http_user_agent.as_str())
            .unwrap_or("datasync-service/1.0");
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout))
            .user_agent(ua)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            client_id: settings.client_id,
            client_secret: settings.client_secret,
            token: Mutex::new(TokenState::default()),
        }
    }

    pub async fn authenticate(&self) -> bool {
        let mut state = self.token.lock().await;
        self.refresh_token(&mut state).await
    }

    /// Re-authenticates only when the stored token is absent or past its
    /// expiry timestamp.
    async fn ensure_fresh(&self) -> bool {
        let mut state = self.token.lock().await;
        if state.is_fresh() {
            return true;
        }
        self.refresh_token(&mut state).await
    }

    async fn refresh_token(&self, state: &mut TokenState) -> bool {
        let url = format!("{}/oauth/token", self.base_url);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response = match self.http.post(&url).form(&form).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Token request failed");
                return false;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(url = %url, status = %response.status(), "Token request rejected");
            return false;
        }
        let body: Value = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Token response was not valid JSON");
                return false;
            }
        };
        let Some(access_token) = body.get("access_token").and_then(Value::as_str) else {
            tracing::warn!(url = %url, "Token response carried no access_token");
            return false;
        };
        let expires_in = body.get("expires_in").and_then(Value::as_i64).unwrap_or(3600);
        state.token = Some(access_token.to_string());
        state.expires_at = Some(Utc::now() + ChronoDuration::seconds(expires_in));
        tracing::debug!(url = %url, expires_in, "Acquired vendor token");
        true
    }

    /// GET a JSON document from the vendor, ensuring a fresh token first.
    pub async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        if !self.ensure_fresh().await {
            return Err(SyncEngineError::Read(format!(
                "authentication against {} failed",
                self.base_url
            )));
        }
        let token = self.token.lock().await.token.clone().unwrap_or_default();
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncEngineError::Read(format!(
                "request to {} failed with status {}: {}",
                url, status, body
            )));
        }
        Ok(response.json().await?)
    }

    /// Status-only probe; used by `test_connection` where the payload shape
    /// does not matter.
    pub async fn probe(&self, path: &str) -> bool {
        if !self.ensure_fresh().await {
            return false;
        }
        let token = self.token.lock().await.token.clone().unwrap_or_default();
        let url = format!("{}{}", self.base_url, path);
        match self.http.get(&url).bearer_auth(token).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Probe request failed");
                false
            }
        }
    }
}

/// Folds per-entity fetch outcomes into the connector-level aggregate. A
/// failed entity logs, counts as one failed operation, and keeps its zero in
/// `details`; the aggregate stays successful as long as any entity succeeded.
pub(crate) fn summarize_ops(
    connector_id: &str,
    ops: Vec<(&'static str, Result<Vec<VendorRecord>>)>,
) -> ConnectorSyncSummary {
    let total = ops.len();
    let mut summary = ConnectorSyncSummary::default();
    let mut succeeded = 0usize;
    for (entity, outcome) in ops {
        match outcome {
            Ok(records) => {
                succeeded += 1;
                summary.records_synced += records.len() as u64;
                summary.details.insert(entity.to_string(), records.len() as u64);
            }
            Err(e) => {
                tracing::warn!(
                    connector_id,
                    entity,
                    error = %e,
                    "Entity fetch failed; continuing with remaining entities"
                );
                summary.records_failed += 1;
                summary.details.insert(entity.to_string(), 0);
            }
        }
    }
    summary.success = total == 0 || succeeded > 0;
    summary
}

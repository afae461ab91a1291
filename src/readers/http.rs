use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::Config;
use crate::models::{Result, SyncEngineError};

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

pub struct HttpReader {
    client: Client,
}

impl HttpReader {
    pub fn new() -> Self {
        Self::with_config(None)
    }

    pub fn with_config(cfg: Option<&Config>) -> Self {
        let timeout = cfg.map(|c| c.http_timeout_ms).unwrap_or(60_000);
        let ua = cfg
            .map(|c| c.http_user_agent.as_str())
            .unwrap_or("datasync-service/1.0");
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout))
            .user_agent(ua)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    /// Fetches and normalizes a JSON payload into a flat record sequence.
    /// Accepts either a bare array or an envelope object carrying the array
    /// under a conventional key; anything else is a read error.
    pub async fn fetch_records(&self, settings: &HttpSettings) -> Result<Vec<Value>> {
        let mut request = self
            .client
            .get(&settings.url)
            .header("Accept", "application/json");
        for (key, value) in &settings.headers {
            request = request.header(key, value);
        }
        if let Some(token) = &settings.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(secs) = settings.timeout_seconds {
            request = request.timeout(Duration::from_secs(secs));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncEngineError::Read(format!(
                "request to {} failed with status {}: {}",
                settings.url, status, body
            )));
        }

        let body: Value = response.json().await?;
        let records = extract_records(&settings.url, body)?;

        tracing::debug!(
            url = %settings.url,
            record_count = records.len(),
            "Extracted records from API response"
        );

        Ok(records)
    }
}

impl Default for HttpReader {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_records(url: &str, body: Value) -> Result<Vec<Value>> {
    if let Value::Array(items) = body {
        return Ok(items);
    }
    for key in ["data", "items", "results", "records"] {
        if let Some(Value::Array(items)) = body.get(key) {
            return Ok(items.clone());
        }
    }
    Err(SyncEngineError::Read(format!(
        "response from {} is not an array payload or a recognized envelope",
        url
    )))
}

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{summarize_ops, Connector, VendorClient, VendorRecord, VendorSettings};
use crate::config::Config;
use crate::models::{ConnectorConfig, ConnectorKind, ConnectorSyncSummary, Result};

/// Web-analytics connector. Reports come back as `{"rows": [...]}`; rows are
/// aggregates rather than entities, so ones without an id get a synthetic one.
pub struct AnalyticsConnector {
    id: String,
    client: VendorClient,
}

impl AnalyticsConnector {
    pub fn new(config: &ConnectorConfig, cfg: &Config) -> Result<Self> {
        let settings = VendorSettings::from_value(&config.id, &config.settings)?;
        Ok(Self {
            id: config.id.clone(),
            client: VendorClient::new(settings, Some(cfg)),
        })
    }

    pub async fn fetch_sessions(&self) -> Result<Vec<VendorRecord>> {
        self.report("sessions").await
    }

    pub async fn fetch_conversions(&self) -> Result<Vec<VendorRecord>> {
        self.report("conversions").await
    }

    pub async fn fetch_campaigns(&self) -> Result<Vec<VendorRecord>> {
        self.report("campaigns").await
    }

    async fn report(&self, report: &'static str) -> Result<Vec<VendorRecord>> {
        let path = format!("/v2/reports/{}", report);
        let body = self.client.get_json(&path, &[]).await?;
        let rows = body
            .get("rows")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(rows
            .into_iter()
            .map(|row| VendorRecord {
                id: row
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
                entity_type: report.to_string(),
                last_modified: row.get("date").and_then(Value::as_str).map(str::to_string),
                data: row,
            })
            .collect())
    }
}

#[async_trait]
impl Connector for AnalyticsConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::VendorAnalytics
    }

    async fn authenticate(&self) -> bool {
        self.client.authenticate().await
    }

    async fn sync_all(&self) -> ConnectorSyncSummary {
        let ops = vec![
            ("sessions", self.fetch_sessions().await),
            ("conversions", self.fetch_conversions().await),
            ("campaigns", self.fetch_campaigns().await),
        ];
        summarize_ops(&self.id, ops)
    }

    async fn test_connection(&self) -> bool {
        self.client.authenticate().await && self.client.probe("/v2/reports").await
    }
}

use async_trait::async_trait;
use serde_json::Value;

use super::{summarize_ops, Connector, VendorClient, VendorRecord, VendorSettings};
use crate::config::Config;
use crate::models::{ConnectorConfig, ConnectorKind, ConnectorSyncSummary, Result};

/// BI-platform connector. Resource listings come back as bare arrays keyed by
/// `uid`.
pub struct BiConnector {
    id: String,
    client: VendorClient,
}

impl BiConnector {
    pub fn new(config: &ConnectorConfig, cfg: &Config) -> Result<Self> {
        let settings = VendorSettings::from_value(&config.id, &config.settings)?;
        Ok(Self {
            id: config.id.clone(),
            client: VendorClient::new(settings, Some(cfg)),
        })
    }

    pub async fn fetch_dashboards(&self) -> Result<Vec<VendorRecord>> {
        self.listing("dashboards").await
    }

    pub async fn fetch_datasets(&self) -> Result<Vec<VendorRecord>> {
        self.listing("datasets").await
    }

    pub async fn fetch_reports(&self) -> Result<Vec<VendorRecord>> {
        self.listing("reports").await
    }

    async fn listing(&self, resource: &'static str) -> Result<Vec<VendorRecord>> {
        let path = format!("/api/{}", resource);
        let body = self.client.get_json(&path, &[]).await?;
        let rows = body.as_array().cloned().unwrap_or_default();
        Ok(rows
            .into_iter()
            .map(|row| VendorRecord {
                id: row.get("uid").and_then(Value::as_str).unwrap_or_default().to_string(),
                entity_type: resource.to_string(),
                last_modified: row.get("updated_at").and_then(Value::as_str).map(str::to_string),
                data: row,
            })
            .collect())
    }
}

#[async_trait]
impl Connector for BiConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::VendorBi
    }

    async fn authenticate(&self) -> bool {
        self.client.authenticate().await
    }

    async fn sync_all(&self) -> ConnectorSyncSummary {
        let ops = vec![
            ("dashboards", self.fetch_dashboards().await),
            ("datasets", self.fetch_datasets().await),
            ("reports", self.fetch_reports().await),
        ];
        summarize_ops(&self.id, ops)
    }

    async fn test_connection(&self) -> bool {
        self.client.authenticate().await && self.client.probe("/api/health").await
    }
}

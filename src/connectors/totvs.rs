use async_trait::async_trait;
use serde_json::Value;

use super::{summarize_ops, Connector, VendorClient, VendorRecord, VendorSettings};
use crate::config::Config;
use crate::models::{ConnectorConfig, ConnectorKind, ConnectorSyncSummary, Result};

/// ERP connector with a plain REST surface: `{"items": [...]}` envelopes and
/// `code`/`updatedAt` identity fields.
pub struct TotvsConnector {
    id: String,
    client: VendorClient,
}

impl TotvsConnector {
    pub fn new(config: &ConnectorConfig, cfg: &Config) -> Result<Self> {
        let settings = VendorSettings::from_value(&config.id, &config.settings)?;
        Ok(Self {
            id: config.id.clone(),
            client: VendorClient::new(settings, Some(cfg)),
        })
    }

    pub async fn fetch_products(&self) -> Result<Vec<VendorRecord>> {
        self.resource("products").await
    }

    pub async fn fetch_invoices(&self) -> Result<Vec<VendorRecord>> {
        self.resource("invoices").await
    }

    pub async fn fetch_customers(&self) -> Result<Vec<VendorRecord>> {
        self.resource("customers").await
    }

    async fn resource(&self, resource: &'static str) -> Result<Vec<VendorRecord>> {
        let path = format!("/api/v1/{}", resource);
        let body = self.client.get_json(&path, &[]).await?;
        let rows = body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(rows
            .into_iter()
            .map(|row| VendorRecord {
                id: row.get("code").and_then(Value::as_str).unwrap_or_default().to_string(),
                entity_type: resource.to_string(),
                last_modified: row.get("updatedAt").and_then(Value::as_str).map(str::to_string),
                data: row,
            })
            .collect())
    }
}

#[async_trait]
impl Connector for TotvsConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::VendorTotvs
    }

    async fn authenticate(&self) -> bool {
        self.client.authenticate().await
    }

    async fn sync_all(&self) -> ConnectorSyncSummary {
        let ops = vec![
            ("products", self.fetch_products().await),
            ("invoices", self.fetch_invoices().await),
            ("customers", self.fetch_customers().await),
        ];
        summarize_ops(&self.id, ops)
    }

    async fn test_connection(&self) -> bool {
        self.client.authenticate().await && self.client.probe("/api/v1/health").await
    }
}

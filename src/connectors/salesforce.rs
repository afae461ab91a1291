use async_trait::async_trait;
use serde_json::Value;

use super::{summarize_ops, Connector, VendorClient, VendorRecord, VendorSettings};
use crate::config::Config;
use crate::models::{ConnectorConfig, ConnectorKind, ConnectorSyncSummary, Result};

/// CRM connector. Entities are pulled through the SOQL query endpoint; every
/// row carries `Id` and `LastModifiedDate`.
pub struct SalesforceConnector {
    id: String,
    client: VendorClient,
}

impl SalesforceConnector {
    pub fn new(config: &ConnectorConfig, cfg: &Config) -> Result<Self> {
        let settings = VendorSettings::from_value(&config.id, &config.settings)?;
        Ok(Self {
            id: config.id.clone(),
            client: VendorClient::new(settings, Some(cfg)),
        })
    }

    pub async fn fetch_accounts(&self) -> Result<Vec<VendorRecord>> {
        self.query("Account").await
    }

    pub async fn fetch_contacts(&self) -> Result<Vec<VendorRecord>> {
        self.query("Contact").await
    }

    pub async fn fetch_leads(&self) -> Result<Vec<VendorRecord>> {
        self.query("Lead").await
    }

    pub async fn fetch_opportunities(&self) -> Result<Vec<VendorRecord>> {
        self.query("Opportunity").await
    }

    pub async fn fetch_campaigns(&self) -> Result<Vec<VendorRecord>> {
        self.query("Campaign").await
    }

    async fn query(&self, sobject: &str) -> Result<Vec<VendorRecord>> {
        let soql = format!("SELECT FIELDS(STANDARD) FROM {}", sobject);
        let body = self
            .client
            .get_json("/services/data/v59.0/query", &[("q", soql.as_str())])
            .await?;
        let rows = body
            .get("records")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(rows
            .into_iter()
            .map(|mut row| {
                if let Some(obj) = row.as_object_mut() {
                    obj.remove("attributes");
                }
                VendorRecord {
                    id: row.get("Id").and_then(Value::as_str).unwrap_or_default().to_string(),
                    entity_type: sobject.to_lowercase(),
                    last_modified: row
                        .get("LastModifiedDate")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    data: row,
                }
            })
            .collect())
    }
}

#[async_trait]
impl Connector for SalesforceConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::VendorSalesforce
    }

    async fn authenticate(&self) -> bool {
        self.client.authenticate().await
    }

    async fn sync_all(&self) -> ConnectorSyncSummary {
        let ops = vec![
            ("accounts", self.fetch_accounts().await),
            ("contacts", self.fetch_contacts().await),
            ("leads", self.fetch_leads().await),
            ("opportunities", self.fetch_opportunities().await),
            ("campaigns", self.fetch_campaigns().await),
        ];
        summarize_ops(&self.id, ops)
    }

    async fn test_connection(&self) -> bool {
        self.client.authenticate().await && self.client.probe("/services/data").await
    }
}

use async_trait::async_trait;
use serde_json::Value;

use super::{summarize_ops, Connector, VendorClient, VendorRecord, VendorSettings};
use crate::config::Config;
use crate::models::{ConnectorConfig, ConnectorKind, ConnectorSyncSummary, Result};

/// ERP connector speaking OData v2: entity sets come back wrapped in
/// `{"d": {"results": [...]}}` and each row names its own key field.
pub struct SapConnector {
    id: String,
    client: VendorClient,
}

impl SapConnector {
    pub fn new(config: &ConnectorConfig, cfg: &Config) -> Result<Self> {
        let settings = VendorSettings::from_value(&config.id, &config.settings)?;
        Ok(Self {
            id: config.id.clone(),
            client: VendorClient::new(settings, Some(cfg)),
        })
    }

    pub async fn fetch_materials(&self) -> Result<Vec<VendorRecord>> {
        self.entity_set("MaterialSet", "materials", "Material").await
    }

    pub async fn fetch_sales_orders(&self) -> Result<Vec<VendorRecord>> {
        self.entity_set("SalesOrderSet", "sales_orders", "SalesOrder").await
    }

    pub async fn fetch_customers(&self) -> Result<Vec<VendorRecord>> {
        self.entity_set("CustomerSet", "customers", "Customer").await
    }

    async fn entity_set(
        &self,
        set: &str,
        entity_type: &str,
        key_field: &str,
    ) -> Result<Vec<VendorRecord>> {
        let path = format!("/sap/opu/odata/{}", set);
        let body = self.client.get_json(&path, &[("$format", "json")]).await?;
        let rows = body
            .pointer("/d/results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(rows
            .into_iter()
            .map(|mut row| {
                if let Some(obj) = row.as_object_mut() {
                    obj.remove("__metadata");
                }
                VendorRecord {
                    id: row
                        .get(key_field)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    entity_type: entity_type.to_string(),
                    last_modified: row.get("ChangedAt").and_then(Value::as_str).map(str::to_string),
                    data: row,
                }
            })
            .collect())
    }
}

#[async_trait]
impl Connector for SapConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::VendorSap
    }

    async fn authenticate(&self) -> bool {
        self.client.authenticate().await
    }

    async fn sync_all(&self) -> ConnectorSyncSummary {
        let ops = vec![
            ("materials", self.fetch_materials().await),
            ("sales_orders", self.fetch_sales_orders().await),
            ("customers", self.fetch_customers().await),
        ];
        summarize_ops(&self.id, ops)
    }

    async fn test_connection(&self) -> bool {
        self.client.authenticate().await && self.client.probe("/sap/opu/odata/$metadata").await
    }
}

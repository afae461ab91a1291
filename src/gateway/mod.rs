use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::Config;
use crate::connectors::{
    AnalyticsConnector, BiConnector, Connector, SalesforceConnector, SapConnector, TotvsConnector,
};
use crate::models::{ConnectorConfig, ConnectorKind, ConnectorSyncSummary, Result, SyncEngineError};
use crate::readers::{
    CsvReader, CsvSettings, ExcelReader, ExcelSettings, HttpReader, HttpSettings, SqlReader,
    SqlSettings,
};

/// What one dispatch produced: raw records for reader-backed kinds, or the
/// connector's own aggregate for vendor kinds.
pub enum SourcePayload {
    Records(Vec<serde_json::Value>),
    Vendor(ConnectorSyncSummary),
}

/// Registry mapping connector ids to configuration and connector instances.
/// Pure dispatch: the gateway holds no sync history, so the orchestrator and
/// ledger can be swapped without touching connector logic.
pub struct ConnectorGateway {
    cfg: Config,
    configs: RwLock<HashMap<String, ConnectorConfig>>,
    connectors: RwLock<HashMap<String, Arc<dyn Connector>>>,
}

impl ConnectorGateway {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            configs: RwLock::new(HashMap::new()),
            connectors: RwLock::new(HashMap::new()),
        }
    }

    /// Registers one external system. Vendor kinds get their connector
    /// instance built here; re-registering an id replaces both.
    pub fn register(&self, config: ConnectorConfig) -> Result<()> {
        if config.kind.is_vendor() {
            let connector: Arc<dyn Connector> = match config.kind {
                ConnectorKind::VendorSalesforce => {
                    Arc::new(SalesforceConnector::new(&config, &self.cfg)?)
                }
                ConnectorKind::VendorSap => Arc::new(SapConnector::new(&config, &self.cfg)?),
                ConnectorKind::VendorTotvs => Arc::new(TotvsConnector::new(&config, &self.cfg)?),
                ConnectorKind::VendorAnalytics => {
                    Arc::new(AnalyticsConnector::new(&config, &self.cfg)?)
                }
                ConnectorKind::VendorBi => Arc::new(BiConnector::new(&config, &self.cfg)?),
                _ => unreachable!("non-vendor kinds have no connector instance"),
            };
            self.connectors
                .write()
                .expect("connector map poisoned")
                .insert(config.id.clone(), connector);
        }
        tracing::info!(connector_id = %config.id, kind = config.kind.as_str(), "Registered connector");
        self.configs
            .write()
            .expect("config map poisoned")
            .insert(config.id.clone(), config);
        Ok(())
    }

    pub fn config(&self, id: &str) -> Option<ConnectorConfig> {
        self.configs.read().expect("config map poisoned").get(id).cloned()
    }

    /// All registered configs, ordered by id for deterministic iteration.
    pub fn all_configs(&self) -> Vec<ConnectorConfig> {
        let mut configs: Vec<ConnectorConfig> = self
            .configs
            .read()
            .expect("config map poisoned")
            .values()
            .cloned()
            .collect();
        configs.sort_by(|a, b| a.id.cmp(&b.id));
        configs
    }

    pub fn connector(&self, id: &str) -> Option<Arc<dyn Connector>> {
        self.connectors.read().expect("connector map poisoned").get(id).cloned()
    }

    /// Dispatches one sync to the matching reader or connector.
    pub async fn sync(&self, id: &str) -> Result<SourcePayload> {
        let config = self
            .config(id)
            .ok_or_else(|| SyncEngineError::UnknownConnector(id.to_string()))?;
        if config.kind.is_vendor() {
            let connector = self
                .connector(id)
                .ok_or_else(|| SyncEngineError::UnknownConnector(id.to_string()))?;
            return Ok(SourcePayload::Vendor(connector.sync_all().await));
        }
        Ok(SourcePayload::Records(self.fetch_records(&config).await?))
    }

    async fn fetch_records(&self, config: &ConnectorConfig) -> Result<Vec<serde_json::Value>> {
        match config.kind {
            ConnectorKind::FileCsv => {
                let settings: CsvSettings = self.parse_settings(config)?;
                CsvReader::new().read_records(&settings)
            }
            ConnectorKind::FileExcel => {
                let settings: ExcelSettings = self.parse_settings(config)?;
                ExcelReader::new().read_records(&settings)
            }
            ConnectorKind::HttpApi => {
                let settings: HttpSettings = self.parse_settings(config)?;
                HttpReader::with_config(Some(&self.cfg)).fetch_records(&settings).await
            }
            ConnectorKind::SqlPostgres => {
                let settings: SqlSettings = self.parse_settings(config)?;
                SqlReader::with_config(Some(&self.cfg)).fetch_postgres(&settings).await
            }
            ConnectorKind::SqlMysql => {
                let settings: SqlSettings = self.parse_settings(config)?;
                SqlReader::with_config(Some(&self.cfg)).fetch_mysql(&settings).await
            }
            _ => Err(SyncEngineError::Configuration(format!(
                "connector '{}' has no reader-backed source",
                config.id
            ))),
        }
    }

    /// Authenticates and probes a vendor connector, or attempts one fetch for
    /// a reader-backed source. Failures come back as `false`, not errors;
    /// only an unknown id is an error.
    pub async fn test_connector(&self, id: &str) -> Result<bool> {
        let config = self
            .config(id)
            .ok_or_else(|| SyncEngineError::UnknownConnector(id.to_string()))?;
        if config.kind.is_vendor() {
            let connector = self
                .connector(id)
                .ok_or_else(|| SyncEngineError::UnknownConnector(id.to_string()))?;
            return Ok(connector.test_connection().await);
        }
        match self.fetch_records(&config).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::debug!(connector_id = %id, error = %e, "Connection test failed");
                Ok(false)
            }
        }
    }

    fn parse_settings<T: serde::de::DeserializeOwned>(&self, config: &ConnectorConfig) -> Result<T> {
        serde_json::from_value(config.settings.clone()).map_err(|e| {
            SyncEngineError::Configuration(format!(
                "invalid {} settings for connector '{}': {}",
                config.kind.as_str(),
                config.id,
                e
            ))
        })
    }
}

/// Loads connector definitions from the provisioning document, a JSON array
/// of `ConnectorConfig` objects.
pub fn load_connector_configs(path: &str) -> Result<Vec<ConnectorConfig>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        SyncEngineError::Configuration(format!("cannot read connectors file '{}': {}", path, e))
    })?;
    let configs: Vec<ConnectorConfig> = serde_json::from_str(&text)?;
    Ok(configs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gateway() -> ConnectorGateway {
        ConnectorGateway::new(Config::default_for_tests())
    }

    fn csv_config(id: &str) -> ConnectorConfig {
        ConnectorConfig {
            id: id.to_string(),
            name: id.to_string(),
            kind: ConnectorKind::FileCsv,
            settings: json!({"path": "/tmp/nonexistent.csv"}),
            mapping: Default::default(),
            schema: Default::default(),
            unique_fields: vec![],
        }
    }

    #[tokio::test]
    async fn unknown_connector_is_an_error() {
        let err = gateway().sync("nope").await.err().unwrap();
        assert!(matches!(err, SyncEngineError::UnknownConnector(_)));
    }

    #[test]
    fn register_and_lookup_round_trip() {
        let g = gateway();
        g.register(csv_config("files-a")).unwrap();
        g.register(csv_config("files-b")).unwrap();
        assert!(g.config("files-a").is_some());
        assert_eq!(
            g.all_configs().iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec!["files-a", "files-b"]
        );
    }

    #[tokio::test]
    async fn test_connector_reports_false_on_unreachable_source() {
        let g = gateway();
        g.register(csv_config("files-a")).unwrap();
        assert!(!g.test_connector("files-a").await.unwrap());
    }
}

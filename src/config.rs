use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Memory,
    Mongodb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub mongodb_uri: String,
    pub database_name: String,
    pub ledger_backend: LedgerBackend,
    /// JSON document with the connector definitions to register at startup.
    pub connectors_file: Option<String>,
    pub http_timeout_ms: u64,
    pub http_user_agent: String,
    pub sql_timeout_ms: u64,
    pub enable_scheduler: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let get = |k: &str| std::env::var(k).ok();

        let mongodb_uri = get("MONGODB_URI").unwrap_or_else(|| "mongodb://localhost:27017".to_string());
        let database_name = get("DATABASE_NAME").unwrap_or_else(|| "datasync".to_string());
        let ledger_backend = match get("LEDGER_BACKEND").as_deref() {
            Some("mongodb") => LedgerBackend::Mongodb,
            Some("memory") | None => LedgerBackend::Memory,
            Some(other) => {
                tracing::warn!(backend = other, "Unknown LEDGER_BACKEND; falling back to memory");
                LedgerBackend::Memory
            }
        };
        let connectors_file = get("CONNECTORS_FILE");
        let port: u16 = get("PORT").and_then(|s| s.parse().ok()).unwrap_or(8092);
        let http_timeout_ms: u64 = get("HTTP_TIMEOUT_MS").and_then(|s| s.parse().ok()).unwrap_or(60000);
        let http_user_agent = get("HTTP_USER_AGENT").unwrap_or_else(|| "datasync-service/1.0".to_string());
        let sql_timeout_ms: u64 = get("SQL_TIMEOUT_MS").and_then(|s| s.parse().ok()).unwrap_or(60000);
        let enable_scheduler: bool = get("ENABLE_SCHEDULER").and_then(|s| s.parse().ok()).unwrap_or(true);

        Self {
            port,
            mongodb_uri,
            database_name,
            ledger_backend,
            connectors_file,
            http_timeout_ms,
            http_user_agent,
            sql_timeout_ms,
            enable_scheduler,
        }
    }

    /// In-memory everything with short timeouts; used by unit and
    /// integration tests.
    pub fn default_for_tests() -> Self {
        Self {
            port: 0,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            database_name: "datasync-test".to_string(),
            ledger_backend: LedgerBackend::Memory,
            connectors_file: None,
            http_timeout_ms: 5000,
            http_user_agent: "datasync-service/test".to_string(),
            sql_timeout_ms: 5000,
            enable_scheduler: false,
        }
    }
}

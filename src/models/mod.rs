pub mod sync;

pub use sync::*;
use serde::{Deserialize, Serialize};

/// The enumerated set of external-system kinds a connector can be registered
/// for. Reader-backed kinds feed the transform/validate/dedupe pipeline;
/// vendor kinds report their own aggregate through `sync_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorKind {
    FileCsv,
    FileExcel,
    HttpApi,
    SqlPostgres,
    SqlMysql,
    VendorSalesforce,
    VendorSap,
    VendorTotvs,
    VendorAnalytics,
    VendorBi,
}

/// Connectors whose data is considered operationally critical; the dedicated
/// critical-sync job targets exactly these kinds.
pub const CRITICAL_KINDS: [ConnectorKind; 3] = [
    ConnectorKind::VendorSalesforce,
    ConnectorKind::VendorSap,
    ConnectorKind::VendorTotvs,
];

impl ConnectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorKind::FileCsv => "file-csv",
            ConnectorKind::FileExcel => "file-excel",
            ConnectorKind::HttpApi => "http-api",
            ConnectorKind::SqlPostgres => "sql-postgres",
            ConnectorKind::SqlMysql => "sql-mysql",
            ConnectorKind::VendorSalesforce => "vendor-salesforce",
            ConnectorKind::VendorSap => "vendor-sap",
            ConnectorKind::VendorTotvs => "vendor-totvs",
            ConnectorKind::VendorAnalytics => "vendor-analytics",
            ConnectorKind::VendorBi => "vendor-bi",
        }
    }

    pub fn is_vendor(&self) -> bool {
        matches!(
            self,
            ConnectorKind::VendorSalesforce
                | ConnectorKind::VendorSap
                | ConnectorKind::VendorTotvs
                | ConnectorKind::VendorAnalytics
                | ConnectorKind::VendorBi
        )
    }

    pub fn is_critical(&self) -> bool {
        CRITICAL_KINDS.contains(self)
    }
}

/// Identity and per-source pipeline declarations for one external system.
/// Immutable after registration; owned exclusively by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub id: String,
    pub name: String,
    pub kind: ConnectorKind,
    /// Free-form blob: credentials, URLs, file paths, query text. Each reader
    /// or vendor client deserializes the shape it needs at sync time.
    #[serde(default)]
    pub settings: serde_json::Value,
    #[serde(default)]
    pub mapping: FieldMapping,
    #[serde(default)]
    pub schema: ValidationSchema,
    #[serde(default)]
    pub unique_fields: Vec<String>,
}

/// Ordered source-to-target field declarations for the transform stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldMapping {
    pub rules: Vec<FieldRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    pub source_field: String,
    pub target_field: String,
    #[serde(default)]
    pub data_type: Option<FieldType>,
    #[serde(default)]
    pub validators: Vec<String>,
    #[serde(default)]
    pub transform: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
        }
    }
}

/// Declared target-field types checked by the validation stage. Declaration
/// order is preserved so per-record error lists come out deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSchema {
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    pub field: String,
    pub field_type: FieldType,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncEngineError {
    #[error("read error: {0}")]
    Read(String),

    #[error("transform error: {0}")]
    Transform(String),

    #[error("unknown connector: {0}")]
    UnknownConnector(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("invalid schedule '{0}': {1}")]
    InvalidSchedule(String, String),

    #[error("alert not found: {0}")]
    AlertNotFound(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV parsing error: {0}")]
    CsvParsing(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, SyncEngineError>;

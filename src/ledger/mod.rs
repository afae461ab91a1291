pub mod memory;
pub mod mongo;

pub use memory::MemoryLedger;
pub use mongo::MongoLedger;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::{Config, LedgerBackend};
use crate::models::{
    Alert, ConnectorStatus, Result, SyncJob, SyncResult, SyncStats, SyncStatus,
};

/// Sync-log rows older than this are eligible for deletion by the purge job.
pub const LOG_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub connector_id: Option<String>,
    pub status: Option<SyncStatus>,
    pub limit: Option<usize>,
}

/// Durable record of every sync attempt, the rolling per-connector status,
/// unresolved alerts, and persisted job definitions. The orchestrator and
/// scheduler depend only on this trait; backends are interchangeable.
#[async_trait]
pub trait SyncLedger: Send + Sync {
    /// Appends one immutable sync-log row, folds the outcome into the
    /// connector's rolling status, and opens an alert when the result is an
    /// error. Per-connector calls are serialized by the orchestrator's
    /// in-flight guard.
    async fn record_sync(&self, result: &SyncResult) -> Result<()>;

    /// Log rows matching the filter, newest-first.
    async fn sync_logs(&self, filter: LogFilter) -> Result<Vec<SyncResult>>;

    async fn connector_status(&self, connector_id: &str) -> Result<Option<ConnectorStatus>>;

    async fn connector_statuses(&self) -> Result<Vec<ConnectorStatus>>;

    async fn unresolved_alerts(&self) -> Result<Vec<Alert>>;

    /// Marks one alert resolved and stamps `resolved_at`.
    async fn resolve_alert(&self, alert_id: &str) -> Result<Alert>;

    /// One connector's aggregate, or a fleet-wide summary when no id is
    /// given.
    async fn sync_stats(&self, connector_id: Option<&str>) -> Result<SyncStats>;

    /// Deletes log rows started before the cutoff; returns the deleted count.
    async fn purge_logs_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn upsert_job(&self, job: &SyncJob) -> Result<()>;

    async fn set_job_active(&self, job_id: &str, active: bool) -> Result<()>;

    async fn jobs(&self) -> Result<Vec<SyncJob>>;
}

/// Builds the backend selected by configuration.
pub async fn build_ledger(cfg: &Config) -> Result<Arc<dyn SyncLedger>> {
    match cfg.ledger_backend {
        LedgerBackend::Memory => Ok(Arc::new(MemoryLedger::new())),
        LedgerBackend::Mongodb => {
            let client_options = mongodb::options::ClientOptions::parse(&cfg.mongodb_uri).await?;
            let client = mongodb::Client::with_options(client_options)?;
            let db = client.database(&cfg.database_name);
            Ok(Arc::new(MongoLedger::new(db)))
        }
    }
}

pub(crate) fn stats_from_statuses(statuses: &[ConnectorStatus]) -> SyncStats {
    let mut stats = SyncStats {
        connectors: statuses.len() as u64,
        total_syncs: 0,
        successful_syncs: 0,
        failed_syncs: 0,
        total_records_synced: 0,
        success_rate: 0.0,
    };
    for status in statuses {
        stats.total_syncs += status.total_syncs;
        stats.successful_syncs += status.successful_syncs;
        stats.failed_syncs += status.failed_syncs;
        stats.total_records_synced += status.total_records_synced;
    }
    if !statuses.is_empty() {
        stats.success_rate =
            statuses.iter().map(ConnectorStatus::success_rate).sum::<f64>() / statuses.len() as f64;
    }
    stats
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use super::{stats_from_statuses, LogFilter, SyncLedger};
use crate::models::{
    Alert, ConnectorStatus, Result, SyncEngineError, SyncJob, SyncResult, SyncStats, SyncStatus,
};

#[derive(Default)]
struct Inner {
    logs: Vec<SyncResult>,
    statuses: HashMap<String, ConnectorStatus>,
    alerts: Vec<Alert>,
    jobs: HashMap<String, SyncJob>,
}

/// Ledger backend holding everything in process memory. Used by tests and by
/// ephemeral deployments that do not need history across restarts.
#[derive(Default)]
pub struct MemoryLedger {
    inner: RwLock<Inner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncLedger for MemoryLedger {
    async fn record_sync(&self, result: &SyncResult) -> Result<()> {
        let mut inner = self.inner.write().expect("ledger lock poisoned");
        inner.logs.push(result.clone());
        inner
            .statuses
            .entry(result.connector_id.clone())
            .or_insert_with(|| ConnectorStatus::new(&result.connector_id))
            .apply(result);
        if result.status == SyncStatus::Error {
            let message = result
                .errors
                .first()
                .cloned()
                .unwrap_or_else(|| "sync failed".to_string());
            inner.alerts.push(Alert::open(&result.connector_id, message));
        }
        Ok(())
    }

    async fn sync_logs(&self, filter: LogFilter) -> Result<Vec<SyncResult>> {
        let inner = self.inner.read().expect("ledger lock poisoned");
        let mut logs: Vec<SyncResult> = inner
            .logs
            .iter()
            .filter(|log| {
                filter
                    .connector_id
                    .as_deref()
                    .map(|id| log.connector_id == id)
                    .unwrap_or(true)
                    && filter.status.map(|s| log.status == s).unwrap_or(true)
            })
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        if let Some(limit) = filter.limit {
            logs.truncate(limit);
        }
        Ok(logs)
    }

    async fn connector_status(&self, connector_id: &str) -> Result<Option<ConnectorStatus>> {
        let inner = self.inner.read().expect("ledger lock poisoned");
        Ok(inner.statuses.get(connector_id).cloned())
    }

    async fn connector_statuses(&self) -> Result<Vec<ConnectorStatus>> {
        let inner = self.inner.read().expect("ledger lock poisoned");
        let mut statuses: Vec<ConnectorStatus> = inner.statuses.values().cloned().collect();
        statuses.sort_by(|a, b| a.connector_id.cmp(&b.connector_id));
        Ok(statuses)
    }

    async fn unresolved_alerts(&self) -> Result<Vec<Alert>> {
        let inner = self.inner.read().expect("ledger lock poisoned");
        Ok(inner.alerts.iter().filter(|a| !a.is_resolved).cloned().collect())
    }

    async fn resolve_alert(&self, alert_id: &str) -> Result<Alert> {
        let mut inner = self.inner.write().expect("ledger lock poisoned");
        let alert = inner
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| SyncEngineError::AlertNotFound(alert_id.to_string()))?;
        alert.is_resolved = true;
        alert.resolved_at = Some(Utc::now());
        Ok(alert.clone())
    }

    async fn sync_stats(&self, connector_id: Option<&str>) -> Result<SyncStats> {
        let inner = self.inner.read().expect("ledger lock poisoned");
        let statuses: Vec<ConnectorStatus> = match connector_id {
            Some(id) => inner.statuses.get(id).cloned().into_iter().collect(),
            None => inner.statuses.values().cloned().collect(),
        };
        Ok(stats_from_statuses(&statuses))
    }

    async fn purge_logs_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.write().expect("ledger lock poisoned");
        let before = inner.logs.len();
        inner.logs.retain(|log| log.started_at >= cutoff);
        Ok((before - inner.logs.len()) as u64)
    }

    async fn upsert_job(&self, job: &SyncJob) -> Result<()> {
        let mut inner = self.inner.write().expect("ledger lock poisoned");
        inner.jobs.insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    async fn set_job_active(&self, job_id: &str, active: bool) -> Result<()> {
        let mut inner = self.inner.write().expect("ledger lock poisoned");
        let job = inner
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| SyncEngineError::JobNotFound(job_id.to_string()))?;
        job.is_active = active;
        Ok(())
    }

    async fn jobs(&self) -> Result<Vec<SyncJob>> {
        let inner = self.inner.read().expect("ledger lock poisoned");
        let mut jobs: Vec<SyncJob> = inner.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        Ok(jobs)
    }
}

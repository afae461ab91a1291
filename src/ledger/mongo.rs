use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOptions, ReplaceOptions};
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use super::{stats_from_statuses, LogFilter, SyncLedger};
use crate::models::{
    Alert, ConnectorStatus, Result, SyncEngineError, SyncJob, SyncResult, SyncStats, SyncStatus,
};

/// Log rows carry a millisecond timestamp beside the result so sorting and
/// purge cutoffs work on an integer field.
#[derive(Debug, Serialize, Deserialize)]
struct SyncLogRow {
    started_at_ms: i64,
    result: SyncResult,
}

/// Ledger backend persisted in MongoDB; collections are created lazily on
/// first write.
pub struct MongoLedger {
    db: Database,
}

impl MongoLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn logs(&self) -> Collection<SyncLogRow> {
        self.db.collection("sync_logs")
    }

    fn statuses(&self) -> Collection<ConnectorStatus> {
        self.db.collection("connector_status")
    }

    fn alerts(&self) -> Collection<Alert> {
        self.db.collection("alerts")
    }

    fn jobs_collection(&self) -> Collection<SyncJob> {
        self.db.collection("sync_jobs")
    }
}

#[async_trait]
impl SyncLedger for MongoLedger {
    async fn record_sync(&self, result: &SyncResult) -> Result<()> {
        self.logs()
            .insert_one(
                SyncLogRow {
                    started_at_ms: result.started_at.timestamp_millis(),
                    result: result.clone(),
                },
                None,
            )
            .await?;

        let filter = doc! { "connector_id": &result.connector_id };
        let mut status = self
            .statuses()
            .find_one(filter.clone(), None)
            .await?
            .unwrap_or_else(|| ConnectorStatus::new(&result.connector_id));
        status.apply(result);
        let options = ReplaceOptions::builder().upsert(true).build();
        self.statuses().replace_one(filter, &status, options).await?;

        if result.status == SyncStatus::Error {
            let message = result
                .errors
                .first()
                .cloned()
                .unwrap_or_else(|| "sync failed".to_string());
            self.alerts()
                .insert_one(Alert::open(&result.connector_id, message), None)
                .await?;
        }
        Ok(())
    }

    async fn sync_logs(&self, filter: LogFilter) -> Result<Vec<SyncResult>> {
        let mut query = doc! {};
        if let Some(connector_id) = &filter.connector_id {
            query.insert("result.connector_id", connector_id);
        }
        if let Some(status) = filter.status {
            query.insert("result.status", status.as_str());
        }
        let options = FindOptions::builder()
            .sort(doc! { "started_at_ms": -1 })
            .limit(filter.limit.map(|l| l as i64))
            .build();

        let mut cursor = self.logs().find(query, options).await?;
        let mut logs = Vec::new();
        while let Some(row) = cursor.next().await {
            logs.push(row?.result);
        }
        Ok(logs)
    }

    async fn connector_status(&self, connector_id: &str) -> Result<Option<ConnectorStatus>> {
        self.statuses()
            .find_one(doc! { "connector_id": connector_id }, None)
            .await
            .map_err(Into::into)
    }

    async fn connector_statuses(&self) -> Result<Vec<ConnectorStatus>> {
        let options = FindOptions::builder().sort(doc! { "connector_id": 1 }).build();
        let mut cursor = self.statuses().find(doc! {}, options).await?;
        let mut statuses = Vec::new();
        while let Some(status) = cursor.next().await {
            statuses.push(status?);
        }
        Ok(statuses)
    }

    async fn unresolved_alerts(&self) -> Result<Vec<Alert>> {
        let mut cursor = self.alerts().find(doc! { "is_resolved": false }, None).await?;
        let mut alerts = Vec::new();
        while let Some(alert) = cursor.next().await {
            alerts.push(alert?);
        }
        Ok(alerts)
    }

    async fn resolve_alert(&self, alert_id: &str) -> Result<Alert> {
        let filter = doc! { "id": alert_id };
        let mut alert = self
            .alerts()
            .find_one(filter.clone(), None)
            .await?
            .ok_or_else(|| SyncEngineError::AlertNotFound(alert_id.to_string()))?;
        alert.is_resolved = true;
        alert.resolved_at = Some(Utc::now());
        self.alerts().replace_one(filter, &alert, None).await?;
        Ok(alert)
    }

    async fn sync_stats(&self, connector_id: Option<&str>) -> Result<SyncStats> {
        let statuses = match connector_id {
            Some(id) => self.connector_status(id).await?.into_iter().collect(),
            None => self.connector_statuses().await?,
        };
        Ok(stats_from_statuses(&statuses))
    }

    async fn purge_logs_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = self
            .logs()
            .delete_many(doc! { "started_at_ms": { "$lt": cutoff.timestamp_millis() } }, None)
            .await?;
        Ok(result.deleted_count)
    }

    async fn upsert_job(&self, job: &SyncJob) -> Result<()> {
        let options = ReplaceOptions::builder().upsert(true).build();
        self.jobs_collection()
            .replace_one(doc! { "job_id": &job.job_id }, job, options)
            .await?;
        Ok(())
    }

    async fn set_job_active(&self, job_id: &str, active: bool) -> Result<()> {
        let result = self
            .jobs_collection()
            .update_one(
                doc! { "job_id": job_id },
                doc! { "$set": { "is_active": active } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(SyncEngineError::JobNotFound(job_id.to_string()));
        }
        Ok(())
    }

    async fn jobs(&self) -> Result<Vec<SyncJob>> {
        let options = FindOptions::builder().sort(doc! { "job_id": 1 }).build();
        let mut cursor = self.jobs_collection().find(doc! {}, options).await?;
        let mut jobs = Vec::new();
        while let Some(job) = cursor.next().await {
            jobs.push(job?);
        }
        Ok(jobs)
    }
}

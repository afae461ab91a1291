use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::ledger::{SyncLedger, LOG_RETENTION_DAYS};
use crate::models::{JobBehavior, Result, SyncEngineError, SyncJob};
use crate::orchestrator::SyncOrchestrator;

#[derive(Debug, Clone)]
pub struct CreateJobRequest {
    pub job_id: String,
    /// Six-field cron expression with seconds, e.g. `0 0 * * * *`.
    pub schedule: String,
    pub behavior: JobBehavior,
    pub connector_id: Option<String>,
    pub description: Option<String>,
}

/// Owns the live timers for all named recurring jobs. Job rows are persisted
/// through the ledger so stopped jobs stay visible for audit. The scheduler
/// never serializes overlapping firings itself; the orchestrator's
/// per-connector guard skips a firing whose target is still in flight.
pub struct SyncScheduler {
    scheduler: JobScheduler,
    orchestrator: Arc<SyncOrchestrator>,
    ledger: Arc<dyn SyncLedger>,
    jobs: Arc<Mutex<HashMap<String, Uuid>>>,
}

impl SyncScheduler {
    pub async fn new(orchestrator: Arc<SyncOrchestrator>, ledger: Arc<dyn SyncLedger>) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SyncEngineError::Scheduler(e.to_string()))?;
        Ok(Self {
            scheduler,
            orchestrator,
            ledger,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| SyncEngineError::Scheduler(e.to_string()))
    }

    /// Validates the schedule, replaces any live timer already registered
    /// under the same job id, and persists the job row. Re-creation is
    /// idempotent: afterwards exactly one timer exists, on the new schedule.
    pub async fn create_job(&self, request: CreateJobRequest) -> Result<SyncJob> {
        cron::Schedule::from_str(&request.schedule)
            .map_err(|e| SyncEngineError::InvalidSchedule(request.schedule.clone(), e.to_string()))?;

        let orchestrator = self.orchestrator.clone();
        let ledger = self.ledger.clone();
        let behavior = request.behavior;
        let connector_id = request.connector_id.clone();
        let job_id = request.job_id.clone();
        let job = Job::new_async(request.schedule.as_str(), move |_uuid, _lock| {
            let orchestrator = orchestrator.clone();
            let ledger = ledger.clone();
            let connector_id = connector_id.clone();
            let job_id = job_id.clone();
            Box::pin(async move {
                run_job(&job_id, behavior, connector_id.as_deref(), orchestrator, ledger).await;
            })
        })
        .map_err(|e| SyncEngineError::InvalidSchedule(request.schedule.clone(), e.to_string()))?;

        let mut jobs = self.jobs.lock().await;
        if let Some(old) = jobs.remove(&request.job_id) {
            if let Err(e) = self.scheduler.remove(&old).await {
                tracing::warn!(job_id = %request.job_id, error = %e, "Failed to remove replaced timer");
            }
        }
        let uuid = self
            .scheduler
            .add(job)
            .await
            .map_err(|e| SyncEngineError::Scheduler(e.to_string()))?;
        jobs.insert(request.job_id.clone(), uuid);
        drop(jobs);

        let row = SyncJob {
            job_id: request.job_id,
            schedule: request.schedule,
            behavior: request.behavior,
            connector_id: request.connector_id,
            description: request.description,
            is_active: true,
            created_at: Utc::now(),
        };
        self.ledger.upsert_job(&row).await?;
        tracing::info!(job_id = %row.job_id, schedule = %row.schedule, behavior = row.behavior.as_str(), "Scheduled job");
        Ok(row)
    }

    /// Cancels the live timer and marks the persisted row inactive. Work
    /// already dispatched by a previous firing is not aborted.
    pub async fn stop_job(&self, job_id: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        let uuid = jobs
            .remove(job_id)
            .ok_or_else(|| SyncEngineError::JobNotFound(job_id.to_string()))?;
        drop(jobs);
        self.scheduler
            .remove(&uuid)
            .await
            .map_err(|e| SyncEngineError::Scheduler(e.to_string()))?;
        self.ledger.set_job_active(job_id, false).await?;
        tracing::info!(job_id, "Stopped job");
        Ok(())
    }

    pub async fn stop_all_jobs(&self) -> Result<usize> {
        let job_ids: Vec<String> = self.jobs.lock().await.keys().cloned().collect();
        let mut stopped = 0;
        for job_id in job_ids {
            match self.stop_job(&job_id).await {
                Ok(()) => stopped += 1,
                Err(e) => tracing::warn!(job_id = %job_id, error = %e, "Failed to stop job"),
            }
        }
        Ok(stopped)
    }

    /// Stops everything and re-registers the fixed default jobs.
    pub async fn restart_all_jobs(&self) -> Result<Vec<SyncJob>> {
        self.stop_all_jobs().await?;
        let mut rows = Vec::new();
        for request in default_jobs() {
            rows.push(self.create_job(request).await?);
        }
        Ok(rows)
    }

    pub async fn active_job_count(&self) -> usize {
        self.jobs.lock().await.len()
    }
}

/// The canned schedule set registered at startup and by `restart_all_jobs`.
pub fn default_jobs() -> Vec<CreateJobRequest> {
    vec![
        CreateJobRequest {
            job_id: "hourly-full-sync".to_string(),
            schedule: "0 0 * * * *".to_string(),
            behavior: JobBehavior::SyncAll,
            connector_id: None,
            description: Some("Sync all connectors every hour".to_string()),
        },
        CreateJobRequest {
            job_id: "nightly-full-sync".to_string(),
            schedule: "0 0 2 * * *".to_string(),
            behavior: JobBehavior::SyncAll,
            connector_id: None,
            description: Some("Nightly full sync at 02:00".to_string()),
        },
        CreateJobRequest {
            job_id: "critical-sync".to_string(),
            schedule: "0 0/30 * * * *".to_string(),
            behavior: JobBehavior::SyncCritical,
            connector_id: None,
            description: Some("Sync critical connectors every 30 minutes".to_string()),
        },
        CreateJobRequest {
            job_id: "log-purge".to_string(),
            schedule: "0 0 3 * * *".to_string(),
            behavior: JobBehavior::PurgeHistory,
            connector_id: None,
            description: Some(format!("Purge sync logs older than {} days", LOG_RETENTION_DAYS)),
        },
    ]
}

async fn run_job(
    job_id: &str,
    behavior: JobBehavior,
    connector_id: Option<&str>,
    orchestrator: Arc<SyncOrchestrator>,
    ledger: Arc<dyn SyncLedger>,
) {
    tracing::debug!(job_id, behavior = behavior.as_str(), "Job fired");
    match behavior {
        JobBehavior::SyncConnector => {
            let Some(connector_id) = connector_id else {
                tracing::error!(job_id, "Job is bound to no connector; nothing to sync");
                return;
            };
            if let Err(e) = orchestrator.execute_sync(connector_id).await {
                tracing::error!(job_id, connector_id, error = %e, "Scheduled sync failed");
            }
        }
        JobBehavior::SyncAll => {
            let results = orchestrator.sync_all_connectors().await;
            tracing::info!(job_id, synced = results.len(), "Full sync pass finished");
        }
        JobBehavior::SyncCritical => {
            let results = orchestrator.sync_critical_connectors().await;
            tracing::info!(job_id, synced = results.len(), "Critical sync pass finished");
        }
        JobBehavior::PurgeHistory => {
            let cutoff = Utc::now() - ChronoDuration::days(LOG_RETENTION_DAYS);
            match ledger.purge_logs_before(cutoff).await {
                Ok(deleted) => tracing::info!(job_id, deleted, "Purged old sync logs"),
                Err(e) => tracing::error!(job_id, error = %e, "Log purge failed"),
            }
        }
    }
}

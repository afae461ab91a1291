use std::sync::Arc;

use datasync_service::config::Config;
use datasync_service::gateway::ConnectorGateway;
use datasync_service::ledger::{MemoryLedger, SyncLedger};
use datasync_service::models::{JobBehavior, SyncEngineError};
use datasync_service::orchestrator::SyncOrchestrator;
use datasync_service::scheduler::{CreateJobRequest, SyncScheduler};

async fn scheduler() -> (SyncScheduler, Arc<MemoryLedger>) {
    let gateway = Arc::new(ConnectorGateway::new(Config::default_for_tests()));
    let ledger = Arc::new(MemoryLedger::new());
    let orchestrator = Arc::new(SyncOrchestrator::new(gateway, ledger.clone()));
    let scheduler = SyncScheduler::new(orchestrator, ledger.clone()).await.unwrap();
    (scheduler, ledger)
}

fn request(job_id: &str, schedule: &str) -> CreateJobRequest {
    CreateJobRequest {
        job_id: job_id.to_string(),
        schedule: schedule.to_string(),
        behavior: JobBehavior::SyncAll,
        connector_id: None,
        description: None,
    }
}

#[tokio::test]
async fn recreating_a_job_replaces_its_timer_and_schedule() {
    let (scheduler, ledger) = scheduler().await;

    scheduler.create_job(request("nightly", "0 0 2 * * *")).await.unwrap();
    scheduler.create_job(request("nightly", "0 0 4 * * *")).await.unwrap();

    assert_eq!(scheduler.active_job_count().await, 1);
    let jobs = ledger.jobs().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].schedule, "0 0 4 * * *");
    assert!(jobs[0].is_active);
}

#[tokio::test]
async fn malformed_schedules_are_rejected() {
    let (scheduler, ledger) = scheduler().await;
    let err = scheduler.create_job(request("broken", "every tuesday-ish")).await.err().unwrap();
    assert!(matches!(err, SyncEngineError::InvalidSchedule(_, _)));
    assert_eq!(scheduler.active_job_count().await, 0);
    assert!(ledger.jobs().await.unwrap().is_empty());
}

#[tokio::test]
async fn stopping_an_unknown_job_fails_and_leaves_others_untouched() {
    let (scheduler, _ledger) = scheduler().await;
    scheduler.create_job(request("keeper", "0 0 * * * *")).await.unwrap();

    let err = scheduler.stop_job("ghost").await.err().unwrap();
    assert!(matches!(err, SyncEngineError::JobNotFound(_)));
    assert_eq!(scheduler.active_job_count().await, 1);
}

#[tokio::test]
async fn stopping_a_job_keeps_its_row_for_audit() {
    let (scheduler, ledger) = scheduler().await;
    scheduler.create_job(request("nightly", "0 0 2 * * *")).await.unwrap();

    scheduler.stop_job("nightly").await.unwrap();

    assert_eq!(scheduler.active_job_count().await, 0);
    let jobs = ledger.jobs().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(!jobs[0].is_active);
}

#[tokio::test]
async fn restart_registers_the_fixed_default_jobs() {
    let (scheduler, ledger) = scheduler().await;
    scheduler.create_job(request("custom", "0 15 * * * *")).await.unwrap();

    let defaults = scheduler.restart_all_jobs().await.unwrap();
    assert_eq!(defaults.len(), 4);
    assert_eq!(scheduler.active_job_count().await, 4);

    let jobs = ledger.jobs().await.unwrap();
    let by_id = |id: &str| jobs.iter().find(|j| j.job_id == id).unwrap();
    assert_eq!(by_id("hourly-full-sync").behavior, JobBehavior::SyncAll);
    assert_eq!(by_id("nightly-full-sync").schedule, "0 0 2 * * *");
    assert_eq!(by_id("critical-sync").behavior, JobBehavior::SyncCritical);
    assert_eq!(by_id("log-purge").behavior, JobBehavior::PurgeHistory);
    // The custom job was stopped by the restart but its row survives
    assert!(!by_id("custom").is_active);
}

#[tokio::test]
async fn stop_all_reports_the_number_of_stopped_jobs() {
    let (scheduler, _ledger) = scheduler().await;
    scheduler.create_job(request("a", "0 0 * * * *")).await.unwrap();
    scheduler.create_job(request("b", "0 30 * * * *")).await.unwrap();

    let stopped = scheduler.stop_all_jobs().await.unwrap();
    assert_eq!(stopped, 2);
    assert_eq!(scheduler.active_job_count().await, 0);
}

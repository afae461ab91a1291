use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use crate::gateway::{ConnectorGateway, SourcePayload};
use crate::ledger::SyncLedger;
use crate::models::{ConnectorConfig, Result, SyncEngineError, SyncResult};
use crate::pipeline::{dedupe, transform, validate};

/// Outcome of one sync dispatch. `Skipped` means the connector already had a
/// sync in flight; the firing was dropped with a logged notice rather than
/// run concurrently.
#[derive(Debug, Clone)]
pub enum SyncDispatch {
    Completed(SyncResult),
    Skipped,
}

/// Drives one end-to-end sync for a connector: fetch, transform, validate,
/// dedupe, persist. Pipeline-stage failures are fatal to the attempt (unlike
/// the fail-soft connector internals) and land as an error result plus an
/// alert; they never unwind into the scheduler.
pub struct SyncOrchestrator {
    gateway: Arc<ConnectorGateway>,
    ledger: Arc<dyn SyncLedger>,
    active_syncs: Arc<Mutex<HashSet<String>>>,
}

struct ActiveSyncGuard {
    set: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl Drop for ActiveSyncGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.id);
        }
    }
}

struct PipelineCounts {
    processed: u64,
    inserted: u64,
    skipped: u64,
    errors: Vec<String>,
    degraded: bool,
}

impl SyncOrchestrator {
    pub fn new(gateway: Arc<ConnectorGateway>, ledger: Arc<dyn SyncLedger>) -> Self {
        Self {
            gateway,
            ledger,
            active_syncs: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn ledger(&self) -> Arc<dyn SyncLedger> {
        self.ledger.clone()
    }

    pub fn gateway(&self) -> Arc<ConnectorGateway> {
        self.gateway.clone()
    }

    /// Runs one sync attempt for the named connector. At most one sync per
    /// connector runs at a time; an overlapping firing is skipped. Unknown
    /// ids are caller errors and are surfaced without touching the ledger.
    pub async fn execute_sync(&self, connector_id: &str) -> Result<SyncDispatch> {
        let config = self
            .gateway
            .config(connector_id)
            .ok_or_else(|| SyncEngineError::UnknownConnector(connector_id.to_string()))?;

        {
            let mut active = self.active_syncs.lock().expect("active sync set poisoned");
            if active.contains(connector_id) {
                tracing::warn!(
                    connector_id,
                    "Sync already in progress for this connector; skipping this firing"
                );
                return Ok(SyncDispatch::Skipped);
            }
            active.insert(connector_id.to_string());
        }
        let _guard = ActiveSyncGuard {
            set: self.active_syncs.clone(),
            id: connector_id.to_string(),
        };

        let started = Instant::now();
        let started_at = Utc::now();
        tracing::info!(connector_id, kind = config.kind.as_str(), "Starting sync");

        let outcome = self.run_pipeline(&config).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(counts) => {
                let status = if counts.degraded { "degraded" } else { "clean" };
                tracing::info!(
                    connector_id,
                    records_processed = counts.processed,
                    records_inserted = counts.inserted,
                    records_skipped = counts.skipped,
                    duration_ms,
                    outcome = status,
                    "Sync completed"
                );
                SyncResult::success(
                    connector_id,
                    started_at,
                    duration_ms,
                    counts.processed,
                    counts.inserted,
                    counts.skipped,
                    counts.errors,
                )
            }
            Err(e) => {
                tracing::error!(connector_id, error = %e, duration_ms, "Sync failed");
                SyncResult::failure(connector_id, started_at, duration_ms, e.to_string())
            }
        };

        self.ledger.record_sync(&result).await?;
        Ok(SyncDispatch::Completed(result))
    }

    async fn run_pipeline(&self, config: &ConnectorConfig) -> Result<PipelineCounts> {
        match self.gateway.sync(&config.id).await? {
            SourcePayload::Records(raw) => {
                let processed = raw.len() as u64;
                let mapped = transform(raw, &config.mapping)?;
                let outcome = validate(mapped, &config.schema, &config.mapping);
                let skipped = outcome.invalid.len() as u64;
                let deduped = dedupe(outcome.valid, &config.unique_fields);
                let mut errors = Vec::new();
                if skipped > 0 {
                    // Validation failures reduce the insert count but do not,
                    // by themselves, fail the sync.
                    errors.push(format!("{} records failed validation", skipped));
                }
                Ok(PipelineCounts {
                    processed,
                    inserted: deduped.len() as u64,
                    skipped,
                    errors,
                    degraded: skipped > 0,
                })
            }
            SourcePayload::Vendor(summary) => {
                if !summary.success {
                    return Err(SyncEngineError::Read(format!(
                        "all {} entity fetches failed",
                        summary.records_failed
                    )));
                }
                let mut errors = Vec::new();
                if summary.records_failed > 0 {
                    errors.push(format!("{} entity fetches failed", summary.records_failed));
                }
                Ok(PipelineCounts {
                    processed: summary.records_synced,
                    inserted: summary.records_synced,
                    skipped: 0,
                    errors,
                    degraded: summary.records_failed > 0,
                })
            }
        }
    }

    /// Syncs every registered connector in turn. Per-connector failures are
    /// contained; one bad source never blocks the rest of the fleet.
    pub async fn sync_all_connectors(&self) -> Vec<SyncResult> {
        self.sync_where(|_| true).await
    }

    /// Syncs only the fixed critical subset of connector kinds.
    pub async fn sync_critical_connectors(&self) -> Vec<SyncResult> {
        self.sync_where(|config| config.kind.is_critical()).await
    }

    async fn sync_where<F: Fn(&ConnectorConfig) -> bool>(&self, include: F) -> Vec<SyncResult> {
        let mut results = Vec::new();
        for config in self.gateway.all_configs() {
            if !include(&config) {
                continue;
            }
            match self.execute_sync(&config.id).await {
                Ok(SyncDispatch::Completed(result)) => results.push(result),
                Ok(SyncDispatch::Skipped) => {}
                Err(e) => {
                    tracing::error!(connector_id = %config.id, error = %e, "Sync dispatch failed");
                }
            }
        }
        results
    }
}

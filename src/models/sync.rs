use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Error => "error",
        }
    }
}

/// Outcome of one orchestrated sync attempt. Created once per sync,
/// immutable, appended to the sync ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub id: String,
    pub connector_id: String,
    pub status: SyncStatus,
    pub records_processed: u64,
    pub records_inserted: u64,
    pub records_skipped: u64,
    pub errors: Vec<String>,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
}

impl SyncResult {
    pub fn success(
        connector_id: &str,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        records_processed: u64,
        records_inserted: u64,
        records_skipped: u64,
        errors: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            connector_id: connector_id.to_string(),
            status: SyncStatus::Success,
            records_processed,
            records_inserted,
            records_skipped,
            errors,
            duration_ms,
            started_at,
        }
    }

    pub fn failure(
        connector_id: &str,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        message: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            connector_id: connector_id.to_string(),
            status: SyncStatus::Error,
            records_processed: 0,
            records_inserted: 0,
            records_skipped: 0,
            errors: vec![message],
            duration_ms,
            started_at,
        }
    }
}

/// Rolling aggregate per connector, mutated in place after every sync.
/// Invariant: `total_syncs == successful_syncs + failed_syncs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorStatus {
    pub connector_id: String,
    pub is_connected: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_status: Option<SyncStatus>,
    pub last_error: Option<String>,
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    pub total_records_synced: u64,
    pub avg_duration_ms: f64,
}

impl ConnectorStatus {
    pub fn new(connector_id: &str) -> Self {
        Self {
            connector_id: connector_id.to_string(),
            is_connected: false,
            last_sync_at: None,
            last_sync_status: None,
            last_error: None,
            total_syncs: 0,
            successful_syncs: 0,
            failed_syncs: 0,
            total_records_synced: 0,
            avg_duration_ms: 0.0,
        }
    }

    /// Folds one sync outcome into the rolling aggregate. The mean is updated
    /// incrementally: `(avg * n + new) / (n + 1)` with `n` the count before
    /// this sync.
    pub fn apply(&mut self, result: &SyncResult) {
        let n = self.total_syncs as f64;
        self.avg_duration_ms = (self.avg_duration_ms * n + result.duration_ms as f64) / (n + 1.0);
        self.total_syncs += 1;
        match result.status {
            SyncStatus::Success => {
                self.successful_syncs += 1;
                self.is_connected = true;
                self.last_error = None;
            }
            SyncStatus::Error => {
                self.failed_syncs += 1;
                self.is_connected = false;
                self.last_error = result.errors.first().cloned();
            }
        }
        self.last_sync_at = Some(result.started_at);
        self.last_sync_status = Some(result.status);
        self.total_records_synced += result.records_inserted;
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_syncs == 0 {
            0.0
        } else {
            self.successful_syncs as f64 / self.total_syncs as f64 * 100.0
        }
    }
}

/// Raised whenever a sync attempt ends in error. Lives until explicitly
/// resolved; never auto-expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub connector_id: String,
    pub message: String,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn open(connector_id: &str, message: String) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            connector_id: connector_id.to_string(),
            message,
            is_resolved: false,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobBehavior {
    SyncConnector,
    SyncAll,
    SyncCritical,
    PurgeHistory,
}

impl JobBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobBehavior::SyncConnector => "sync-connector",
            JobBehavior::SyncAll => "sync-all",
            JobBehavior::SyncCritical => "sync-critical",
            JobBehavior::PurgeHistory => "purge-history",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sync-connector" => Some(JobBehavior::SyncConnector),
            "sync-all" => Some(JobBehavior::SyncAll),
            "sync-critical" => Some(JobBehavior::SyncCritical),
            "purge-history" => Some(JobBehavior::PurgeHistory),
            _ => None,
        }
    }
}

/// A named recurring schedule. Stopping a job clears its live timer and marks
/// the row inactive, but the row persists for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    pub job_id: String,
    pub schedule: String,
    pub behavior: JobBehavior,
    pub connector_id: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Aggregate returned by a vendor connector's `sync_all`: per-entity record
/// counts plus the count of entity fetches that failed. A failed fetch
/// contributes a zero count rather than aborting the connector sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectorSyncSummary {
    pub success: bool,
    pub records_synced: u64,
    pub records_failed: u64,
    pub details: BTreeMap<String, u64>,
}

/// Aggregated view over the ledger, for one connector or the whole fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStats {
    pub connectors: u64,
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    pub total_records_synced: u64,
    /// Percentage; for the fleet view this is the mean of per-connector rates.
    pub success_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(status: SyncStatus, duration_ms: u64, inserted: u64) -> SyncResult {
        SyncResult {
            id: "t".into(),
            connector_id: "c1".into(),
            status,
            records_processed: inserted,
            records_inserted: inserted,
            records_skipped: 0,
            errors: if status == SyncStatus::Error {
                vec!["boom".into()]
            } else {
                vec![]
            },
            duration_ms,
            started_at: Utc::now(),
        }
    }

    #[test]
    fn totals_identity_holds_for_any_interleaving() {
        let mut status = ConnectorStatus::new("c1");
        for s in [
            SyncStatus::Success,
            SyncStatus::Error,
            SyncStatus::Error,
            SyncStatus::Success,
            SyncStatus::Success,
        ] {
            status.apply(&result_with(s, 10, 1));
            assert_eq!(status.total_syncs, status.successful_syncs + status.failed_syncs);
        }
        assert_eq!(status.total_syncs, 5);
        assert_eq!(status.successful_syncs, 3);
        assert_eq!(status.failed_syncs, 2);
    }

    #[test]
    fn incremental_mean_matches_formula() {
        let mut status = ConnectorStatus::new("c1");
        status.apply(&result_with(SyncStatus::Success, 100, 1));
        assert_eq!(status.avg_duration_ms, 100.0);
        status.apply(&result_with(SyncStatus::Success, 50, 1));
        assert_eq!(status.avg_duration_ms, 75.0);
        status.apply(&result_with(SyncStatus::Error, 25, 0));
        // (75 * 2 + 25) / 3
        assert!((status.avg_duration_ms - 175.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn last_error_tracks_failures_and_clears_on_success() {
        let mut status = ConnectorStatus::new("c1");
        status.apply(&result_with(SyncStatus::Error, 10, 0));
        assert_eq!(status.last_error.as_deref(), Some("boom"));
        assert!(!status.is_connected);
        status.apply(&result_with(SyncStatus::Success, 10, 2));
        assert!(status.last_error.is_none());
        assert!(status.is_connected);
        assert_eq!(status.total_records_synced, 2);
    }
}

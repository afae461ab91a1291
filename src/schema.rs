use async_graphql::{Context, EmptySubscription, Json, Object, Result as GraphQLResult, Schema};
use std::sync::Arc;

use crate::gateway::ConnectorGateway;
use crate::ledger::{LogFilter, SyncLedger};
use crate::models::*;
use crate::orchestrator::{SyncDispatch, SyncOrchestrator};
use crate::scheduler::{CreateJobRequest, SyncScheduler};

pub type DatasyncSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Sync-log rows, newest-first, optionally filtered by connector and
    /// status and bounded by a result count.
    async fn sync_logs(
        &self,
        ctx: &Context<'_>,
        connector_id: Option<String>,
        status: Option<String>,
        limit: Option<i32>,
    ) -> GraphQLResult<Vec<SyncResult>> {
        let ledger = ctx.data::<Arc<dyn SyncLedger>>()?;
        let status = match status.as_deref() {
            None => None,
            Some("success") => Some(SyncStatus::Success),
            Some("error") => Some(SyncStatus::Error),
            Some(other) => return Err(format!("unknown status filter: {}", other).into()),
        };
        let logs = ledger
            .sync_logs(LogFilter {
                connector_id,
                status,
                limit: limit.map(|l| l.max(0) as usize),
            })
            .await?;
        Ok(logs)
    }

    async fn connector_statuses(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<ConnectorStatus>> {
        let ledger = ctx.data::<Arc<dyn SyncLedger>>()?;
        Ok(ledger.connector_statuses().await?)
    }

    async fn connector_status(
        &self,
        ctx: &Context<'_>,
        connector_id: String,
    ) -> GraphQLResult<Option<ConnectorStatus>> {
        let ledger = ctx.data::<Arc<dyn SyncLedger>>()?;
        Ok(ledger.connector_status(&connector_id).await?)
    }

    async fn unresolved_alerts(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<Alert>> {
        let ledger = ctx.data::<Arc<dyn SyncLedger>>()?;
        Ok(ledger.unresolved_alerts().await?)
    }

    async fn jobs(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<SyncJob>> {
        let ledger = ctx.data::<Arc<dyn SyncLedger>>()?;
        Ok(ledger.jobs().await?)
    }

    async fn sync_stats(
        &self,
        ctx: &Context<'_>,
        connector_id: Option<String>,
    ) -> GraphQLResult<SyncStats> {
        let ledger = ctx.data::<Arc<dyn SyncLedger>>()?;
        Ok(ledger.sync_stats(connector_id.as_deref()).await?)
    }

    /// All registered connectors.
    async fn connectors(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<ConnectorConfig>> {
        let gateway = ctx.data::<Arc<ConnectorGateway>>()?;
        Ok(gateway.all_configs())
    }

    /// Health check
    async fn health(&self) -> GraphQLResult<String> {
        Ok("OK".to_string())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Trigger one sync by connector id. Returns a skipped marker when a
    /// sync for that connector is already in flight.
    async fn sync_connector(
        &self,
        ctx: &Context<'_>,
        connector_id: String,
    ) -> GraphQLResult<SyncDispatchResult> {
        let orchestrator = ctx.data::<Arc<SyncOrchestrator>>()?;
        match orchestrator.execute_sync(&connector_id).await? {
            SyncDispatch::Completed(result) => Ok(SyncDispatchResult {
                skipped: false,
                result: Some(result),
            }),
            SyncDispatch::Skipped => Ok(SyncDispatchResult {
                skipped: true,
                result: None,
            }),
        }
    }

    async fn sync_all_connectors(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<SyncResult>> {
        let orchestrator = ctx.data::<Arc<SyncOrchestrator>>()?;
        Ok(orchestrator.sync_all_connectors().await)
    }

    async fn sync_critical_connectors(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<SyncResult>> {
        let orchestrator = ctx.data::<Arc<SyncOrchestrator>>()?;
        Ok(orchestrator.sync_critical_connectors().await)
    }

    async fn resolve_alert(&self, ctx: &Context<'_>, alert_id: String) -> GraphQLResult<Alert> {
        let ledger = ctx.data::<Arc<dyn SyncLedger>>()?;
        Ok(ledger.resolve_alert(&alert_id).await?)
    }

    async fn create_job(
        &self,
        ctx: &Context<'_>,
        job_id: String,
        schedule: String,
        behavior: String,
        connector_id: Option<String>,
        description: Option<String>,
    ) -> GraphQLResult<SyncJob> {
        let scheduler = ctx.data::<Arc<SyncScheduler>>()?;
        let behavior = JobBehavior::parse(&behavior)
            .ok_or_else(|| format!("unknown job behavior: {}", behavior))?;
        if behavior == JobBehavior::SyncConnector && connector_id.is_none() {
            return Err("sync-connector jobs require a connector_id".into());
        }
        Ok(scheduler
            .create_job(CreateJobRequest {
                job_id,
                schedule,
                behavior,
                connector_id,
                description,
            })
            .await?)
    }

    async fn stop_job(&self, ctx: &Context<'_>, job_id: String) -> GraphQLResult<bool> {
        let scheduler = ctx.data::<Arc<SyncScheduler>>()?;
        scheduler.stop_job(&job_id).await?;
        Ok(true)
    }

    async fn stop_all_jobs(&self, ctx: &Context<'_>) -> GraphQLResult<i32> {
        let scheduler = ctx.data::<Arc<SyncScheduler>>()?;
        Ok(scheduler.stop_all_jobs().await? as i32)
    }

    async fn restart_all_jobs(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<SyncJob>> {
        let scheduler = ctx.data::<Arc<SyncScheduler>>()?;
        Ok(scheduler.restart_all_jobs().await?)
    }

    /// Authenticate against the source and issue one minimal probe.
    async fn test_connector(&self, ctx: &Context<'_>, connector_id: String) -> GraphQLResult<bool> {
        let gateway = ctx.data::<Arc<ConnectorGateway>>()?;
        Ok(gateway.test_connector(&connector_id).await?)
    }
}

pub struct SyncDispatchResult {
    pub skipped: bool,
    pub result: Option<SyncResult>,
}

#[Object]
impl SyncDispatchResult {
    async fn skipped(&self) -> bool {
        self.skipped
    }

    async fn result(&self) -> Option<&SyncResult> {
        self.result.as_ref()
    }
}

// Convert domain models to GraphQL objects

#[Object]
impl SyncResult {
    async fn id(&self) -> &str {
        &self.id
    }

    async fn connector_id(&self) -> &str {
        &self.connector_id
    }

    async fn status(&self) -> &str {
        self.status.as_str()
    }

    async fn records_processed(&self) -> i64 {
        self.records_processed as i64
    }

    async fn records_inserted(&self) -> i64 {
        self.records_inserted as i64
    }

    async fn records_skipped(&self) -> i64 {
        self.records_skipped as i64
    }

    async fn errors(&self) -> &[String] {
        &self.errors
    }

    async fn duration_ms(&self) -> i64 {
        self.duration_ms as i64
    }

    async fn started_at(&self) -> String {
        self.started_at.to_rfc3339()
    }
}

#[Object]
impl ConnectorStatus {
    async fn connector_id(&self) -> &str {
        &self.connector_id
    }

    async fn is_connected(&self) -> bool {
        self.is_connected
    }

    async fn last_sync_at(&self) -> Option<String> {
        self.last_sync_at.map(|dt| dt.to_rfc3339())
    }

    async fn last_sync_status(&self) -> Option<&str> {
        self.last_sync_status.map(|s| s.as_str())
    }

    async fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    async fn total_syncs(&self) -> i64 {
        self.total_syncs as i64
    }

    async fn successful_syncs(&self) -> i64 {
        self.successful_syncs as i64
    }

    async fn failed_syncs(&self) -> i64 {
        self.failed_syncs as i64
    }

    async fn total_records_synced(&self) -> i64 {
        self.total_records_synced as i64
    }

    async fn avg_duration_ms(&self) -> f64 {
        self.avg_duration_ms
    }
}

#[Object]
impl Alert {
    async fn id(&self) -> &str {
        &self.id
    }

    async fn connector_id(&self) -> &str {
        &self.connector_id
    }

    async fn message(&self) -> &str {
        &self.message
    }

    async fn is_resolved(&self) -> bool {
        self.is_resolved
    }

    async fn created_at(&self) -> String {
        self.created_at.to_rfc3339()
    }

    async fn resolved_at(&self) -> Option<String> {
        self.resolved_at.map(|dt| dt.to_rfc3339())
    }
}

#[Object]
impl SyncJob {
    async fn job_id(&self) -> &str {
        &self.job_id
    }

    async fn schedule(&self) -> &str {
        &self.schedule
    }

    async fn behavior(&self) -> &str {
        self.behavior.as_str()
    }

    async fn connector_id(&self) -> Option<&str> {
        self.connector_id.as_deref()
    }

    async fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    async fn is_active(&self) -> bool {
        self.is_active
    }

    async fn created_at(&self) -> String {
        self.created_at.to_rfc3339()
    }
}

// Settings are omitted on purpose: the blob carries source credentials.
#[Object]
impl ConnectorConfig {
    async fn id(&self) -> &str {
        &self.id
    }

    async fn name(&self) -> &str {
        &self.name
    }

    async fn kind(&self) -> &str {
        self.kind.as_str()
    }

    async fn mapping(&self) -> Json<serde_json::Value> {
        Json(serde_json::to_value(&self.mapping).unwrap_or(serde_json::Value::Null))
    }

    async fn schema(&self) -> Json<serde_json::Value> {
        Json(serde_json::to_value(&self.schema).unwrap_or(serde_json::Value::Null))
    }

    async fn unique_fields(&self) -> &[String] {
        &self.unique_fields
    }
}

#[Object]
impl SyncStats {
    async fn connectors(&self) -> i64 {
        self.connectors as i64
    }

    async fn total_syncs(&self) -> i64 {
        self.total_syncs as i64
    }

    async fn successful_syncs(&self) -> i64 {
        self.successful_syncs as i64
    }

    async fn failed_syncs(&self) -> i64 {
        self.failed_syncs as i64
    }

    async fn total_records_synced(&self) -> i64 {
        self.total_records_synced as i64
    }

    async fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

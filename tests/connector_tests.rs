use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::Query;
use axum::{http::StatusCode, routing::get, routing::post, Router};
use serde_json::json;

use datasync_service::config::Config;
use datasync_service::connectors::{Connector, SalesforceConnector};
use datasync_service::gateway::ConnectorGateway;
use datasync_service::ledger::{MemoryLedger, SyncLedger};
use datasync_service::models::{ConnectorConfig, ConnectorKind, SyncStatus};
use datasync_service::orchestrator::{SyncDispatch, SyncOrchestrator};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{}", addr)
}

fn salesforce_config(id: &str, base_url: &str) -> ConnectorConfig {
    ConnectorConfig {
        id: id.to_string(),
        name: "CRM".to_string(),
        kind: ConnectorKind::VendorSalesforce,
        settings: json!({
            "base_url": base_url,
            "client_id": "cid",
            "client_secret": "shh",
        }),
        mapping: Default::default(),
        schema: Default::default(),
        unique_fields: vec![],
    }
}

fn connector(base_url: &str) -> SalesforceConnector {
    SalesforceConnector::new(
        &salesforce_config("crm", base_url),
        &Config::default_for_tests(),
    )
    .unwrap()
}

/// Mock vendor API: token grants plus a SOQL query endpoint where the
/// Opportunity entity is permanently down.
fn vendor_app(token_calls: Arc<AtomicUsize>, expires_in: i64) -> Router {
    Router::new()
        .route(
            "/oauth/token",
            post(move || {
                let token_calls = token_calls.clone();
                async move {
                    let n = token_calls.fetch_add(1, Ordering::SeqCst);
                    axum::Json(json!({"access_token": format!("tok-{}", n), "expires_in": expires_in}))
                }
            }),
        )
        .route(
            "/services/data/v59.0/query",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let soql = params.get("q").cloned().unwrap_or_default();
                if soql.contains("Opportunity") {
                    return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(json!({"error": "down"})));
                }
                (
                    StatusCode::OK,
                    axum::Json(json!({
                        "records": [
                            {"Id": "001", "Name": "One", "LastModifiedDate": "2026-01-01T00:00:00Z",
                             "attributes": {"type": "Thing"}},
                            {"Id": "002", "Name": "Two", "LastModifiedDate": "2026-01-02T00:00:00Z",
                             "attributes": {"type": "Thing"}}
                        ]
                    })),
                )
            }),
        )
}

#[tokio::test]
async fn one_failing_entity_degrades_the_count_but_not_the_aggregate() {
    let base = serve(vendor_app(Arc::new(AtomicUsize::new(0)), 3600)).await;
    let connector = connector(&base);

    let summary = connector.sync_all().await;
    assert!(summary.success, "partial vendor outage must not fail the sync");
    assert_eq!(summary.records_failed, 1);
    assert_eq!(summary.records_synced, 8);
    assert_eq!(summary.details["opportunities"], 0);
    assert_eq!(summary.details["accounts"], 2);
    assert_eq!(summary.details["contacts"], 2);
    assert_eq!(summary.details["leads"], 2);
    assert_eq!(summary.details["campaigns"], 2);
}

#[tokio::test]
async fn fetch_maps_rows_into_the_uniform_envelope() {
    let base = serve(vendor_app(Arc::new(AtomicUsize::new(0)), 3600)).await;
    let connector = connector(&base);

    let records = connector.fetch_accounts().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "001");
    assert_eq!(records[0].entity_type, "account");
    assert_eq!(records[0].last_modified.as_deref(), Some("2026-01-01T00:00:00Z"));
    assert!(records[0].data.get("attributes").is_none());
    assert_eq!(records[0].data["Name"], "One");
}

#[tokio::test]
async fn expired_tokens_are_renewed_before_the_next_call() {
    let token_calls = Arc::new(AtomicUsize::new(0));
    // expires_in of zero makes every stored token immediately stale
    let base = serve(vendor_app(token_calls.clone(), 0)).await;
    let connector = connector(&base);

    connector.fetch_accounts().await.unwrap();
    connector.fetch_accounts().await.unwrap();
    assert!(
        token_calls.load(Ordering::SeqCst) >= 2,
        "a stale token must trigger re-authentication"
    );
}

#[tokio::test]
async fn fresh_tokens_are_reused_across_calls() {
    let token_calls = Arc::new(AtomicUsize::new(0));
    let base = serve(vendor_app(token_calls.clone(), 3600)).await;
    let connector = connector(&base);

    connector.fetch_accounts().await.unwrap();
    connector.fetch_contacts().await.unwrap();
    assert_eq!(token_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_authentication_returns_false_and_fails_every_fetch() {
    let app = Router::new().route(
        "/oauth/token",
        post(|| async { (StatusCode::UNAUTHORIZED, axum::Json(json!({"error": "bad client"}))) }),
    );
    let base = serve(app).await;
    let connector = connector(&base);

    assert!(!connector.authenticate().await);
    assert!(!connector.test_connection().await);
    let summary = connector.sync_all().await;
    assert!(!summary.success);
    assert_eq!(summary.records_synced, 0);
    assert_eq!(summary.records_failed, 5);
}

#[tokio::test]
async fn orchestrator_records_a_vendor_sync_with_degraded_entities() {
    let base = serve(vendor_app(Arc::new(AtomicUsize::new(0)), 3600)).await;
    let gateway = Arc::new(ConnectorGateway::new(Config::default_for_tests()));
    gateway.register(salesforce_config("crm", &base)).unwrap();
    let ledger = Arc::new(MemoryLedger::new());
    let orchestrator = SyncOrchestrator::new(gateway, ledger.clone());

    let SyncDispatch::Completed(result) = orchestrator.execute_sync("crm").await.unwrap() else {
        panic!("sync should not be skipped");
    };
    assert_eq!(result.status, SyncStatus::Success);
    assert_eq!(result.records_processed, 8);
    assert_eq!(result.records_inserted, 8);
    assert_eq!(result.errors, vec!["1 entity fetches failed"]);

    let status = ledger.connector_status("crm").await.unwrap().unwrap();
    assert_eq!(status.successful_syncs, 1);
    assert_eq!(status.total_records_synced, 8);
}

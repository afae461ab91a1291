use std::sync::Arc;

use crate::config::Config;
use crate::gateway::{load_connector_configs, ConnectorGateway};
use crate::ledger::build_ledger;
use crate::orchestrator::{SyncDispatch, SyncOrchestrator};

/// One-shot sync of a single connector, printing the result as JSON. Uses
/// the same ledger backend the server would, so the attempt lands in the
/// history.
pub async fn run_sync_cli(cfg: Config, connector_id: &str) -> anyhow::Result<()> {
    let ledger = build_ledger(&cfg).await?;
    let gateway = Arc::new(ConnectorGateway::new(cfg.clone()));
    if let Some(path) = &cfg.connectors_file {
        for config in load_connector_configs(path)? {
            let id = config.id.clone();
            if let Err(e) = gateway.register(config) {
                tracing::warn!(connector_id = %id, error = %e, "Skipping connector registration");
            }
        }
    }
    let orchestrator = SyncOrchestrator::new(gateway, ledger);
    match orchestrator.execute_sync(connector_id).await? {
        SyncDispatch::Completed(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        SyncDispatch::Skipped => {
            println!("sync for connector '{}' is already in progress", connector_id);
        }
    }
    Ok(())
}

pub fn print_usage() {
    println!("datasync-service");
    println!();
    println!("USAGE:");
    println!("  datasync-service                 Start the sync service");
    println!("  datasync-service sync <id>       Run one sync for the given connector and exit");
    println!("  datasync-service help            Show this message");
    println!();
    println!("Configuration is read from the environment (see .env support):");
    println!("  PORT, MONGODB_URI, DATABASE_NAME, LEDGER_BACKEND, CONNECTORS_FILE,");
    println!("  HTTP_TIMEOUT_MS, HTTP_USER_AGENT, SQL_TIMEOUT_MS, ENABLE_SCHEDULER");
}

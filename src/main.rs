use std::net::SocketAddr;
use std::sync::Arc;

use async_graphql::{EmptySubscription, Schema};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{response::Html, routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, EnvFilter};

use datasync_service::cli::{print_usage, run_sync_cli};
use datasync_service::config::Config;
use datasync_service::gateway::{load_connector_configs, ConnectorGateway};
use datasync_service::ledger::{build_ledger, SyncLedger};
use datasync_service::orchestrator::SyncOrchestrator;
use datasync_service::scheduler::SyncScheduler;
use datasync_service::schema::{DatasyncSchema, MutationRoot, QueryRoot};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    // Initialize logging
    let filter = EnvFilter::from_default_env().add_directive("info".parse().unwrap());
    fmt()
        .with_env_filter(filter)
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .init();

    // Load configuration
    let cfg = Config::from_env();

    // Support one-shot commands before starting the server
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        if args[1] == "sync" {
            let Some(connector_id) = args.get(2) else {
                print_usage();
                anyhow::bail!("'sync' requires a connector id");
            };
            return run_sync_cli(cfg, connector_id).await;
        }
        if args[1] == "help" || args[1] == "--help" || args[1] == "-h" {
            print_usage();
            return Ok(());
        }
    }

    tracing::info!(
        backend = ?cfg.ledger_backend,
        scheduler_enabled = cfg.enable_scheduler,
        "Loaded configuration"
    );

    // Ledger backend (in-memory or MongoDB-persisted)
    let ledger: Arc<dyn SyncLedger> = build_ledger(&cfg).await?;

    // Connector registry, provisioned from the configured definitions file
    let gateway = Arc::new(ConnectorGateway::new(cfg.clone()));
    if let Some(path) = &cfg.connectors_file {
        match load_connector_configs(path) {
            Ok(configs) => {
                for config in configs {
                    let id = config.id.clone();
                    if let Err(e) = gateway.register(config) {
                        tracing::error!(connector_id = %id, error = %e, "Skipping connector registration");
                    }
                }
            }
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Failed to load connectors file");
            }
        }
    }

    let orchestrator = Arc::new(SyncOrchestrator::new(gateway.clone(), ledger.clone()));

    // Scheduler with the fixed default jobs
    let scheduler = Arc::new(SyncScheduler::new(orchestrator.clone(), ledger.clone()).await?);
    if cfg.enable_scheduler {
        scheduler.restart_all_jobs().await?;
        scheduler.start().await?;
        tracing::info!("Sync scheduler started");
    }

    // Build GraphQL schema
    let graphql_schema: DatasyncSchema = Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(cfg.clone())
        .data(ledger)
        .data(gateway)
        .data(orchestrator)
        .data(scheduler)
        .finish();

    // Build web application
    let app = Router::new()
        .route("/graphql", get(graphql_playground).post(graphql_handler))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(Extension(graphql_schema)),
        );

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.port).parse()?;
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    port = cfg.port,
                    "Port is already in use. Another datasync-service might be running. Try changing PORT or stop the other process."
                );
            }
            return Err(e.into());
        }
    };
    tracing::info!(port = cfg.port, "Datasync service listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn graphql_playground() -> Html<String> {
    Html(async_graphql::http::playground_source(
        async_graphql::http::GraphQLPlaygroundConfig::new("/graphql"),
    ))
}

async fn graphql_handler(
    Extension(schema): Extension<DatasyncSchema>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn health_check() -> &'static str {
    "OK"
}

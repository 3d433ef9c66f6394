//! Warranty Claims API Server Binary
//!
//! # Usage
//!
//! ```bash
//! # In-memory store
//! cargo run --bin warranty-api
//!
//! # PostgreSQL store
//! API_STORE=postgres API_DATABASE__URL=postgres://... cargo run --bin warranty-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_STORE` - `memory` or `postgres` (default: memory)
//! * `API_DATABASE__URL` - PostgreSQL connection string
//! * `API_DATABASE__MAX_CONNECTIONS` - Pool size (default: 10)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_LOG_JSON` - Emit JSON log lines (default: false)
//! * `API_WORKFLOW__*` - Workflow settings, e.g. `API_WORKFLOW__MILEAGE_CAP`
//!
//! Approvers and warranty coverage for the in-process directory are read
//! from the `approvers` and `coverage` lists of `warranty.toml`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_warranty::adapters::{
    InMemoryApproverDirectory, InMemoryClaimStore, InMemoryCoverageLookup, TracingNotifier,
};
use domain_warranty::{WarrantyService, WarrantyWorkflow};
use infra_db::{create_pool, run_migrations, PostgresClaimStore};
use interface_api::config::{ApiConfig, StoreBackend};
use interface_api::create_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::load().context("loading configuration")?;

    init_tracing(&config.log_level, config.log_json);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        store = ?config.store,
        "Starting warranty claims API server"
    );

    let service = build_service(&config).await?;
    let app = create_router(service, config.clone());

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .context("parsing server address")?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wires the engine over the configured claim store
async fn build_service(config: &ApiConfig) -> anyhow::Result<Arc<dyn WarrantyService>> {
    let directory = Arc::new(InMemoryApproverDirectory::new());
    for seed in &config.approvers {
        directory.add_approver(seed.user_id, seed.role).await;
    }

    let coverage = Arc::new(InMemoryCoverageLookup::new());
    for entry in &config.coverage {
        coverage.insert(entry.clone()).await;
    }

    tracing::info!(
        approvers = config.approvers.len(),
        coverage = config.coverage.len(),
        "Seeded approver directory and coverage"
    );

    let notifier = Arc::new(TracingNotifier);

    let service: Arc<dyn WarrantyService> = match config.store {
        StoreBackend::Memory => Arc::new(WarrantyWorkflow::new(
            Arc::new(InMemoryClaimStore::new()),
            directory,
            coverage,
            notifier,
            config.workflow.clone(),
        )?),
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database)
                .await
                .context("connecting to the claim database")?;
            if config.database.run_migrations {
                run_migrations(&pool).await?;
            }
            Arc::new(WarrantyWorkflow::new(
                Arc::new(PostgresClaimStore::new(pool)),
                directory,
                coverage,
                notifier,
                config.workflow.clone(),
            )?)
        }
    };

    Ok(service)
}

/// Installs the tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

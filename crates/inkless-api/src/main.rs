//! Inkless API server.
//!
//! Loads configuration from the environment, connects the store and the
//! ledger, and serves the router until Ctrl-C or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use inkless_api::config::{AppConfig, LogFormat};
use inkless_api::db::{self, PgStore};
use inkless_api::state::{AppState, ServiceLimits};
use inkless_ledger::LedgerAccessPoint;
use inkless_registry::{MemoryStore, RegistryStore};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {e}");
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
                tracing::warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);
    tracing::debug!(?config, "configuration loaded");

    let pool = db::init_pool(config.database_url.as_deref()).await?;
    let store: Arc<dyn RegistryStore> = match &pool {
        Some(pool) => Arc::new(PgStore::new(pool.clone())),
        None => Arc::new(MemoryStore::new()),
    };

    let access_point = LedgerAccessPoint::new(config.ledger.clone());
    let ledger = access_point.access().await;
    tracing::info!(mode = %ledger.mode(), "ledger access settled");

    let state = AppState::new(store, ledger.clone(), ServiceLimits::from(&config), pool)
        .with_metrics_enabled(config.metrics_enabled);
    let app = inkless_api::app(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("inkless-api listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    ledger.close();
    Ok(())
}

//! # inkless-api: HTTP Service for Signature Anchoring
//!
//! ## API Surface
//!
//! | Route                                   | Module                  |
//! |-----------------------------------------|-------------------------|
//! | `POST /api/v1/signatures/anchor`        | [`routes::signatures`]  |
//! | `GET  /api/v1/signatures/recent`        | [`routes::signatures`]  |
//! | `GET  /api/v1/verify/:doc_hash`         | [`routes::verify`]      |
//! | `GET  /api/v1/verify/:doc_hash/ledger`  | [`routes::verify`]      |
//! | `POST /api/v1/offline/sync`             | [`routes::offline`]     |
//! | `GET  /api/v1/offline/pending`          | [`routes::offline`]     |
//! | `GET  /health/liveness`, `/health/readiness` | this module        |
//! | `GET  /openapi.json`                    | [`openapi`]             |
//! | `GET  /metrics`                         | [`middleware::metrics`] |
//!
//! Persistence is Postgres ([`db::PgStore`]) when `DATABASE_URL` is set and
//! the in-memory store otherwise. `/metrics` and the request middleware are
//! present unless `METRICS_ENABLED=false`.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let mut api = Router::new()
        .merge(routes::signatures::router())
        .merge(routes::verify::router())
        .merge(routes::offline::router())
        .merge(openapi::router())
        // Offline batches carry up to a hundred signatures.
        .layer(DefaultBodyLimit::max(8 * 1024 * 1024));

    let mut router = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    if state.metrics_enabled {
        api = api
            .layer(axum::middleware::from_fn(
                middleware::metrics::metrics_middleware,
            ))
            .layer(axum::Extension(state.metrics.clone()));
        router = router.route("/metrics", get(prometheus_metrics));
    }

    router
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness check: the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check.
///
/// Checks the database when one is configured. The ledger mode is reported
/// in a header but never fails readiness: fallback mode is a valid state.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (
        StatusCode::OK,
        [("x-ledger-mode", state.ledger.mode().to_string())],
        "ready",
    )
        .into_response()
}

/// Prometheus scrape endpoint.
///
/// Refreshes the offline backlog and ledger mode gauges, then encodes every
/// registered metric in the text exposition format.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.reconciler.pending_count().await {
        Ok(pending) => state.metrics.set_offline_pending(pending),
        Err(e) => tracing::warn!("failed to read offline backlog for metrics: {e}"),
    }
    state.metrics.set_ledger_mode(state.ledger.mode());

    match state.metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("metrics encoding failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

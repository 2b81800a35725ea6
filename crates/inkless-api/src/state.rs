//! # Application State
//!
//! Shared state for the Axum application: the registry services, the settled
//! ledger capability, the optional database pool and the metrics registry.
//! Built once at startup; every field is cheap to clone.

use std::sync::Arc;
use std::time::Duration;

use inkless_ledger::LedgerAccess;
use inkless_registry::{
    AnchoringService, MemoryStore, OfflineReconciler, RegistryStore, VerificationService,
    DEFAULT_BATCH_LIMIT, DEFAULT_CONCURRENCY, DEFAULT_LEDGER_DEADLINE,
};
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::middleware::metrics::ApiMetrics;

/// Service tuning taken from [`AppConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ServiceLimits {
    /// Bound on each ledger call.
    pub ledger_deadline: Duration,
    /// Maximum offline batch size.
    pub offline_batch_limit: usize,
    /// Offline items in flight per batch.
    pub reconcile_concurrency: usize,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            ledger_deadline: DEFAULT_LEDGER_DEADLINE,
            offline_batch_limit: DEFAULT_BATCH_LIMIT,
            reconcile_concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl From<&AppConfig> for ServiceLimits {
    fn from(config: &AppConfig) -> Self {
        Self {
            ledger_deadline: config.ledger_deadline,
            offline_batch_limit: config.offline_batch_limit,
            reconcile_concurrency: config.reconcile_concurrency,
        }
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub anchoring: AnchoringService,
    pub verification: VerificationService,
    pub reconciler: OfflineReconciler,
    pub store: Arc<dyn RegistryStore>,
    pub ledger: LedgerAccess,
    /// Present when running on Postgres. Used by the readiness check.
    pub db_pool: Option<PgPool>,
    pub metrics: ApiMetrics,
    /// Serve `/metrics` and layer the request middleware.
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ledger_mode", &self.ledger.mode())
            .field("database", &self.db_pool.is_some())
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl AppState {
    /// Wire the services over `store` and `ledger`.
    pub fn new(
        store: Arc<dyn RegistryStore>,
        ledger: LedgerAccess,
        limits: ServiceLimits,
        db_pool: Option<PgPool>,
    ) -> Self {
        let anchoring =
            AnchoringService::new(store.clone(), ledger.clone(), limits.ledger_deadline);
        let verification =
            VerificationService::new(store.clone(), ledger.clone(), limits.ledger_deadline);
        let reconciler = OfflineReconciler::new(anchoring.clone(), store.clone())
            .with_concurrency(limits.reconcile_concurrency)
            .with_max_batch(limits.offline_batch_limit);
        Self {
            anchoring,
            verification,
            reconciler,
            store,
            ledger,
            db_pool,
            metrics: ApiMetrics::new(),
            metrics_enabled: true,
        }
    }

    /// Turn the metrics endpoint and middleware on or off.
    pub fn with_metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// In-memory store with the given ledger. Used by tests and local runs.
    pub fn in_memory(ledger: LedgerAccess) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            ledger,
            ServiceLimits::default(),
            None,
        )
    }
}

//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Domain counters (anchor outcomes, reconcile item outcomes,
//! ledger submission failures) are pushed by the handlers. The offline
//! backlog and ledger mode gauges are refreshed on each `/metrics` scrape.
//!
//! Path labels use the matched route template, so fingerprints in the URL
//! never become label values.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use inkless_ledger::LedgerMode;
use inkless_registry::BatchResult;
use prometheus::{
    core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain counters (pushed by handlers) --
    anchor_outcomes_total: IntCounterVec,
    reconcile_items_total: IntCounterVec,
    ledger_submission_failures_total: IntCounterVec,

    // -- Gauges (refreshed on scrape) --
    offline_pending: IntGauge,
    ledger_live: IntGauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a metrics instance with a fresh registry.
    pub fn try_new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("inkless_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "inkless_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
            &["method", "path"],
        )?;
        let http_errors_total = IntCounterVec::new(
            Opts::new("inkless_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )?;
        let anchor_outcomes_total = IntCounterVec::new(
            Opts::new(
                "inkless_anchor_outcomes_total",
                "Online anchor requests by outcome and ledger mode",
            ),
            &["outcome", "mode"],
        )?;
        let reconcile_items_total = IntCounterVec::new(
            Opts::new(
                "inkless_reconcile_items_total",
                "Offline sync items by outcome",
            ),
            &["status"],
        )?;
        let ledger_submission_failures_total = IntCounterVec::new(
            Opts::new(
                "inkless_ledger_submission_failures_total",
                "Ledger submissions that failed or timed out",
            ),
            &["path"],
        )?;
        let offline_pending = IntGauge::new(
            "inkless_offline_pending",
            "Offline signatures not yet anchored",
        )?;
        let ledger_live = IntGauge::new(
            "inkless_ledger_live",
            "Whether the ledger runs live (1) or in fallback mode (0)",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;
        registry.register(Box::new(anchor_outcomes_total.clone()))?;
        registry.register(Box::new(reconcile_items_total.clone()))?;
        registry.register(Box::new(ledger_submission_failures_total.clone()))?;
        registry.register(Box::new(offline_pending.clone()))?;
        registry.register(Box::new(ledger_live.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                anchor_outcomes_total,
                reconcile_items_total,
                ledger_submission_failures_total,
                offline_pending,
                ledger_live,
            }),
        })
    }

    /// Create a metrics instance with a fresh registry.
    pub fn new() -> Self {
        Self::try_new().expect("metric definitions are valid")
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        sum_counters(&self.inner.http_requests_total)
    }

    /// Total error count across all labels.
    pub fn errors(&self) -> u64 {
        sum_counters(&self.inner.http_errors_total)
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    // -- Domain counters --

    /// Count one online anchor request. `outcome` is `anchored`,
    /// `already_signed`, or `failed`.
    pub fn record_anchor(&self, outcome: &str, mode: LedgerMode) {
        self.inner
            .anchor_outcomes_total
            .with_label_values(&[outcome, &mode.to_string()])
            .inc();
    }

    /// Count one failed ledger submission. `path` is `online` or `offline`.
    pub fn record_ledger_failure(&self, path: &str, count: u64) {
        if count > 0 {
            self.inner
                .ledger_submission_failures_total
                .with_label_values(&[path])
                .inc_by(count);
        }
    }

    /// Count the item outcomes of one reconciled batch.
    pub fn record_batch(&self, batch: &BatchResult) {
        for (status, count) in [
            ("synced", batch.synced),
            ("already_exists", batch.already_exists),
            ("failed", batch.failed),
        ] {
            self.inner
                .reconcile_items_total
                .with_label_values(&[status])
                .inc_by(count as u64);
        }
        self.record_ledger_failure("offline", batch.ledger_failures as u64);
    }

    /// Count of online anchor requests with the given labels.
    pub fn anchor_outcomes(&self, outcome: &str, mode: LedgerMode) -> u64 {
        self.inner
            .anchor_outcomes_total
            .with_label_values(&[outcome, &mode.to_string()])
            .get()
    }

    /// Count of reconciled items with the given status.
    pub fn reconcile_items(&self, status: &str) -> u64 {
        self.inner
            .reconcile_items_total
            .with_label_values(&[status])
            .get()
    }

    // -- Scrape-time gauges --

    /// Set the offline backlog gauge.
    pub fn set_offline_pending(&self, pending: u64) {
        self.inner
            .offline_pending
            .set(i64::try_from(pending).unwrap_or(i64::MAX));
    }

    /// Set the ledger mode gauge.
    pub fn set_ledger_mode(&self, mode: LedgerMode) {
        self.inner
            .ledger_live
            .set(i64::from(mode == LedgerMode::Live));
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_counters(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Middleware that records HTTP request metrics.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        m.record_request(&method, &path, response.status().as_u16(), duration);
    }

    response
}

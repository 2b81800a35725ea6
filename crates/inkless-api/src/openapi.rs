//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI spec served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inkless API: Signature Anchoring",
        version = "0.1.0",
        description = "Anchors post-quantum document signatures in an EVM signature registry, verifies them, and reconciles signatures captured offline.\n\nWhen no ledger is configured or reachable the service runs in fallback mode and issues `mock-tx-` references.",
        license(name = "BUSL-1.1")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Signatures ──────────────────────────────────────────────────
        crate::routes::signatures::anchor_signature,
        crate::routes::signatures::recent_signatures,
        // ── Verification ────────────────────────────────────────────────
        crate::routes::verify::verify_document,
        crate::routes::verify::ledger_readback,
        // ── Offline sync ────────────────────────────────────────────────
        crate::routes::offline::sync_offline,
        crate::routes::offline::pending_count,
    ),
    components(
        schemas(
            // ── Error types ─────────────────────────────────────────────
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            // ── Signature DTOs ──────────────────────────────────────────
            crate::routes::signatures::AnchorSignatureRequest,
            crate::routes::signatures::AnchorResponse,
            crate::routes::signatures::AlreadySignedResponse,
            crate::routes::signatures::RecentSignature,
            // ── Verification DTOs ───────────────────────────────────────
            crate::routes::verify::SignerInfo,
            crate::routes::verify::VerifyResponse,
            crate::routes::verify::LedgerReadbackResponse,
            // ── Offline DTOs ────────────────────────────────────────────
            crate::routes::offline::OfflineSignature,
            crate::routes::offline::OfflineSyncRequest,
            crate::routes::offline::SyncItemResponse,
            crate::routes::offline::OfflineSyncResponse,
            crate::routes::offline::PendingResponse,
        ),
    ),
    tags(
        (name = "signatures", description = "Online signature anchoring"),
        (name = "verification", description = "Multi-party verification and ledger read-back"),
        (name = "offline", description = "Reconciliation of signatures captured offline"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

//! # Offline Sync Routes
//!
//! - `POST /api/v1/offline/sync`   : reconcile a batch captured offline
//! - `GET  /api/v1/offline/pending`: number of entries not yet anchored
//!
//! Item fields are checked one by one: a malformed item is reported `failed`
//! in its slot and the rest of the batch still runs.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use inkless_core::{Did, DocumentFingerprint, HardwareId};
use inkless_registry::{BatchItem, BatchResult, ItemResult, ItemStatus, OfflineItem};

use crate::error::AppError;
use crate::extractors::{extract_json, ClientAddress};
use crate::routes::decode_signature;
use crate::state::AppState;

/// Assemble the offline sync router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/offline/sync", post(sync_offline))
        .route("/api/v1/offline/pending", get(pending_count))
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// A signature captured while the device was offline.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct OfflineSignature {
    #[serde(rename = "docHash")]
    pub doc_hash: String,
    /// Standard base64.
    #[serde(rename = "pqcSignature")]
    pub pqc_signature: String,
    #[serde(rename = "hardwareID")]
    pub hardware_id: String,
    /// Device clock at signing time, RFC 3339.
    #[serde(rename = "localTimestamp")]
    pub local_timestamp: String,
    #[serde(rename = "signerDID")]
    pub signer_did: String,
}

impl OfflineSignature {
    fn parse(&self) -> Result<OfflineItem, String> {
        let local_timestamp = DateTime::parse_from_rfc3339(self.local_timestamp.trim())
            .map_err(|e| format!("localTimestamp is not RFC 3339: {e}"))?
            .with_timezone(&Utc);
        Ok(OfflineItem {
            fingerprint: DocumentFingerprint::new(self.doc_hash.clone()).map_err(|e| e.to_string())?,
            signature: decode_signature(&self.pqc_signature)?,
            hardware_id: HardwareId::new(self.hardware_id.clone()).map_err(|e| e.to_string())?,
            local_timestamp,
            signer_did: Did::new(self.signer_did.clone()).map_err(|e| e.to_string())?,
        })
    }

    fn into_batch_item(self) -> BatchItem {
        match self.parse() {
            Ok(item) => BatchItem::Valid(item),
            Err(error) => BatchItem::Invalid {
                fingerprint: self.doc_hash,
                error,
            },
        }
    }
}

/// Offline sync request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OfflineSyncRequest {
    #[serde(default)]
    pub signatures: Vec<OfflineSignature>,
}

/// Outcome for one submitted signature.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncItemResponse {
    pub doc_hash: String,
    /// `synced`, `already_exists`, or `failed`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ItemResult> for SyncItemResponse {
    fn from(result: ItemResult) -> Self {
        let status = match result.status {
            ItemStatus::Synced => "synced",
            ItemStatus::AlreadyExists => "already_exists",
            ItemStatus::Failed => "failed",
        };
        Self {
            doc_hash: result.fingerprint,
            status: status.to_string(),
            tx_hash: result.tx_reference.map(|r| r.to_string()),
            error: result.error,
        }
    }
}

/// Offline sync result.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfflineSyncResponse {
    pub processed: usize,
    pub synced: usize,
    pub already_exists: usize,
    pub failed: usize,
    /// In request order.
    pub results: Vec<SyncItemResponse>,
}

impl From<BatchResult> for OfflineSyncResponse {
    fn from(batch: BatchResult) -> Self {
        Self {
            processed: batch.processed,
            synced: batch.synced,
            already_exists: batch.already_exists,
            failed: batch.failed,
            results: batch.results.into_iter().map(SyncItemResponse::from).collect(),
        }
    }
}

/// Pending offline entries.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PendingResponse {
    pub pending: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Reconcile a batch of offline signatures.
#[utoipa::path(
    post,
    path = "/api/v1/offline/sync",
    request_body = OfflineSyncRequest,
    responses(
        (status = 200, description = "Batch processed", body = OfflineSyncResponse),
        (status = 422, description = "Empty or oversized batch", body = crate::error::ErrorBody),
    ),
    tag = "offline"
)]
async fn sync_offline(
    State(state): State<AppState>,
    client: ClientAddress,
    body: Result<Json<OfflineSyncRequest>, JsonRejection>,
) -> Result<Json<OfflineSyncResponse>, AppError> {
    let request = extract_json(body)?;
    let items: Vec<BatchItem> = request
        .signatures
        .into_iter()
        .map(OfflineSignature::into_batch_item)
        .collect();

    let batch = state.reconciler.reconcile(items, &client.origin()).await?;
    state.metrics.record_batch(&batch);
    Ok(Json(batch.into()))
}

/// Number of offline entries still pending.
#[utoipa::path(
    get,
    path = "/api/v1/offline/pending",
    responses(
        (status = 200, description = "Pending count", body = PendingResponse),
    ),
    tag = "offline"
)]
async fn pending_count(State(state): State<AppState>) -> Result<Json<PendingResponse>, AppError> {
    let pending = state.reconciler.pending_count().await?;
    Ok(Json(PendingResponse { pending }))
}

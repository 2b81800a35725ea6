//! # Signature Routes
//!
//! - `POST /api/v1/signatures/anchor`: anchor one signature for its signer
//! - `GET  /api/v1/signatures/recent`: the ten most recent signatures

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use inkless_core::{Did, DocumentCategory, DocumentFingerprint, HardwareId, SignatureMetadata};
use inkless_registry::{AnchorOutcome, AnchorRequest, AnchoringError, SignerEntry};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, ClientAddress, Validate};
use crate::routes::{decode_signature, rfc3339};
use crate::state::AppState;

const RECENT_LIMIT: usize = 10;

/// Assemble the signature router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/signatures/anchor", post(anchor_signature))
        .route("/api/v1/signatures/recent", get(recent_signatures))
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Signature anchoring request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnchorSignatureRequest {
    /// Document fingerprint.
    #[serde(rename = "docHash")]
    pub doc_hash: String,
    /// Post-quantum signature bytes, standard base64.
    #[serde(rename = "pqcSignature")]
    pub pqc_signature: String,
    /// Hardware identifier of the signing device.
    #[serde(rename = "hardwareID")]
    pub hardware_id: String,
    /// Signer DID.
    #[serde(rename = "signerDID")]
    pub signer_did: String,
    /// Document category. Defaults to `general_contract`.
    #[serde(rename = "documentCategory", default)]
    pub document_category: Option<String>,
    #[serde(rename = "fileName", default)]
    pub file_name: Option<String>,
    #[serde(rename = "fileSize", default)]
    pub file_size: Option<String>,
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
}

impl Validate for AnchorSignatureRequest {
    fn validate(&self) -> Result<(), String> {
        if self.doc_hash.trim().is_empty()
            || self.pqc_signature.trim().is_empty()
            || self.hardware_id.trim().is_empty()
        {
            return Err("docHash, pqcSignature, and hardwareID are required".to_string());
        }
        if self.signer_did.trim().is_empty() {
            return Err("signerDID is required".to_string());
        }
        Ok(())
    }
}

impl AnchorSignatureRequest {
    fn into_request(self) -> Result<AnchorRequest, AppError> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let category = DocumentCategory::or_default(self.document_category.as_deref())?;
        Ok(AnchorRequest {
            fingerprint: DocumentFingerprint::new(self.doc_hash)?,
            signature: decode_signature(&self.pqc_signature).map_err(AppError::Validation)?,
            hardware_id: HardwareId::new(self.hardware_id)?,
            signer_did: Did::new(self.signer_did)?,
            metadata: SignatureMetadata {
                category,
                file_name: non_blank(self.file_name),
                file_size: non_blank(self.file_size),
                mime_type: non_blank(self.mime_type),
            },
        })
    }
}

/// Successful anchor.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnchorResponse {
    /// Ledger transaction hash or `mock-tx-` fallback reference.
    pub tx_hash: String,
    /// Anchor time, RFC 3339.
    pub anchored_at: String,
    /// Signature record id.
    pub doc_id: String,
    /// Always `anchored`.
    pub status: String,
}

/// The signer had already anchored this document.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlreadySignedResponse {
    pub error: String,
    /// Reference of the existing anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

/// One entry of the recent-signatures feed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentSignature {
    pub id: String,
    pub file_name: String,
    pub file_size: String,
    pub mime_type: String,
    pub document_category: String,
    /// RFC 3339.
    pub sign_date: String,
    pub status: String,
    pub signer_did: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub doc_hash: String,
}

impl From<SignerEntry> for RecentSignature {
    fn from(entry: SignerEntry) -> Self {
        let record = entry.record;
        let file_name = record
            .metadata
            .file_name
            .unwrap_or_else(|| format!("Document_{}.pdf", record.fingerprint.prefix(8)));
        Self {
            id: record.id.to_string(),
            file_name,
            file_size: record
                .metadata
                .file_size
                .unwrap_or_else(|| "Unknown".to_string()),
            mime_type: record.metadata.mime_type.unwrap_or_default(),
            document_category: record.metadata.category.to_string(),
            sign_date: rfc3339(record.created_at),
            status: record.status.to_string(),
            signer_did: entry.did.to_string(),
            tx_hash: record.tx_reference.map(|r| r.to_string()),
            doc_hash: record.fingerprint.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Anchor a signature.
///
/// Idempotent per `(docHash, signerDID)`: a repeat returns 409 with the
/// existing reference and writes nothing.
#[utoipa::path(
    post,
    path = "/api/v1/signatures/anchor",
    request_body = AnchorSignatureRequest,
    responses(
        (status = 200, description = "Signature anchored", body = AnchorResponse),
        (status = 409, description = "Signer already signed this document", body = AlreadySignedResponse),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 502, description = "Ledger submission failed", body = crate::error::ErrorBody),
    ),
    tag = "signatures"
)]
async fn anchor_signature(
    State(state): State<AppState>,
    client: ClientAddress,
    body: Result<Json<AnchorSignatureRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = extract_validated_json(body)?.into_request()?;
    let mode = state.ledger.mode();

    let outcome = match state.anchoring.anchor(&request, &client.origin()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            state.metrics.record_anchor("failed", mode);
            if matches!(e, AnchoringError::LedgerSubmissionFailed(_)) {
                state.metrics.record_ledger_failure("online", 1);
            }
            return Err(e.into());
        }
    };
    let label = match &outcome {
        AnchorOutcome::Anchored(_) => "anchored",
        AnchorOutcome::AlreadySigned { .. } => "already_signed",
    };
    state.metrics.record_anchor(label, mode);

    match outcome {
        AnchorOutcome::Anchored(receipt) => Ok(Json(AnchorResponse {
            tx_hash: receipt.tx_reference.to_string(),
            anchored_at: rfc3339(receipt.anchored_at),
            doc_id: receipt.record_id.to_string(),
            status: receipt.status.to_string(),
        })
        .into_response()),
        AnchorOutcome::AlreadySigned { tx_reference, .. } => Ok((
            StatusCode::CONFLICT,
            Json(AlreadySignedResponse {
                error: "You have already signed this document".to_string(),
                tx_hash: tx_reference.map(|r| r.to_string()),
            }),
        )
            .into_response()),
    }
}

/// The most recent signatures, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/signatures/recent",
    responses(
        (status = 200, description = "Up to ten recent signatures", body = Vec<RecentSignature>),
    ),
    tag = "signatures"
)]
async fn recent_signatures(
    State(state): State<AppState>,
) -> Result<Json<Vec<RecentSignature>>, AppError> {
    let entries = state.store.recent_signatures(RECENT_LIMIT).await?;
    Ok(Json(entries.into_iter().map(RecentSignature::from).collect()))
}

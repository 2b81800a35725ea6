//! # Verification Routes
//!
//! - `GET /api/v1/verify/:doc_hash`       : every signer of a document
//! - `GET /api/v1/verify/:doc_hash/ledger`: the registry contract's answer

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use inkless_core::DocumentFingerprint;
use inkless_ledger::{LedgerAttestation, LedgerMode};
use inkless_registry::{SignerView, Verification, VerificationError};

use crate::error::AppError;
use crate::extractors::ClientAddress;
use crate::routes::rfc3339;
use crate::state::AppState;

/// Assemble the verification router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/verify/:doc_hash", get(verify_document))
        .route("/api/v1/verify/:doc_hash/ledger", get(ledger_readback))
}

/// One signer in a verification response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignerInfo {
    pub did: String,
    /// Anchor time, RFC 3339.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl From<&SignerView> for SignerInfo {
    fn from(view: &SignerView) -> Self {
        Self {
            did: view.did.to_string(),
            timestamp: rfc3339(view.signed_at),
            tx_hash: view.tx_reference.as_ref().map(|r| r.to_string()),
        }
    }
}

/// Verification result.
///
/// `signer`, `timestamp` and `ledgerTx` describe the first signer and are
/// kept for single-signer clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    pub signers: Vec<SignerInfo>,
    pub signer_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_tx: Option<String>,
    pub status: String,
}

impl VerifyResponse {
    fn not_found() -> Self {
        Self {
            is_valid: false,
            signer: None,
            signers: Vec::new(),
            signer_count: 0,
            timestamp: None,
            ledger_tx: None,
            status: "not_found".to_string(),
        }
    }
}

impl From<&Verification> for VerifyResponse {
    fn from(verification: &Verification) -> Self {
        let first = verification.first();
        Self {
            is_valid: true,
            signer: Some(first.did.to_string()),
            signers: verification.signers().iter().map(SignerInfo::from).collect(),
            signer_count: verification.signer_count(),
            timestamp: Some(rfc3339(first.signed_at)),
            ledger_tx: first.tx_reference.as_ref().map(|r| r.to_string()),
            status: first.status.to_string(),
        }
    }
}

/// Ledger read-back result.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReadbackResponse {
    /// `live` or `fallback`.
    #[schema(value_type = String)]
    pub mode: LedgerMode,
    /// Absent in fallback mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub attestation: Option<LedgerAttestation>,
}

/// Every signer of a document, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/verify/{doc_hash}",
    params(
        ("doc_hash" = String, Path, description = "Document fingerprint")
    ),
    responses(
        (status = 200, description = "Document is signed", body = VerifyResponse),
        (status = 404, description = "No signatures for the document", body = VerifyResponse),
        (status = 422, description = "Malformed fingerprint", body = crate::error::ErrorBody),
    ),
    tag = "verification"
)]
async fn verify_document(
    State(state): State<AppState>,
    client: ClientAddress,
    Path(doc_hash): Path<String>,
) -> Result<Response, AppError> {
    let fingerprint = DocumentFingerprint::new(doc_hash)?;
    match state.verification.verify(&fingerprint, &client.origin()).await {
        Ok(verification) => Ok(Json(VerifyResponse::from(&verification)).into_response()),
        Err(VerificationError::NotFound(_)) => {
            Ok((StatusCode::NOT_FOUND, Json(VerifyResponse::not_found())).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Read the document's anchor back from the registry contract.
#[utoipa::path(
    get,
    path = "/api/v1/verify/{doc_hash}/ledger",
    params(
        ("doc_hash" = String, Path, description = "Document fingerprint")
    ),
    responses(
        (status = 200, description = "Registry answer", body = LedgerReadbackResponse),
        (status = 502, description = "Ledger read failed", body = crate::error::ErrorBody),
    ),
    tag = "verification"
)]
async fn ledger_readback(
    State(state): State<AppState>,
    Path(doc_hash): Path<String>,
) -> Result<Json<LedgerReadbackResponse>, AppError> {
    let fingerprint = DocumentFingerprint::new(doc_hash)?;
    let readback = state.verification.ledger_attestation(&fingerprint).await?;
    Ok(Json(LedgerReadbackResponse {
        mode: readback.mode,
        attestation: readback.attestation,
    }))
}

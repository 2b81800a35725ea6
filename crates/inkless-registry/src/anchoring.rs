//! # Anchoring Service
//!
//! Records a signer's signature over a document exactly once.
//!
//! ## Flow
//!
//! 1. Resolve (or create) the signer from its DID.
//! 2. An existing record for `(fingerprint, signer)` short-circuits to
//!    [`AnchorOutcome::AlreadySigned`] with the stored reference.
//! 3. Anchor through the selected [`LedgerBackend`](inkless_ledger::LedgerBackend)
//!    under the configured deadline. Live mode submits a transaction; fallback
//!    mode synthesizes a `mock-tx-` reference. Any failure or timeout is
//!    [`AnchoringError::LedgerSubmissionFailed`] and nothing is persisted.
//! 4. Insert the record with status `anchored` (atomic insert-if-absent). A
//!    racing duplicate resolves to `AlreadySigned`, same as step 2.
//! 5. Append a `signature_anchor` audit entry. Audit failure is logged only.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use inkless_core::{
    AuditAction, AuditEntry, Did, DocumentFingerprint, HardwareId, RecordId, SignatureMetadata,
    SignatureRecord, SignatureStatus, TxReference, UserId,
};
use inkless_ledger::{AnchorError, LedgerAccess, LedgerMode};
use serde_json::json;
use thiserror::Error;

use crate::store::{InsertOutcome, RegistryStore, StoreError};

/// Default bound on a ledger submission.
pub const DEFAULT_LEDGER_DEADLINE: Duration = Duration::from_secs(30);

/// Where a request came from. Recorded in audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    /// Client network address, when known.
    pub ip_address: Option<String>,
}

impl RequestOrigin {
    /// Origin with a known address.
    pub fn from_ip(ip: impl Into<String>) -> Self {
        Self {
            ip_address: Some(ip.into()),
        }
    }
}

/// A request to anchor one signature.
#[derive(Debug, Clone)]
pub struct AnchorRequest {
    /// Fingerprint of the signed document.
    pub fingerprint: DocumentFingerprint,
    /// Opaque post-quantum signature bytes.
    pub signature: Vec<u8>,
    /// Hardware that produced the signature.
    pub hardware_id: HardwareId,
    /// The signer.
    pub signer_did: Did,
    /// Informational metadata.
    pub metadata: SignatureMetadata,
}

/// A fresh anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorReceipt {
    /// The stored record's id.
    pub record_id: RecordId,
    /// Ledger or fallback reference.
    pub tx_reference: TxReference,
    /// When the record was created.
    pub anchored_at: DateTime<Utc>,
    /// Always [`SignatureStatus::Anchored`] for a fresh anchor.
    pub status: SignatureStatus,
    /// Backend that produced the reference.
    pub mode: LedgerMode,
}

/// Successful outcome of [`AnchoringService::anchor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorOutcome {
    /// The signature was anchored by this call.
    Anchored(AnchorReceipt),
    /// The signer had already anchored this document. Idempotent success.
    AlreadySigned {
        /// The existing record.
        record_id: RecordId,
        /// The existing record's reference.
        tx_reference: Option<TxReference>,
    },
}

impl AnchorOutcome {
    /// Reference for either outcome.
    pub fn tx_reference(&self) -> Option<&TxReference> {
        match self {
            Self::Anchored(receipt) => Some(&receipt.tx_reference),
            Self::AlreadySigned { tx_reference, .. } => tx_reference.as_ref(),
        }
    }
}

/// Anchoring failure. No record exists after either variant.
#[derive(Error, Debug)]
pub enum AnchoringError {
    /// The ledger did not accept the submission in time. Safe to retry.
    #[error("ledger submission failed: {0}")]
    LedgerSubmissionFailed(#[source] AnchorError),

    /// The store failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

/// Idempotent signature anchoring. Cheap to clone.
#[derive(Clone)]
pub struct AnchoringService {
    store: Arc<dyn RegistryStore>,
    ledger: LedgerAccess,
    deadline: Duration,
}

impl std::fmt::Debug for AnchoringService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchoringService")
            .field("mode", &self.ledger.mode())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl AnchoringService {
    /// Create a service over `store` and the settled ledger capability.
    pub fn new(store: Arc<dyn RegistryStore>, ledger: LedgerAccess, deadline: Duration) -> Self {
        Self {
            store,
            ledger,
            deadline,
        }
    }

    /// The ledger capability in use.
    pub fn ledger(&self) -> &LedgerAccess {
        &self.ledger
    }

    /// Anchor `request` for its signer.
    ///
    /// # Errors
    ///
    /// [`AnchoringError::LedgerSubmissionFailed`] when the backend fails or
    /// the deadline expires; [`AnchoringError::Persistence`] when the store
    /// fails. Neither leaves a record behind.
    pub async fn anchor(
        &self,
        request: &AnchorRequest,
        origin: &RequestOrigin,
    ) -> Result<AnchorOutcome, AnchoringError> {
        let signer = self
            .store
            .find_or_create_user(&request.signer_did, &request.hardware_id)
            .await?;

        if let Some(existing) = self.store.find_signature(&request.fingerprint, signer).await? {
            tracing::debug!(
                fingerprint = %request.fingerprint,
                signer = %request.signer_did,
                "signature already anchored"
            );
            return Ok(AnchorOutcome::AlreadySigned {
                record_id: existing.id,
                tx_reference: existing.tx_reference,
            });
        }

        let tx_reference = self.submit(request).await?;

        let record = SignatureRecord::anchored(
            request.fingerprint.clone(),
            signer,
            request.hardware_id.clone(),
            request.metadata.clone(),
            tx_reference.clone(),
            Utc::now(),
        );

        let stored = match self.store.insert_signature(record).await {
            Ok(InsertOutcome::Inserted(stored)) => stored,
            Ok(InsertOutcome::Duplicate(existing)) => {
                if tx_reference.is_ledger_backed() {
                    tracing::warn!(
                        fingerprint = %request.fingerprint,
                        signer = %request.signer_did,
                        orphaned = %tx_reference,
                        "concurrent duplicate anchor; submitted transaction is superseded"
                    );
                }
                return Ok(AnchorOutcome::AlreadySigned {
                    record_id: existing.id,
                    tx_reference: existing.tx_reference,
                });
            }
            Err(e) => {
                if tx_reference.is_ledger_backed() {
                    tracing::error!(
                        fingerprint = %request.fingerprint,
                        tx_reference = %tx_reference,
                        error = %e,
                        "ledger submission succeeded but the record was not persisted"
                    );
                }
                return Err(e.into());
            }
        };

        self.audit(signer, request, origin).await;

        tracing::info!(
            fingerprint = %request.fingerprint,
            signer = %request.signer_did,
            tx_reference = %tx_reference,
            mode = %self.ledger.mode(),
            "signature anchored"
        );

        Ok(AnchorOutcome::Anchored(AnchorReceipt {
            record_id: stored.id,
            tx_reference,
            anchored_at: stored.created_at,
            status: stored.status,
            mode: self.ledger.mode(),
        }))
    }

    async fn submit(&self, request: &AnchorRequest) -> Result<TxReference, AnchoringError> {
        let backend = self.ledger.backend();
        let attempt = backend.anchor(
            &request.fingerprint,
            &request.signature,
            &request.hardware_id,
            self.deadline,
        );

        let result = match tokio::time::timeout(self.deadline, attempt).await {
            Ok(result) => result,
            Err(_) => Err(AnchorError::DeadlineExceeded {
                millis: self.deadline.as_millis(),
            }),
        };

        result.map_err(|e| {
            tracing::warn!(
                fingerprint = %request.fingerprint,
                signer = %request.signer_did,
                error = %e,
                "ledger submission failed"
            );
            AnchoringError::LedgerSubmissionFailed(e)
        })
    }

    async fn audit(&self, signer: UserId, request: &AnchorRequest, origin: &RequestOrigin) {
        let entry = AuditEntry::new(
            signer,
            AuditAction::SignatureAnchor,
            origin.ip_address.clone(),
            json!({
                "docHash": request.fingerprint.as_str(),
                "hardwareID": request.hardware_id.as_str(),
                "category": request.metadata.category.as_str(),
            }),
        );
        if let Err(e) = self.store.append_audit(entry).await {
            tracing::warn!(
                fingerprint = %request.fingerprint,
                error = %e,
                "failed to append signature_anchor audit entry"
            );
        }
    }
}

//! # Verification Service
//!
//! Answers "who signed this document, and when" from the persisted records.
//! Reads go to the same store the anchoring service writes, so a completed
//! anchor is visible to the next verification.
//!
//! A document with no records is [`VerificationError::NotFound`], whether it
//! was never submitted or simply never signed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use inkless_core::{
    AuditAction, AuditEntry, Did, DocumentFingerprint, RecordId, SignatureStatus, TxReference,
};
use inkless_ledger::{LedgerAccess, LedgerAttestation, LedgerMode, VerifyError};
use serde_json::json;
use thiserror::Error;

use crate::anchoring::RequestOrigin;
use crate::store::{RegistryStore, SignerEntry, StoreError};

/// One signer of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerView {
    /// Signer's DID.
    pub did: Did,
    /// When the signature was anchored.
    pub signed_at: DateTime<Utc>,
    /// Anchoring reference.
    pub tx_reference: Option<TxReference>,
    /// Record id.
    pub record_id: RecordId,
    /// Record status.
    pub status: SignatureStatus,
}

impl From<SignerEntry> for SignerView {
    fn from(entry: SignerEntry) -> Self {
        Self {
            did: entry.did,
            signed_at: entry.record.created_at,
            tx_reference: entry.record.tx_reference,
            record_id: entry.record.id,
            status: entry.record.status,
        }
    }
}

/// Every signer of a document, oldest first. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    fingerprint: DocumentFingerprint,
    signers: Vec<SignerView>,
}

impl Verification {
    /// Build from signers ordered by anchor time. `None` when `signers` is
    /// empty.
    pub fn new(fingerprint: DocumentFingerprint, signers: Vec<SignerView>) -> Option<Self> {
        if signers.is_empty() {
            return None;
        }
        Some(Self {
            fingerprint,
            signers,
        })
    }

    /// Fingerprint that was verified.
    pub fn fingerprint(&self) -> &DocumentFingerprint {
        &self.fingerprint
    }

    /// Signers ordered by anchor time.
    pub fn signers(&self) -> &[SignerView] {
        &self.signers
    }

    /// The first signer, kept for single-signer clients.
    pub fn first(&self) -> &SignerView {
        // `new` rejects an empty list.
        &self.signers[0]
    }

    /// Number of signers.
    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }
}

/// Ledger read-back for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReadback {
    /// Backend that answered.
    pub mode: LedgerMode,
    /// The registry's answer. `None` in fallback mode.
    pub attestation: Option<LedgerAttestation>,
}

/// Verification failure.
#[derive(Error, Debug)]
pub enum VerificationError {
    /// No signatures exist for the fingerprint.
    #[error("no signatures found for document {0}")]
    NotFound(DocumentFingerprint),

    /// The store failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// The ledger read failed.
    #[error("ledger verification failed: {0}")]
    Ledger(#[from] VerifyError),
}

/// Multi-party signature verification. Cheap to clone.
#[derive(Clone)]
pub struct VerificationService {
    store: Arc<dyn RegistryStore>,
    ledger: LedgerAccess,
    deadline: Duration,
}

impl std::fmt::Debug for VerificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationService")
            .field("mode", &self.ledger.mode())
            .finish()
    }
}

impl VerificationService {
    /// Create a service over `store`.
    pub fn new(store: Arc<dyn RegistryStore>, ledger: LedgerAccess, deadline: Duration) -> Self {
        Self {
            store,
            ledger,
            deadline,
        }
    }

    /// All signers of `fingerprint`, oldest first.
    ///
    /// Appends a best-effort `signature_verify` audit entry for the first
    /// signer.
    ///
    /// # Errors
    ///
    /// [`VerificationError::NotFound`] for an unsigned document,
    /// [`VerificationError::Persistence`] when the store fails.
    pub async fn verify(
        &self,
        fingerprint: &DocumentFingerprint,
        origin: &RequestOrigin,
    ) -> Result<Verification, VerificationError> {
        let entries = self.store.signatures_for_document(fingerprint).await?;
        let Some(first) = entries.first() else {
            return Err(VerificationError::NotFound(fingerprint.clone()));
        };

        let audit = AuditEntry::new(
            first.record.signer_id,
            AuditAction::SignatureVerify,
            origin.ip_address.clone(),
            json!({
                "docHash": fingerprint.as_str(),
                "signerCount": entries.len(),
            }),
        );
        if let Err(e) = self.store.append_audit(audit).await {
            tracing::warn!(
                fingerprint = %fingerprint,
                error = %e,
                "failed to append signature_verify audit entry"
            );
        }

        let signers = entries.into_iter().map(SignerView::from).collect();
        Verification::new(fingerprint.clone(), signers)
            .ok_or_else(|| VerificationError::NotFound(fingerprint.clone()))
    }

    /// Read the document's anchor back from the ledger.
    ///
    /// # Errors
    ///
    /// [`VerificationError::Ledger`] with the [`VerifyError`] as-is.
    pub async fn ledger_attestation(
        &self,
        fingerprint: &DocumentFingerprint,
    ) -> Result<LedgerReadback, VerificationError> {
        let attestation = self
            .ledger
            .backend()
            .verify(fingerprint, self.deadline)
            .await?;
        Ok(LedgerReadback {
            mode: self.ledger.mode(),
            attestation,
        })
    }
}

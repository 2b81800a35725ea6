//! # Persisted Records
//!
//! The three records owned by the anchoring subsystem:
//!
//! - [`SignatureRecord`]: one per `(fingerprint, signer)`, immutable once
//!   anchored except for the `verified`/`revoked` status moves.
//! - [`OfflineSignatureEntry`]: the audit trail of a signature captured while
//!   disconnected. Never deleted.
//! - [`AuditEntry`]: append-only action log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateTransitionError;
use crate::identity::{Did, DocumentFingerprint, HardwareId, OfflineEntryId, RecordId, UserId};
use crate::reference::TxReference;
use crate::status::{AuditAction, DocumentCategory, SignatureStatus, SyncStatus};

/// Informational metadata supplied with a signing request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureMetadata {
    /// Document classification.
    pub category: DocumentCategory,
    /// Original file name, if the client shared it.
    pub file_name: Option<String>,
    /// Original file size as the client reported it (e.g. `"2.4 MB"`).
    pub file_size: Option<String>,
    /// Original MIME type.
    pub mime_type: Option<String>,
}

/// A signer's anchored signature over a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// Record identifier.
    pub id: RecordId,
    /// Fingerprint of the signed document.
    pub fingerprint: DocumentFingerprint,
    /// The signer. Unique together with `fingerprint`.
    pub signer_id: UserId,
    /// Informational metadata.
    pub metadata: SignatureMetadata,
    /// Anchoring transaction, absent until anchored.
    pub tx_reference: Option<TxReference>,
    /// Lifecycle status.
    pub status: SignatureStatus,
    /// Hardware that produced the signature.
    pub hardware_id: HardwareId,
    /// Creation time. Orders signers of the same document.
    pub created_at: DateTime<Utc>,
    /// Time of the last status change.
    pub updated_at: DateTime<Utc>,
}

impl SignatureRecord {
    /// Build a record for a signature that has just been anchored.
    pub fn anchored(
        fingerprint: DocumentFingerprint,
        signer_id: UserId,
        hardware_id: HardwareId,
        metadata: SignatureMetadata,
        tx_reference: TxReference,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            fingerprint,
            signer_id,
            metadata,
            tx_reference: Some(tx_reference),
            status: SignatureStatus::Anchored,
            hardware_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the record to `next`, stamping `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StateTransitionError`] if the lifecycle forbids the move.
    /// The record is left untouched in that case.
    pub fn transition(
        &mut self,
        next: SignatureStatus,
        now: DateTime<Utc>,
    ) -> Result<(), StateTransitionError> {
        self.status = self.status.transition_to(next)?;
        self.updated_at = now;
        Ok(())
    }
}

/// A signature captured while the signing device was offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineSignatureEntry {
    /// Entry identifier.
    pub id: OfflineEntryId,
    /// Fingerprint of the signed document.
    pub fingerprint: DocumentFingerprint,
    /// Raw post-quantum signature bytes. Opaque to this subsystem.
    pub signature: Vec<u8>,
    /// Hardware that produced the signature.
    pub hardware_id: HardwareId,
    /// Signer the device attributed the signature to.
    pub signer_did: Did,
    /// Signing time as observed by the device clock.
    pub local_timestamp: DateTime<Utc>,
    /// Sync state.
    pub sync_status: SyncStatus,
    /// Most recent anchoring failure, if any.
    pub error_message: Option<String>,
    /// Ingest time.
    pub created_at: DateTime<Utc>,
    /// Set when the entry reaches [`SyncStatus::Synced`].
    pub synced_at: Option<DateTime<Utc>>,
}

impl OfflineSignatureEntry {
    /// Build a freshly ingested, pending entry.
    pub fn pending(
        fingerprint: DocumentFingerprint,
        signature: Vec<u8>,
        hardware_id: HardwareId,
        signer_did: Did,
        local_timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OfflineEntryId::new(),
            fingerprint,
            signature,
            hardware_id,
            signer_did,
            local_timestamp,
            sync_status: SyncStatus::Pending,
            error_message: None,
            created_at: now,
            synced_at: None,
        }
    }
}

/// Append-only record of an audited action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Acting user.
    pub user_id: UserId,
    /// What was done.
    pub action: AuditAction,
    /// Originating network address, when known.
    pub ip_address: Option<String>,
    /// Structured action detail.
    pub detail: serde_json::Value,
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Build an entry stamped with the current time.
    pub fn new(
        user_id: UserId,
        action: AuditAction,
        ip_address: Option<String>,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            user_id,
            action,
            ip_address,
            detail,
            timestamp: Utc::now(),
        }
    }
}

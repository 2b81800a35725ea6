//! # Persistence Interfaces
//!
//! The services are written against these traits. Two implementations ship
//! with the workspace: [`MemoryStore`](crate::MemoryStore) here and the
//! Postgres store in the API crate.
//!
//! ## Uniqueness
//!
//! [`SignatureStore::insert_signature`] is an atomic insert-if-absent on
//! `(fingerprint, signer_id)`. A racing duplicate resolves to
//! [`InsertOutcome::Duplicate`] carrying the winning record; it is never an
//! error and never a second row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkless_core::{
    AuditEntry, Did, DocumentFingerprint, HardwareId, OfflineEntryId, OfflineSignatureEntry,
    SignatureRecord, UserId,
};
use thiserror::Error;

/// Persistence failure. The operation that hit it is aborted.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store rejected or failed the operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A row referenced by id does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of row.
        entity: &'static str,
        /// Its identifier.
        id: String,
    },

    /// A stored value failed to parse back into a domain type.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

/// Result of an insert-if-absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was stored.
    Inserted(SignatureRecord),
    /// A record for the same `(fingerprint, signer)` already existed.
    Duplicate(SignatureRecord),
}

/// A signature record joined with its signer's DID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerEntry {
    /// Signer's DID.
    pub did: Did,
    /// The stored record.
    pub record: SignatureRecord,
}

/// Signer identities.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Return the user for `did`, creating it on first sight.
    ///
    /// First write wins: a concurrent creation for the same DID returns the
    /// same id to both callers.
    async fn find_or_create_user(
        &self,
        did: &Did,
        hardware_id: &HardwareId,
    ) -> Result<UserId, StoreError>;

    /// Return the user for `did`, if one exists.
    async fn find_user(&self, did: &Did) -> Result<Option<UserId>, StoreError>;
}

/// Signature records, offline entries, and the audit log.
#[async_trait]
pub trait SignatureStore: Send + Sync {
    /// The record for `(fingerprint, signer)`, if any.
    async fn find_signature(
        &self,
        fingerprint: &DocumentFingerprint,
        signer: UserId,
    ) -> Result<Option<SignatureRecord>, StoreError>;

    /// Atomic insert-if-absent on `(fingerprint, signer_id)`.
    async fn insert_signature(&self, record: SignatureRecord) -> Result<InsertOutcome, StoreError>;

    /// Every record for `fingerprint`, oldest first. Ties keep insertion order.
    async fn signatures_for_document(
        &self,
        fingerprint: &DocumentFingerprint,
    ) -> Result<Vec<SignerEntry>, StoreError>;

    /// The `limit` most recent records, newest first.
    async fn recent_signatures(&self, limit: usize) -> Result<Vec<SignerEntry>, StoreError>;

    /// Append to the audit log.
    async fn append_audit(&self, entry: AuditEntry) -> Result<(), StoreError>;

    /// Store a newly ingested offline entry.
    async fn insert_offline(&self, entry: OfflineSignatureEntry) -> Result<(), StoreError>;

    /// Mark every pending entry for `(fingerprint, signer_did)` synced.
    ///
    /// Returns how many entries changed. Entries already synced are left
    /// untouched, and zero matches is not an error.
    async fn resolve_offline_pending(
        &self,
        fingerprint: &DocumentFingerprint,
        signer_did: &Did,
        synced_at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Record an anchoring failure. The entry stays pending.
    async fn record_offline_error(&self, id: OfflineEntryId, message: &str) -> Result<(), StoreError>;

    /// Number of offline entries still pending.
    async fn count_offline_pending(&self) -> Result<u64, StoreError>;
}

/// Everything the registry services need from persistence.
pub trait RegistryStore: IdentityStore + SignatureStore {}

impl<T: IdentityStore + SignatureStore> RegistryStore for T {}

//! In-memory [`RegistryStore`](crate::RegistryStore).
//!
//! All state sits behind one `parking_lot::Mutex`, which is never held across
//! an `.await`. That single critical section is what makes
//! `insert_signature` an atomic insert-if-absent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkless_core::{
    AuditEntry, Did, DocumentFingerprint, HardwareId, OfflineEntryId, OfflineSignatureEntry,
    SignatureRecord, SyncStatus, UserId,
};
use parking_lot::Mutex;

use crate::store::{IdentityStore, InsertOutcome, SignatureStore, SignerEntry, StoreError};

#[derive(Debug, Default)]
struct Inner {
    users_by_did: HashMap<Did, UserId>,
    dids: HashMap<UserId, Did>,
    // Insertion order is the tie-break for equal creation times.
    signatures: Vec<SignatureRecord>,
    signature_index: HashMap<(DocumentFingerprint, UserId), usize>,
    offline: HashMap<OfflineEntryId, OfflineSignatureEntry>,
    audit: Vec<AuditEntry>,
}

impl Inner {
    fn entry(&self, record: &SignatureRecord) -> Result<SignerEntry, StoreError> {
        let did = self
            .dids
            .get(&record.signer_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "user",
                id: record.signer_id.to_string(),
            })?;
        Ok(SignerEntry {
            did,
            record: record.clone(),
        })
    }
}

/// Thread-safe, cloneable in-memory store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the audit log, oldest first.
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.inner.lock().audit.clone()
    }

    /// Snapshot of one offline entry.
    pub fn offline_entry(&self, id: OfflineEntryId) -> Option<OfflineSignatureEntry> {
        self.inner.lock().offline.get(&id).cloned()
    }

    /// Snapshot of every offline entry.
    pub fn offline_entries(&self) -> Vec<OfflineSignatureEntry> {
        self.inner.lock().offline.values().cloned().collect()
    }

    /// Number of stored signature records.
    pub fn signature_count(&self) -> usize {
        self.inner.lock().signatures.len()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_or_create_user(
        &self,
        did: &Did,
        _hardware_id: &HardwareId,
    ) -> Result<UserId, StoreError> {
        let mut inner = self.inner.lock();
        if let Some(id) = inner.users_by_did.get(did) {
            return Ok(*id);
        }
        let id = UserId::new();
        inner.users_by_did.insert(did.clone(), id);
        inner.dids.insert(id, did.clone());
        Ok(id)
    }

    async fn find_user(&self, did: &Did) -> Result<Option<UserId>, StoreError> {
        Ok(self.inner.lock().users_by_did.get(did).copied())
    }
}

#[async_trait]
impl SignatureStore for MemoryStore {
    async fn find_signature(
        &self,
        fingerprint: &DocumentFingerprint,
        signer: UserId,
    ) -> Result<Option<SignatureRecord>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .signature_index
            .get(&(fingerprint.clone(), signer))
            .map(|idx| inner.signatures[*idx].clone()))
    }

    async fn insert_signature(&self, record: SignatureRecord) -> Result<InsertOutcome, StoreError> {
        let mut inner = self.inner.lock();
        let key = (record.fingerprint.clone(), record.signer_id);
        if let Some(idx) = inner.signature_index.get(&key) {
            return Ok(InsertOutcome::Duplicate(inner.signatures[*idx].clone()));
        }
        let idx = inner.signatures.len();
        inner.signatures.push(record.clone());
        inner.signature_index.insert(key, idx);
        Ok(InsertOutcome::Inserted(record))
    }

    async fn signatures_for_document(
        &self,
        fingerprint: &DocumentFingerprint,
    ) -> Result<Vec<SignerEntry>, StoreError> {
        let inner = self.inner.lock();
        let mut records: Vec<&SignatureRecord> = inner
            .signatures
            .iter()
            .filter(|r| &r.fingerprint == fingerprint)
            .collect();
        records.sort_by_key(|r| r.created_at);
        records.into_iter().map(|r| inner.entry(r)).collect()
    }

    async fn recent_signatures(&self, limit: usize) -> Result<Vec<SignerEntry>, StoreError> {
        let inner = self.inner.lock();
        let mut records: Vec<&SignatureRecord> = inner.signatures.iter().rev().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
            .into_iter()
            .take(limit)
            .map(|r| inner.entry(r))
            .collect()
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.inner.lock().audit.push(entry);
        Ok(())
    }

    async fn insert_offline(&self, entry: OfflineSignatureEntry) -> Result<(), StoreError> {
        self.inner.lock().offline.insert(entry.id, entry);
        Ok(())
    }

    async fn resolve_offline_pending(
        &self,
        fingerprint: &DocumentFingerprint,
        signer_did: &Did,
        synced_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock();
        let mut resolved = 0;
        for entry in inner.offline.values_mut().filter(|e| {
            e.sync_status == SyncStatus::Pending
                && &e.fingerprint == fingerprint
                && &e.signer_did == signer_did
        }) {
            entry.sync_status = SyncStatus::Synced;
            entry.synced_at = Some(synced_at);
            entry.error_message = None;
            resolved += 1;
        }
        Ok(resolved)
    }

    async fn record_offline_error(&self, id: OfflineEntryId, message: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let entry = inner.offline.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            entity: "offline signature",
            id: id.to_string(),
        })?;
        entry.error_message = Some(message.to_string());
        Ok(())
    }

    async fn count_offline_pending(&self) -> Result<u64, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .offline
            .values()
            .filter(|e| e.sync_status == SyncStatus::Pending)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkless_core::{SignatureMetadata, TxReference};

    fn did(s: &str) -> Did {
        Did::new(s).unwrap()
    }

    fn hw() -> HardwareId {
        HardwareId::new("hw-1").unwrap()
    }

    fn fp(s: &str) -> DocumentFingerprint {
        DocumentFingerprint::new(s).unwrap()
    }

    fn record(fingerprint: &str, signer: UserId, at: DateTime<Utc>) -> SignatureRecord {
        SignatureRecord::anchored(
            fp(fingerprint),
            signer,
            hw(),
            SignatureMetadata::default(),
            TxReference::fallback(),
            at,
        )
    }

    #[tokio::test]
    async fn find_or_create_is_first_write_wins() {
        let store = MemoryStore::new();
        let a = store.find_or_create_user(&did("did:x:1"), &hw()).await.unwrap();
        let b = store.find_or_create_user(&did("did:x:1"), &hw()).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.find_user(&did("did:x:1")).await.unwrap(), Some(a));
        assert_eq!(store.find_user(&did("did:x:2")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn insert_is_atomic_insert_if_absent() {
        let store = MemoryStore::new();
        let signer = store.find_or_create_user(&did("did:x:1"), &hw()).await.unwrap();
        let first = record("abc123", signer, Utc::now());
        let second = record("abc123", signer, Utc::now());

        assert_eq!(
            store.insert_signature(first.clone()).await.unwrap(),
            InsertOutcome::Inserted(first.clone())
        );
        assert_eq!(
            store.insert_signature(second).await.unwrap(),
            InsertOutcome::Duplicate(first)
        );
        assert_eq!(store.signature_count(), 1);
    }

    #[tokio::test]
    async fn signatures_are_ordered_oldest_first_with_stable_ties() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        let mut signers = Vec::new();
        for i in 0..3 {
            signers.push(
                store
                    .find_or_create_user(&did(&format!("did:x:{i}")), &hw())
                    .await
                    .unwrap(),
            );
        }
        // Inserted out of time order; two share a timestamp.
        store.insert_signature(record("doc", signers[2], t0 + chrono::Duration::seconds(5))).await.unwrap();
        store.insert_signature(record("doc", signers[0], t0)).await.unwrap();
        store.insert_signature(record("doc", signers[1], t0)).await.unwrap();
        store.insert_signature(record("other", signers[0], t0)).await.unwrap();

        let entries = store.signatures_for_document(&fp("doc")).await.unwrap();
        let dids: Vec<&str> = entries.iter().map(|e| e.did.as_str()).collect();
        assert_eq!(dids, vec!["did:x:0", "did:x:1", "did:x:2"]);
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_limited() {
        let store = MemoryStore::new();
        let signer = store.find_or_create_user(&did("did:x:1"), &hw()).await.unwrap();
        let t0 = Utc::now();
        for i in 0..5 {
            store
                .insert_signature(record(&format!("doc{i}"), signer, t0 + chrono::Duration::seconds(i)))
                .await
                .unwrap();
        }
        let recent = store.recent_signatures(3).await.unwrap();
        let fps: Vec<&str> = recent.iter().map(|e| e.record.fingerprint.as_str()).collect();
        assert_eq!(fps, vec!["doc4", "doc3", "doc2"]);
    }

    fn offline(fingerprint: &str, signer: &str) -> OfflineSignatureEntry {
        OfflineSignatureEntry::pending(
            fp(fingerprint),
            vec![1],
            hw(),
            did(signer),
            Utc::now(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn offline_lifecycle() {
        let store = MemoryStore::new();
        let entry = offline("abc123", "did:x:1");
        let id = entry.id;
        store.insert_offline(entry).await.unwrap();
        assert_eq!(store.count_offline_pending().await.unwrap(), 1);

        store.record_offline_error(id, "ledger down").await.unwrap();
        let stored = store.offline_entry(id).unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Pending);
        assert_eq!(stored.error_message.as_deref(), Some("ledger down"));

        let resolved = store
            .resolve_offline_pending(&fp("abc123"), &did("did:x:1"), Utc::now())
            .await
            .unwrap();
        assert_eq!(resolved, 1);
        let stored = store.offline_entry(id).unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Synced);
        assert!(stored.synced_at.is_some());
        assert!(stored.error_message.is_none());
        assert_eq!(store.count_offline_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn resolve_touches_only_pending_entries_of_the_pair() {
        let store = MemoryStore::new();
        for entry in [
            offline("abc123", "did:x:1"),
            offline("abc123", "did:x:1"),
            offline("abc123", "did:x:2"),
            offline("def456", "did:x:1"),
        ] {
            store.insert_offline(entry).await.unwrap();
        }

        let resolved = store
            .resolve_offline_pending(&fp("abc123"), &did("did:x:1"), Utc::now())
            .await
            .unwrap();
        assert_eq!(resolved, 2);
        assert_eq!(store.count_offline_pending().await.unwrap(), 2);

        let again = store
            .resolve_offline_pending(&fp("abc123"), &did("did:x:1"), Utc::now())
            .await
            .unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn recording_error_on_unknown_entry_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .record_offline_error(OfflineEntryId::new(), "ledger down")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}

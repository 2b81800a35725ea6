//! Shared fixtures for the registry integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkless_core::{
    AuditEntry, Did, DocumentFingerprint, HardwareId, OfflineEntryId, OfflineSignatureEntry,
    SignatureMetadata, SignatureRecord, TxReference, UserId,
};
use inkless_ledger::{
    AnchorError, LedgerAccess, LedgerAttestation, LedgerBackend, LedgerMode, RpcError, VerifyError,
};
use inkless_registry::{
    AnchorRequest, AnchoringService, IdentityStore, InsertOutcome, MemoryStore, OfflineReconciler,
    SignatureStore, SignerEntry, StoreError, VerificationService,
};

/// How the scripted ledger answers `anchor`.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Accept,
    /// Accept after yielding to the runtime for the given time.
    AcceptAfter(Duration),
    Reject,
    Stall(Duration),
}

/// Live-mode backend with scripted answers. Counts anchor calls.
#[derive(Debug)]
pub struct ScriptedLedger {
    script: Script,
    per_fingerprint: HashMap<String, Script>,
    calls: AtomicU64,
}

impl ScriptedLedger {
    pub fn new(script: Script) -> Arc<Self> {
        Self::with_overrides(script, &[])
    }

    /// `script` for every fingerprint except the listed ones.
    pub fn with_overrides(script: Script, overrides: &[(&str, Script)]) -> Arc<Self> {
        Arc::new(Self {
            script,
            per_fingerprint: overrides
                .iter()
                .map(|(fp, script)| (fp.to_string(), *script))
                .collect(),
            calls: AtomicU64::new(0),
        })
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

fn accepted(n: u64) -> TxReference {
    let mut hash = [0u8; 32];
    hash[24..].copy_from_slice(&n.to_be_bytes());
    TxReference::ledger(hash)
}

#[async_trait]
impl LedgerBackend for ScriptedLedger {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Live
    }

    async fn anchor(
        &self,
        fingerprint: &DocumentFingerprint,
        _signature: &[u8],
        _hardware_id: &HardwareId,
        _deadline: Duration,
    ) -> Result<TxReference, AnchorError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let script = self
            .per_fingerprint
            .get(fingerprint.as_str())
            .copied()
            .unwrap_or(self.script);
        match script {
            Script::Accept => Ok(accepted(n)),
            Script::AcceptAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(accepted(n))
            }
            Script::Reject => Err(AnchorError::Submission(RpcError::Node {
                method: "eth_sendRawTransaction".into(),
                code: -32000,
                message: "insufficient funds".into(),
            })),
            Script::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Err(AnchorError::Signing("unreachable".into()))
            }
        }
    }

    async fn verify(
        &self,
        _fingerprint: &DocumentFingerprint,
        _deadline: Duration,
    ) -> Result<Option<LedgerAttestation>, VerifyError> {
        Ok(Some(LedgerAttestation {
            is_valid: true,
            signer_address: "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f".into(),
            timestamp: 1_700_000_000,
            hardware_hash: format!("0x{}", "44".repeat(32)),
        }))
    }
}

/// Store whose audit log always fails. Everything else delegates.
#[derive(Debug, Clone, Default)]
pub struct AuditFailingStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl IdentityStore for AuditFailingStore {
    async fn find_or_create_user(
        &self,
        did: &Did,
        hardware_id: &HardwareId,
    ) -> Result<UserId, StoreError> {
        self.inner.find_or_create_user(did, hardware_id).await
    }

    async fn find_user(&self, did: &Did) -> Result<Option<UserId>, StoreError> {
        self.inner.find_user(did).await
    }
}

#[async_trait]
impl SignatureStore for AuditFailingStore {
    async fn find_signature(
        &self,
        fingerprint: &DocumentFingerprint,
        signer: UserId,
    ) -> Result<Option<SignatureRecord>, StoreError> {
        self.inner.find_signature(fingerprint, signer).await
    }

    async fn insert_signature(&self, record: SignatureRecord) -> Result<InsertOutcome, StoreError> {
        self.inner.insert_signature(record).await
    }

    async fn signatures_for_document(
        &self,
        fingerprint: &DocumentFingerprint,
    ) -> Result<Vec<SignerEntry>, StoreError> {
        self.inner.signatures_for_document(fingerprint).await
    }

    async fn recent_signatures(&self, limit: usize) -> Result<Vec<SignerEntry>, StoreError> {
        self.inner.recent_signatures(limit).await
    }

    async fn append_audit(&self, _entry: AuditEntry) -> Result<(), StoreError> {
        Err(StoreError::Backend("audit table unavailable".into()))
    }

    async fn insert_offline(&self, entry: OfflineSignatureEntry) -> Result<(), StoreError> {
        self.inner.insert_offline(entry).await
    }

    async fn resolve_offline_pending(
        &self,
        fingerprint: &DocumentFingerprint,
        signer_did: &Did,
        synced_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.inner
            .resolve_offline_pending(fingerprint, signer_did, synced_at)
            .await
    }

    async fn record_offline_error(&self, id: OfflineEntryId, message: &str) -> Result<(), StoreError> {
        self.inner.record_offline_error(id, message).await
    }

    async fn count_offline_pending(&self) -> Result<u64, StoreError> {
        self.inner.count_offline_pending().await
    }
}

/// Services wired over one shared [`MemoryStore`].
pub struct Harness {
    pub store: MemoryStore,
    pub anchoring: AnchoringService,
    pub verification: VerificationService,
    pub reconciler: OfflineReconciler,
}

impl Harness {
    pub fn new(ledger: LedgerAccess, deadline: Duration) -> Self {
        Self::on_store(MemoryStore::new(), ledger, deadline)
    }

    /// Services over an existing store, so several harnesses can share state.
    pub fn on_store(store: MemoryStore, ledger: LedgerAccess, deadline: Duration) -> Self {
        let shared: Arc<MemoryStore> = Arc::new(store.clone());
        let anchoring = AnchoringService::new(shared.clone(), ledger.clone(), deadline);
        let verification = VerificationService::new(shared.clone(), ledger, deadline);
        let reconciler = OfflineReconciler::new(anchoring.clone(), shared);
        Self {
            store,
            anchoring,
            verification,
            reconciler,
        }
    }

    pub fn fallback() -> Self {
        Self::new(LedgerAccess::fallback(), Duration::from_secs(30))
    }

    pub fn scripted(script: Script, deadline: Duration) -> (Self, Arc<ScriptedLedger>) {
        Self::with_ledger(ScriptedLedger::new(script), deadline)
    }

    pub fn with_ledger(ledger: Arc<ScriptedLedger>, deadline: Duration) -> (Self, Arc<ScriptedLedger>) {
        let harness = Self::new(LedgerAccess::with_backend(ledger.clone()), deadline);
        (harness, ledger)
    }
}

pub fn fp(s: &str) -> DocumentFingerprint {
    DocumentFingerprint::new(s).unwrap()
}

pub fn did(s: &str) -> Did {
    Did::new(s).unwrap()
}

pub fn hw(s: &str) -> HardwareId {
    HardwareId::new(s).unwrap()
}

pub fn request(fingerprint: &str, signer: &str) -> AnchorRequest {
    AnchorRequest {
        fingerprint: fp(fingerprint),
        signature: b"dilithium-signature".to_vec(),
        hardware_id: hw("hw-1"),
        signer_did: did(signer),
        metadata: SignatureMetadata::default(),
    }
}

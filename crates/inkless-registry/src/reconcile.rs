//! # Offline Reconciler
//!
//! Merges signatures captured while a device was offline into the
//! ledger-of-record. Every item succeeds or fails on its own; a batch is never
//! aborted by one bad item.
//!
//! ## Per-item flow
//!
//! | Step | Outcome on hit |
//! |------|----------------|
//! | record exists for `(fingerprint, signer)` | `already_exists` with the stored reference |
//! | persist a `pending` offline entry | store failure ⇒ `failed` |
//! | anchor through [`AnchoringService`] | failure ⇒ `failed`, entry stays `pending` with the error |
//! | anchored | entry `synced`, item `synced` with the reference |
//!
//! Whenever an item ends `synced` or `already_exists`, every pending entry
//! for the same `(fingerprint, signer)` is resolved with it, so entries left
//! behind by a failed earlier attempt do not stay pending.
//!
//! Items for the same `(fingerprint, signer)` form one group and run in
//! request order, so a pair reaches the ledger at most once per batch.
//! Distinct groups run concurrently up to the configured limit. Results keep
//! the input order.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use inkless_core::{
    Did, DocumentFingerprint, HardwareId, OfflineSignatureEntry, SignatureMetadata, TxReference,
};
use serde::Serialize;
use thiserror::Error;

use crate::anchoring::{
    AnchorOutcome, AnchorRequest, AnchoringError, AnchoringService, RequestOrigin,
};
use crate::store::{RegistryStore, StoreError};

/// Default maximum number of items in one batch.
pub const DEFAULT_BATCH_LIMIT: usize = 100;

/// Default number of items in flight per batch.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// A validated offline signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineItem {
    /// Fingerprint of the signed document.
    pub fingerprint: DocumentFingerprint,
    /// Raw post-quantum signature bytes.
    pub signature: Vec<u8>,
    /// Hardware that produced the signature.
    pub hardware_id: HardwareId,
    /// Device clock at signing time.
    pub local_timestamp: DateTime<Utc>,
    /// Signer the device attributed the signature to.
    pub signer_did: Did,
}

/// One slot of an incoming batch.
///
/// Items that failed validation keep their slot so the result list lines up
/// with the request. They are reported `failed` and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchItem {
    /// Ready to reconcile.
    Valid(OfflineItem),
    /// Rejected before reconciliation.
    Invalid {
        /// The fingerprint as submitted.
        fingerprint: String,
        /// Why it was rejected.
        error: String,
    },
}

/// Per-item outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Anchored by this batch.
    Synced,
    /// Already anchored for this signer.
    AlreadyExists,
    /// Not anchored. See the item's error.
    Failed,
}

/// Why an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// Rejected before reconciliation.
    Invalid,
    /// The store failed.
    Persistence,
    /// The ledger did not accept the submission in time.
    Ledger,
}

/// Result for one batch slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    /// The fingerprint as submitted.
    pub fingerprint: String,
    /// Outcome.
    pub status: ItemStatus,
    /// Anchoring reference for `synced` and `already_exists`.
    pub tx_reference: Option<TxReference>,
    /// Failure reason for `failed`.
    pub error: Option<String>,
    /// Failure class for `failed`.
    pub cause: Option<FailureCause>,
}

impl ItemResult {
    fn synced(fingerprint: &DocumentFingerprint, tx_reference: TxReference) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
            status: ItemStatus::Synced,
            tx_reference: Some(tx_reference),
            error: None,
            cause: None,
        }
    }

    fn already_exists(fingerprint: &DocumentFingerprint, tx_reference: Option<TxReference>) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
            status: ItemStatus::AlreadyExists,
            tx_reference,
            error: None,
            cause: None,
        }
    }

    fn failed(
        fingerprint: impl Into<String>,
        cause: FailureCause,
        error: impl Into<String>,
    ) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            status: ItemStatus::Failed,
            tx_reference: None,
            error: Some(error.into()),
            cause: Some(cause),
        }
    }
}

/// Aggregate batch outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// Items processed. Equals the batch size.
    pub processed: usize,
    /// Items anchored by this batch.
    pub synced: usize,
    /// Items that were already anchored.
    pub already_exists: usize,
    /// Items that failed.
    pub failed: usize,
    /// Failed items the ledger rejected or timed out on.
    pub ledger_failures: usize,
    /// Per-item results in request order.
    pub results: Vec<ItemResult>,
}

impl BatchResult {
    fn from_results(results: Vec<ItemResult>) -> Self {
        let count = |status: ItemStatus| results.iter().filter(|r| r.status == status).count();
        let synced = count(ItemStatus::Synced);
        let already_exists = count(ItemStatus::AlreadyExists);
        let failed = count(ItemStatus::Failed);
        let ledger_failures = results
            .iter()
            .filter(|r| r.cause == Some(FailureCause::Ledger))
            .count();
        Self {
            processed: results.len(),
            synced,
            already_exists,
            failed,
            ledger_failures,
            results,
        }
    }
}

/// Split a batch into groups keyed by `(fingerprint, signer)`.
///
/// Groups are ordered by first appearance and keep request order inside.
/// Invalid items are singleton groups.
fn group_by_signer(items: Vec<BatchItem>) -> Vec<Vec<(usize, BatchItem)>> {
    let mut groups: Vec<Vec<(usize, BatchItem)>> = Vec::new();
    let mut by_key: HashMap<(DocumentFingerprint, Did), usize> = HashMap::new();
    for (index, item) in items.into_iter().enumerate() {
        if let BatchItem::Valid(valid) = &item {
            let key = (valid.fingerprint.clone(), valid.signer_did.clone());
            if let Some(&group) = by_key.get(&key) {
                groups[group].push((index, item));
                continue;
            }
            by_key.insert(key, groups.len());
        }
        groups.push(vec![(index, item)]);
    }
    groups
}

/// Batch-level rejection. Nothing was processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The batch had no items.
    #[error("no signatures to sync")]
    EmptyBatch,

    /// The batch exceeded the configured limit.
    #[error("batch of {size} signatures exceeds the limit of {limit}")]
    BatchTooLarge {
        /// Submitted size.
        size: usize,
        /// Configured maximum.
        limit: usize,
    },
}

/// Offline batch reconciliation. Cheap to clone.
#[derive(Clone)]
pub struct OfflineReconciler {
    anchoring: AnchoringService,
    store: Arc<dyn RegistryStore>,
    concurrency: usize,
    max_batch: usize,
}

impl std::fmt::Debug for OfflineReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineReconciler")
            .field("concurrency", &self.concurrency)
            .field("max_batch", &self.max_batch)
            .finish()
    }
}

impl OfflineReconciler {
    /// Create a reconciler with the default limits.
    pub fn new(anchoring: AnchoringService, store: Arc<dyn RegistryStore>) -> Self {
        Self {
            anchoring,
            store,
            concurrency: DEFAULT_CONCURRENCY,
            max_batch: DEFAULT_BATCH_LIMIT,
        }
    }

    /// Set the number of items in flight. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the maximum batch size.
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }

    /// Maximum batch size.
    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    /// Reconcile a batch.
    ///
    /// # Errors
    ///
    /// Only batch-level rejections: [`ReconcileError::EmptyBatch`] and
    /// [`ReconcileError::BatchTooLarge`]. Item failures are reported in the
    /// [`BatchResult`].
    pub async fn reconcile(
        &self,
        items: Vec<BatchItem>,
        origin: &RequestOrigin,
    ) -> Result<BatchResult, ReconcileError> {
        if items.is_empty() {
            return Err(ReconcileError::EmptyBatch);
        }
        if items.len() > self.max_batch {
            return Err(ReconcileError::BatchTooLarge {
                size: items.len(),
                limit: self.max_batch,
            });
        }

        let groups: Vec<Vec<(usize, ItemResult)>> = stream::iter(group_by_signer(items))
            .map(|group| async move {
                let mut out = Vec::with_capacity(group.len());
                for (index, item) in group {
                    let result = match item {
                        BatchItem::Valid(item) => self.reconcile_item(item, origin).await,
                        BatchItem::Invalid { fingerprint, error } => {
                            ItemResult::failed(fingerprint, FailureCause::Invalid, error)
                        }
                    };
                    out.push((index, result));
                }
                out
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut indexed: Vec<(usize, ItemResult)> = groups.into_iter().flatten().collect();
        indexed.sort_by_key(|(index, _)| *index);
        let batch = BatchResult::from_results(indexed.into_iter().map(|(_, r)| r).collect());
        tracing::info!(
            processed = batch.processed,
            synced = batch.synced,
            already_exists = batch.already_exists,
            failed = batch.failed,
            "offline batch reconciled"
        );
        Ok(batch)
    }

    /// Number of offline entries still pending.
    ///
    /// # Errors
    ///
    /// [`StoreError`] when the store fails.
    pub async fn pending_count(&self) -> Result<u64, StoreError> {
        self.store.count_offline_pending().await
    }

    async fn reconcile_item(&self, item: OfflineItem, origin: &RequestOrigin) -> ItemResult {
        match self.existing_reference(&item).await {
            Ok(Some(tx_reference)) => {
                self.resolve_pending(&item).await;
                return ItemResult::already_exists(&item.fingerprint, tx_reference);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(fingerprint = %item.fingerprint, error = %e, "duplicate check failed");
                return ItemResult::failed(
                    item.fingerprint.as_str(),
                    FailureCause::Persistence,
                    "failed to check for an existing signature",
                );
            }
        }

        let entry = OfflineSignatureEntry::pending(
            item.fingerprint.clone(),
            item.signature.clone(),
            item.hardware_id.clone(),
            item.signer_did.clone(),
            item.local_timestamp,
            Utc::now(),
        );
        let entry_id = entry.id;
        if let Err(e) = self.store.insert_offline(entry).await {
            tracing::warn!(fingerprint = %item.fingerprint, error = %e, "failed to store offline signature");
            return ItemResult::failed(
                item.fingerprint.as_str(),
                FailureCause::Persistence,
                "failed to store signature",
            );
        }

        let request = AnchorRequest {
            fingerprint: item.fingerprint.clone(),
            signature: item.signature.clone(),
            hardware_id: item.hardware_id.clone(),
            signer_did: item.signer_did.clone(),
            metadata: SignatureMetadata::default(),
        };

        match self.anchoring.anchor(&request, origin).await {
            Ok(AnchorOutcome::Anchored(receipt)) => {
                self.resolve_pending(&item).await;
                ItemResult::synced(&item.fingerprint, receipt.tx_reference)
            }
            Ok(AnchorOutcome::AlreadySigned { tx_reference, .. }) => {
                // Lost a race with another anchor for the same signer.
                self.resolve_pending(&item).await;
                ItemResult::already_exists(&item.fingerprint, tx_reference)
            }
            Err(e) => {
                let cause = match &e {
                    AnchoringError::LedgerSubmissionFailed(_) => FailureCause::Ledger,
                    AnchoringError::Persistence(_) => FailureCause::Persistence,
                };
                let message = e.to_string();
                if let Err(store_err) = self.store.record_offline_error(entry_id, &message).await {
                    tracing::warn!(
                        fingerprint = %item.fingerprint,
                        error = %store_err,
                        "failed to record offline anchoring error"
                    );
                }
                ItemResult::failed(item.fingerprint.as_str(), cause, message)
            }
        }
    }

    async fn existing_reference(
        &self,
        item: &OfflineItem,
    ) -> Result<Option<Option<TxReference>>, StoreError> {
        let Some(signer) = self.store.find_user(&item.signer_did).await? else {
            return Ok(None);
        };
        Ok(self
            .store
            .find_signature(&item.fingerprint, signer)
            .await?
            .map(|record| record.tx_reference))
    }

    async fn resolve_pending(&self, item: &OfflineItem) {
        match self
            .store
            .resolve_offline_pending(&item.fingerprint, &item.signer_did, Utc::now())
            .await
        {
            Ok(resolved) => tracing::debug!(
                fingerprint = %item.fingerprint,
                signer = %item.signer_did,
                resolved,
                "offline entries resolved"
            ),
            Err(e) => tracing::warn!(
                fingerprint = %item.fingerprint,
                error = %e,
                "failed to mark offline signatures synced"
            ),
        }
    }
}

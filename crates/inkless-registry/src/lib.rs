//! # inkless-registry: Signature Registry Services
//!
//! The service layer between the HTTP surface and the ledger.
//!
//! | Module             | Responsibility                                          |
//! |--------------------|---------------------------------------------------------|
//! | [`store`]          | Persistence traits and the insert-if-absent contract    |
//! | [`memory`]         | [`MemoryStore`], the in-process store                   |
//! | [`anchoring`]      | [`AnchoringService`]: one anchor per document and signer |
//! | [`verification`]   | [`VerificationService`]: ordered signer lists           |
//! | [`reconcile`]      | [`OfflineReconciler`]: offline batch merge              |
//!
//! Services hold an `Arc<dyn RegistryStore>` and a settled
//! [`LedgerAccess`](inkless_ledger::LedgerAccess); both are fixed at
//! construction.

pub mod anchoring;
pub mod memory;
pub mod reconcile;
pub mod store;
pub mod verification;

pub use anchoring::{
    AnchorOutcome, AnchorReceipt, AnchorRequest, AnchoringError, AnchoringService, RequestOrigin,
    DEFAULT_LEDGER_DEADLINE,
};
pub use memory::MemoryStore;
pub use reconcile::{
    BatchItem, BatchResult, FailureCause, ItemResult, ItemStatus, OfflineItem, OfflineReconciler,
    ReconcileError, DEFAULT_BATCH_LIMIT, DEFAULT_CONCURRENCY,
};
pub use store::{IdentityStore, InsertOutcome, RegistryStore, SignatureStore, SignerEntry, StoreError};
pub use verification::{
    LedgerReadback, SignerView, Verification, VerificationError, VerificationService,
};

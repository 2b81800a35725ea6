#![deny(missing_docs)]

//! # inkless-core: Foundational Types for Inkless Signature Anchoring
//!
//! Every other crate in the workspace depends on this one. It has no internal
//! crate dependencies, only `serde`, `serde_json`, `thiserror`, `chrono`,
//! `uuid`, and `hex` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** A [`DocumentFingerprint`]
//!    cannot be passed where a [`HardwareId`] is expected, and a
//!    [`RecordId`] is not a [`UserId`].
//!
//! 2. **Transaction references carry their provenance.** A [`TxReference`]
//!    is either ledger-backed (`0x` + 64 hex) or a fallback placeholder
//!    (`mock-tx-` + 32 hex). The two shapes never overlap, so downstream
//!    systems cannot mistake a local placeholder for a ledger submission.
//!
//! 3. **Lifecycles are explicit enums.** [`SignatureStatus`] and
//!    [`SyncStatus`] reject transitions that are not part of their
//!    lifecycle.
//!
//! 4. **Structured errors.** [`ValidationError`] and
//!    [`StateTransitionError`] are `thiserror` enums. No `.unwrap()` outside
//!    tests.

pub mod error;
pub mod identity;
pub mod record;
pub mod reference;
pub mod status;

pub use error::{StateTransitionError, ValidationError};
pub use identity::{Did, DocumentFingerprint, HardwareId, OfflineEntryId, RecordId, UserId};
pub use record::{AuditEntry, OfflineSignatureEntry, SignatureMetadata, SignatureRecord};
pub use reference::{TxReference, TxReferenceKind};
pub use status::{AuditAction, DocumentCategory, SignatureStatus, SyncStatus};

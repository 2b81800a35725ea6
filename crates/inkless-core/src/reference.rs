//! # Transaction References
//!
//! A [`TxReference`] names the submission that anchored a signature. Two
//! shapes exist and they never overlap:
//!
//! | Kind                         | Format                  | Meaning                               |
//! |------------------------------|-------------------------|---------------------------------------|
//! | [`TxReferenceKind::Ledger`]   | `0x` + 64 lowercase hex | Hash of a submitted ledger transaction |
//! | [`TxReferenceKind::Fallback`] | `mock-tx-` + 32 hex     | Local placeholder, never on a ledger   |
//!
//! A ledger reference identifies a *submission*. It is not proof that the
//! transaction was included or finalized.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Prefix carried by every fallback reference.
pub const FALLBACK_PREFIX: &str = "mock-tx-";

/// Provenance of a [`TxReference`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxReferenceKind {
    /// Hash of a transaction submitted to the ledger.
    Ledger,
    /// Placeholder synthesized while no ledger connection is available.
    Fallback,
}

impl std::fmt::Display for TxReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ledger => f.write_str("ledger"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Reference to the transaction (or placeholder) that anchored a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxReference(String);

impl TxReference {
    /// Build a ledger reference from a 32-byte transaction hash.
    pub fn ledger(hash: [u8; 32]) -> Self {
        Self(format!("0x{}", hex::encode(hash)))
    }

    /// Synthesize a fresh fallback reference.
    ///
    /// Backed by a random v4 UUID, so references are unique across calls for
    /// the lifetime of the process (and, practically, across processes).
    pub fn fallback() -> Self {
        Self(format!("{FALLBACK_PREFIX}{}", Uuid::new_v4().simple()))
    }

    /// Parse a stored or client-supplied reference.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTxReference`] if the value matches
    /// neither shape.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if Self::classify(&s).is_some() {
            Ok(Self(s))
        } else {
            Err(ValidationError::InvalidTxReference(s))
        }
    }

    fn classify(s: &str) -> Option<TxReferenceKind> {
        if let Some(hash) = s.strip_prefix("0x") {
            if hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
                return Some(TxReferenceKind::Ledger);
            }
        }
        if let Some(id) = s.strip_prefix(FALLBACK_PREFIX) {
            if id.len() == 32 && id.chars().all(|c| c.is_ascii_hexdigit()) {
                return Some(TxReferenceKind::Fallback);
            }
        }
        None
    }

    /// Which backend produced this reference.
    pub fn kind(&self) -> TxReferenceKind {
        // Construction only admits classified values.
        Self::classify(&self.0).unwrap_or(TxReferenceKind::Fallback)
    }

    /// Whether this reference names a real ledger submission.
    pub fn is_ledger_backed(&self) -> bool {
        self.kind() == TxReferenceKind::Ledger
    }

    /// Access the reference string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TxReference {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TxReference> for String {
    fn from(value: TxReference) -> Self {
        value.0
    }
}

impl std::fmt::Display for TxReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

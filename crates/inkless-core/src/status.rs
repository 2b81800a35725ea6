//! # Lifecycle States and Classifiers
//!
//! - [`SignatureStatus`]: `pending → anchored → verified | revoked`
//! - [`SyncStatus`]: `pending → synced | failed`
//! - [`AuditAction`]: the audited action kinds
//! - [`DocumentCategory`]: the document classification attached to a record
//!
//! Status enums serialize as lowercase strings, which is also their storage
//! representation.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{StateTransitionError, ValidationError};

/// Lifecycle of a [`SignatureRecord`](crate::SignatureRecord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    /// Accepted but not yet anchored.
    Pending,
    /// Anchored on the ledger or in fallback mode.
    Anchored,
    /// Confirmed by an external verifier.
    Verified,
    /// Withdrawn by the signer or an operator.
    Revoked,
}

impl SignatureStatus {
    /// Storage and wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Anchored => "anchored",
            Self::Verified => "verified",
            Self::Revoked => "revoked",
        }
    }

    /// Whether `self → next` is part of the lifecycle.
    pub fn can_transition_to(&self, next: SignatureStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Anchored)
                | (Self::Anchored, Self::Verified)
                | (Self::Anchored, Self::Revoked)
        )
    }

    /// Validate `self → next`.
    ///
    /// # Errors
    ///
    /// Returns [`StateTransitionError::InvalidTransition`] when the
    /// lifecycle does not permit the move.
    pub fn transition_to(self, next: SignatureStatus) -> Result<SignatureStatus, StateTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StateTransitionError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl std::fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "anchored" => Ok(Self::Anchored),
            "verified" => Ok(Self::Verified),
            "revoked" => Ok(Self::Revoked),
            other => Err(ValidationError::UnknownStatus {
                kind: "signature",
                value: other.to_string(),
            }),
        }
    }
}

/// Sync state of an [`OfflineSignatureEntry`](crate::OfflineSignatureEntry).
///
/// A failed anchoring attempt leaves the entry `Pending` with an error message
/// so a later batch can retry it. `Failed` is reserved for entries an operator
/// gives up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Waiting to be anchored.
    Pending,
    /// Anchored; `synced_at` is set.
    Synced,
    /// Abandoned.
    Failed,
}

impl SyncStatus {
    /// Storage and wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }

    /// Whether `self → next` is part of the lifecycle.
    pub fn can_transition_to(&self, next: SyncStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Synced) | (Self::Pending, Self::Failed)
        )
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            "failed" => Ok(Self::Failed),
            other => Err(ValidationError::UnknownStatus {
                kind: "sync",
                value: other.to_string(),
            }),
        }
    }
}

/// Action recorded in an [`AuditEntry`](crate::AuditEntry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A signer's identity was verified.
    IdentityVerify,
    /// A signature was anchored.
    SignatureAnchor,
    /// A document's signatures were verified.
    SignatureVerify,
}

impl AuditAction {
    /// Storage and wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdentityVerify => "identity_verify",
            Self::SignatureAnchor => "signature_anchor",
            Self::SignatureVerify => "signature_verify",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity_verify" => Ok(Self::IdentityVerify),
            "signature_anchor" => Ok(Self::SignatureAnchor),
            "signature_verify" => Ok(Self::SignatureVerify),
            other => Err(ValidationError::UnknownStatus {
                kind: "audit action",
                value: other.to_string(),
            }),
        }
    }
}

/// Categories the signing clients offer. Other well-formed identifiers are
/// accepted and stored as given.
pub const KNOWN_CATEGORIES: &[&str] = &[
    "general_contract",
    "loan_agreement",
    "lease_short",
    "invoice",
    "gift_deed",
    "power_of_attorney_land",
    "affidavit",
    "marriage_contract",
    "adoption",
    "will",
    "land_deed",
];

/// Classification of a signed document. Defaults to `general_contract`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentCategory(String);

impl DocumentCategory {
    /// The category applied when a request omits one.
    pub const DEFAULT: &'static str = "general_contract";

    /// Create a category, validating it is lowercase snake_case.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCategory`] for empty, oversized, or
    /// non snake_case values.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let well_formed = !s.is_empty()
            && s.len() <= 64
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if well_formed {
            Ok(Self(s))
        } else {
            Err(ValidationError::InvalidCategory(s))
        }
    }

    /// Parse an optional category, treating `None` and blank as the default.
    ///
    /// # Errors
    ///
    /// Same as [`DocumentCategory::new`] for non-blank input.
    pub fn or_default(value: Option<&str>) -> Result<Self, ValidationError> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(v) => Self::new(v),
        }
    }

    /// Whether the category is one the signing clients offer.
    pub fn is_known(&self) -> bool {
        KNOWN_CATEGORIES.contains(&self.0.as_str())
    }

    /// Access the category string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DocumentCategory {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl TryFrom<String> for DocumentCategory {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocumentCategory> for String {
    fn from(value: DocumentCategory) -> Self {
        value.0
    }
}

impl std::fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

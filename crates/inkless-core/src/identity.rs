//! # Identity Newtypes
//!
//! Domain-primitive newtypes for the identifiers that flow through anchoring,
//! verification, and offline reconciliation.
//!
//! ## Validation
//!
//! String-based identifiers ([`DocumentFingerprint`], [`HardwareId`], [`Did`])
//! validate format at construction time and on deserialization. UUID-based
//! identifiers ([`UserId`], [`RecordId`], [`OfflineEntryId`]) are always valid
//! by construction.
//!
//! Fingerprints and hardware identifiers are kept byte-for-byte as submitted.
//! They are compared exactly, so `ABC` and `abc` are distinct documents.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// UUID-based identifiers (always valid by construction)
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a signer's identity record in the identity store.
    UserId
);

uuid_id!(
    /// Identifier of a persisted [`SignatureRecord`](crate::SignatureRecord).
    RecordId
);

uuid_id!(
    /// Identifier of an [`OfflineSignatureEntry`](crate::OfflineSignatureEntry).
    OfflineEntryId
);

// ---------------------------------------------------------------------------
// String-based identifiers (validated at construction)
// ---------------------------------------------------------------------------

/// Maximum accepted fingerprint length. Covers SHA-512 hex with a `0x` prefix.
const MAX_FINGERPRINT_LEN: usize = 130;

/// Maximum accepted hardware identifier length.
const MAX_HARDWARE_ID_LEN: usize = 256;

/// Content hash identifying a document without storing its bytes.
///
/// # Validation
///
/// - Must be non-empty
/// - At most 130 characters
/// - No whitespace or control characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentFingerprint(String);

impl DocumentFingerprint {
    /// Create a fingerprint from a string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFingerprint`] when the value is empty,
    /// longer than 130 characters, or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let reason = if s.is_empty() {
            Some("must not be empty")
        } else if s.len() > MAX_FINGERPRINT_LEN {
            Some("longer than 130 characters")
        } else if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            Some("contains whitespace or control characters")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ValidationError::InvalidFingerprint { value: s, reason }),
            None => Ok(Self(s)),
        }
    }

    /// Access the fingerprint string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first `n` characters, used for display defaults such as file names.
    pub fn prefix(&self, n: usize) -> &str {
        match self.0.char_indices().nth(n) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl TryFrom<String> for DocumentFingerprint {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocumentFingerprint> for String {
    fn from(value: DocumentFingerprint) -> Self {
        value.0
    }
}

impl std::fmt::Display for DocumentFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the signing hardware (secure enclave, TPM, or token serial).
///
/// The ledger stores a keccak-256 hash of this value, never the raw string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HardwareId(String);

impl HardwareId {
    /// Create a hardware identifier, rejecting empty or oversized values.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidHardwareId`] on failure.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.trim().is_empty() {
            return Err(ValidationError::InvalidHardwareId {
                value: s,
                reason: "must not be empty",
            });
        }
        if s.len() > MAX_HARDWARE_ID_LEN {
            return Err(ValidationError::InvalidHardwareId {
                value: s,
                reason: "longer than 256 characters",
            });
        }
        Ok(Self(s))
    }

    /// Access the hardware identifier string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes of the identifier as hashed on-ledger.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl TryFrom<String> for HardwareId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HardwareId> for String {
    fn from(value: HardwareId) -> Self {
        value.0
    }
}

impl std::fmt::Display for HardwareId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// W3C Decentralized Identifier (DID) of a signer.
///
/// Format: `did:<method>:<method-specific-id>`
/// where method is lowercase alphanumeric and method-specific-id is non-empty.
///
/// Reference: <https://www.w3.org/TR/did-core/#did-syntax>
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Create a DID from a string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDid`] if the string does not
    /// match the `did:method:identifier` format.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        let Some(rest) = s.strip_prefix("did:") else {
            return Err(ValidationError::InvalidDid(s.to_string()));
        };
        let Some((method, identifier)) = rest.split_once(':') else {
            return Err(ValidationError::InvalidDid(s.to_string()));
        };

        if method.is_empty()
            || !method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(ValidationError::InvalidDid(s.to_string()));
        }

        if identifier.is_empty() || identifier.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidDid(s.to_string()));
        }

        Ok(())
    }

    /// Access the DID string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the DID method (the part between the first and second colons).
    pub fn method(&self) -> &str {
        self.0[4..].split(':').next().unwrap_or_default()
    }
}

impl TryFrom<String> for Did {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Did> for String {
    fn from(value: Did) -> Self {
        value.0
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

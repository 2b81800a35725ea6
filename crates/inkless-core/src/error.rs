//! # Error Hierarchy
//!
//! Validation and lifecycle errors for the domain primitives, built with
//! `thiserror`. Each variant carries the rejected input so that operators can
//! diagnose a bad request without reproducing it.

use thiserror::Error;

/// Validation errors for domain primitive newtypes.
///
/// Each identifier type enforces its format at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Document fingerprint is empty, too long, or contains whitespace.
    #[error("invalid document fingerprint: \"{value}\" ({reason})")]
    InvalidFingerprint {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Hardware identifier is empty or too long.
    #[error("invalid hardware identifier: \"{value}\" ({reason})")]
    InvalidHardwareId {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// DID does not conform to W3C DID syntax (did:method:identifier).
    #[error("invalid DID format: \"{0}\" (expected did:<method>:<identifier>)")]
    InvalidDid(String),

    /// Transaction reference is neither a ledger hash nor a fallback reference.
    #[error("invalid transaction reference: \"{0}\" (expected 0x + 64 hex or mock-tx- + 32 hex)")]
    InvalidTxReference(String),

    /// Document category is not a lowercase snake_case identifier.
    #[error("invalid document category: \"{0}\" (expected lowercase snake_case, at most 64 chars)")]
    InvalidCategory(String),

    /// Signature payload is empty.
    #[error("signature bytes must not be empty")]
    EmptySignature,

    /// Stored status string does not name a known lifecycle state.
    #[error("unknown {kind} status: \"{value}\"")]
    UnknownStatus {
        /// Which lifecycle the value was parsed for.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },
}

/// Errors raised when a lifecycle transition is not permitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateTransitionError {
    /// The attempted transition is not valid from the current state.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// The current state name.
        from: String,
        /// The attempted target state name.
        to: String,
    },
}

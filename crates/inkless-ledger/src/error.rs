//! Error types for ledger connection, anchoring, and verification.
//!
//! Each ledger operation has its own error type so callers can tell a
//! startup failure ([`ConnectionError`]) from a per-request failure
//! ([`AnchorError`], [`VerifyError`]). All of them carry the underlying cause.

use thiserror::Error;

/// Failure of a single JSON-RPC exchange with the ledger node.
#[derive(Error, Debug)]
pub enum RpcError {
    /// The request could not be sent or the connection dropped.
    #[error("{method}: transport error: {reason}")]
    Transport {
        /// JSON-RPC method name.
        method: String,
        /// Transport-level description.
        reason: String,
    },

    /// The HTTP request exceeded the client timeout.
    #[error("{method}: request timed out")]
    Timeout {
        /// JSON-RPC method name.
        method: String,
    },

    /// The node answered with a non-2xx status.
    #[error("{method}: HTTP {status}")]
    Http {
        /// JSON-RPC method name.
        method: String,
        /// HTTP status code.
        status: u16,
    },

    /// The node answered with a JSON-RPC error object.
    #[error("{method}: node error {code}: {message}")]
    Node {
        /// JSON-RPC method name.
        method: String,
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The response was not a well-formed JSON-RPC result.
    #[error("{method}: invalid response: {reason}")]
    InvalidResponse {
        /// JSON-RPC method name.
        method: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// The ledger connection could not be established.
///
/// Never partially constructed: when this is returned no client exists.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The HTTP transport could not be built.
    #[error("failed to build ledger transport: {0}")]
    Transport(String),

    /// The chain identifier could not be resolved.
    #[error("failed to resolve chain id: {0}")]
    ChainId(#[source] RpcError),

    /// The chain identifier response was not a hex quantity.
    #[error("malformed chain id: {0}")]
    MalformedChainId(String),

    /// Contract address is not `0x` + 40 hex characters.
    #[error("invalid contract address: {0}")]
    InvalidContractAddress(String),

    /// Signing key is not a valid secp256k1 scalar.
    #[error("invalid signing key: {0}")]
    InvalidSigningKey(String),

    /// The embedded contract interface could not be parsed or lacks a
    /// required function.
    #[error("invalid contract interface: {0}")]
    ContractInterface(String),
}

/// Anchoring did not produce a submitted transaction.
///
/// Callers must treat every variant as "not anchored". The client never
/// polls for inclusion, so there is no "submitted, outcome unknown" state.
#[derive(Error, Debug)]
pub enum AnchorError {
    /// Fetching the pending transaction count failed.
    #[error("nonce lookup failed: {0}")]
    Nonce(#[source] RpcError),

    /// Fetching the fee estimate failed.
    #[error("gas price lookup failed: {0}")]
    GasPrice(#[source] RpcError),

    /// A node quantity could not be parsed.
    #[error("malformed {field} from node: {value}")]
    MalformedQuantity {
        /// Which value was malformed.
        field: &'static str,
        /// The raw value.
        value: String,
    },

    /// Signing the transaction failed.
    #[error("transaction signing failed: {0}")]
    Signing(String),

    /// The node rejected or failed to accept the signed transaction.
    #[error("transaction submission failed: {0}")]
    Submission(#[source] RpcError),

    /// The deadline expired before submission completed.
    #[error("anchoring deadline of {millis}ms exceeded")]
    DeadlineExceeded {
        /// The deadline in milliseconds.
        millis: u128,
    },

    /// The client was closed.
    #[error("ledger connection closed")]
    ConnectionClosed,
}

/// A verification read against the contract failed.
///
/// A decode failure is an error, never an `is_valid = false` answer.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The `eth_call` failed.
    #[error("verification call failed: {0}")]
    Call(#[source] RpcError),

    /// The call returned data that does not decode as the expected tuple.
    #[error("failed to decode verification result: {0}")]
    Decode(String),

    /// The deadline expired before the call returned.
    #[error("verification deadline of {millis}ms exceeded")]
    DeadlineExceeded {
        /// The deadline in milliseconds.
        millis: u128,
    },

    /// The client was closed.
    #[error("ledger connection closed")]
    ConnectionClosed,
}

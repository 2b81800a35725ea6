//! # inkless-ledger: EVM Signature Registry Client
//!
//! Anchors document signatures in an EVM-compatible ledger (public chain or
//! permissioned network such as Besu) and reads them back.
//!
//! ## Layers
//!
//! | Module       | Responsibility                                             |
//! |--------------|------------------------------------------------------------|
//! | [`abi`]      | Contract interface, call data, identifier derivation       |
//! | [`rlp`]      | RLP encoding                                               |
//! | [`tx`]       | EIP-155 legacy transaction signing                         |
//! | [`rpc`]      | JSON-RPC 2.0 transport                                     |
//! | [`client`]   | [`LedgerClient`]: connect, anchor, verify, close           |
//! | [`backend`]  | [`LedgerBackend`] with live and fallback implementations   |
//! | [`access`]   | [`LedgerAccessPoint`]: at-most-once connection, mode flag  |
//!
//! Ledger errors never abort the process. A failed connection leaves the
//! access point in fallback mode; per-request failures surface as
//! [`AnchorError`] or [`VerifyError`].

pub mod abi;
pub mod access;
pub mod backend;
pub mod client;
pub mod error;
pub mod rlp;
pub mod rpc;
pub mod tx;

pub use access::{LedgerAccess, LedgerAccessPoint};
pub use backend::{FallbackLedger, LedgerBackend, LedgerMode, LiveLedger};
pub use client::{LedgerAttestation, LedgerClient, LedgerConfig};
pub use error::{AnchorError, ConnectionError, RpcError, VerifyError};

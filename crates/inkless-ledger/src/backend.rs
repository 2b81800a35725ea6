//! # Ledger Backends
//!
//! The anchoring and verification services talk to a [`LedgerBackend`], never
//! to the client directly. Two implementations exist and one is chosen at
//! startup:
//!
//! - [`LiveLedger`]: submits to the registry contract through a
//!   [`LedgerClient`].
//! - [`FallbackLedger`]: used when no ledger is configured or reachable.
//!   Returns `mock-tx-` references and has nothing to read back.

use std::time::Duration;

use async_trait::async_trait;
use inkless_core::{DocumentFingerprint, HardwareId, TxReference};
use serde::{Deserialize, Serialize};

use crate::client::{LedgerAttestation, LedgerClient};
use crate::error::{AnchorError, VerifyError};

/// Which backend is serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerMode {
    /// Connected to a ledger node.
    Live,
    /// No ledger; placeholder references.
    Fallback,
}

impl std::fmt::Display for LedgerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Anchoring capability consumed by the services.
#[async_trait]
pub trait LedgerBackend: Send + Sync + std::fmt::Debug {
    /// Which mode this backend represents.
    fn mode(&self) -> LedgerMode;

    /// Anchor a signature and return its reference.
    async fn anchor(
        &self,
        fingerprint: &DocumentFingerprint,
        signature: &[u8],
        hardware_id: &HardwareId,
        deadline: Duration,
    ) -> Result<TxReference, AnchorError>;

    /// Read a document's anchor back. `None` when the backend has no ledger.
    async fn verify(
        &self,
        fingerprint: &DocumentFingerprint,
        deadline: Duration,
    ) -> Result<Option<LedgerAttestation>, VerifyError>;

    /// Release backend resources. Idempotent.
    fn close(&self) {}
}

/// Backend backed by a connected [`LedgerClient`].
#[derive(Debug)]
pub struct LiveLedger {
    client: LedgerClient,
}

impl LiveLedger {
    /// Wrap a connected client.
    pub fn new(client: LedgerClient) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &LedgerClient {
        &self.client
    }
}

#[async_trait]
impl LedgerBackend for LiveLedger {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Live
    }

    async fn anchor(
        &self,
        fingerprint: &DocumentFingerprint,
        signature: &[u8],
        hardware_id: &HardwareId,
        deadline: Duration,
    ) -> Result<TxReference, AnchorError> {
        self.client
            .anchor(fingerprint, signature, hardware_id, deadline)
            .await
    }

    async fn verify(
        &self,
        fingerprint: &DocumentFingerprint,
        deadline: Duration,
    ) -> Result<Option<LedgerAttestation>, VerifyError> {
        self.client.verify(fingerprint, deadline).await.map(Some)
    }

    fn close(&self) {
        self.client.close();
    }
}

/// Backend used when no ledger connection is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackLedger;

#[async_trait]
impl LedgerBackend for FallbackLedger {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Fallback
    }

    async fn anchor(
        &self,
        fingerprint: &DocumentFingerprint,
        _signature: &[u8],
        _hardware_id: &HardwareId,
        _deadline: Duration,
    ) -> Result<TxReference, AnchorError> {
        let reference = TxReference::fallback();
        tracing::debug!(fingerprint = %fingerprint, tx_reference = %reference, "fallback anchor");
        Ok(reference)
    }

    async fn verify(
        &self,
        _fingerprint: &DocumentFingerprint,
        _deadline: Duration,
    ) -> Result<Option<LedgerAttestation>, VerifyError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkless_core::TxReferenceKind;

    #[tokio::test]
    async fn fallback_anchor_returns_unique_placeholders() {
        let backend = FallbackLedger;
        let fp = DocumentFingerprint::new("abc123").unwrap();
        let hw = HardwareId::new("hw-1").unwrap();
        let a = backend.anchor(&fp, b"sig", &hw, Duration::from_secs(1)).await.unwrap();
        let b = backend.anchor(&fp, b"sig", &hw, Duration::from_secs(1)).await.unwrap();
        assert_eq!(a.kind(), TxReferenceKind::Fallback);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn fallback_has_nothing_to_verify() {
        let fp = DocumentFingerprint::new("abc123").unwrap();
        let result = FallbackLedger.verify(&fp, Duration::from_secs(1)).await.unwrap();
        assert!(result.is_none());
        assert_eq!(FallbackLedger.mode(), LedgerMode::Fallback);
    }
}

//! # Ledger Access Point
//!
//! Process-wide holder of at most one ledger connection. The first call to
//! [`LedgerAccessPoint::access`] performs the single connection attempt;
//! concurrent first callers wait on the same attempt, and every later call
//! returns the settled result.
//!
//! | Configuration            | Outcome                                   |
//! |--------------------------|-------------------------------------------|
//! | contract address empty   | fallback, logged at `info` (expected path) |
//! | connection fails         | fallback, logged at `warn`                |
//! | connection succeeds      | live                                      |
//!
//! There is no reconnection: once in fallback mode, the process stays there.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::backend::{FallbackLedger, LedgerBackend, LedgerMode, LiveLedger};
use crate::client::{LedgerClient, LedgerConfig};

/// Settled ledger capability threaded into the services. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LedgerAccess {
    backend: Arc<dyn LedgerBackend>,
    connected: bool,
}

impl LedgerAccess {
    /// Fallback-mode access.
    pub fn fallback() -> Self {
        Self::with_backend(Arc::new(FallbackLedger))
    }

    /// Live access through a connected client.
    pub fn live(client: LedgerClient) -> Self {
        Self::with_backend(Arc::new(LiveLedger::new(client)))
    }

    /// Access through an arbitrary backend.
    pub fn with_backend(backend: Arc<dyn LedgerBackend>) -> Self {
        let connected = backend.mode() == LedgerMode::Live;
        Self { backend, connected }
    }

    /// Whether a live ledger connection is available.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Current mode.
    pub fn mode(&self) -> LedgerMode {
        self.backend.mode()
    }

    /// The selected backend.
    pub fn backend(&self) -> &Arc<dyn LedgerBackend> {
        &self.backend
    }

    /// Release the backend's resources.
    pub fn close(&self) {
        self.backend.close();
    }
}

/// At-most-once initializer for [`LedgerAccess`].
#[derive(Debug)]
pub struct LedgerAccessPoint {
    config: LedgerConfig,
    cell: OnceCell<LedgerAccess>,
}

impl LedgerAccessPoint {
    /// Create an uninitialized access point. No connection is attempted yet.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Return the settled access, connecting on first use.
    pub async fn access(&self) -> LedgerAccess {
        self.cell
            .get_or_init(|| Self::initialize(&self.config))
            .await
            .clone()
    }

    /// The settled access, if initialization has completed.
    pub fn get(&self) -> Option<LedgerAccess> {
        self.cell.get().cloned()
    }

    async fn initialize(config: &LedgerConfig) -> LedgerAccess {
        if !config.is_configured() {
            tracing::info!("CONTRACT_ADDRESS not set, ledger running in fallback mode");
            return LedgerAccess::fallback();
        }

        match LedgerClient::connect(config).await {
            Ok(client) => LedgerAccess::live(client),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    rpc_url = %config.rpc_url,
                    "ledger connection failed, continuing in fallback mode"
                );
                LedgerAccess::fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn config(contract: &str) -> LedgerConfig {
        LedgerConfig::new(
            Url::parse("http://127.0.0.1:1").unwrap(),
            contract,
            "46".repeat(32),
        )
        .with_timeout_secs(1)
    }

    #[tokio::test]
    async fn empty_contract_selects_fallback() {
        let point = LedgerAccessPoint::new(config(""));
        assert!(point.get().is_none());
        let access = point.access().await;
        assert!(!access.is_connected());
        assert_eq!(access.mode(), LedgerMode::Fallback);
        assert!(point.get().is_some());
    }

    #[tokio::test]
    async fn failed_connection_degrades_to_fallback() {
        let point = LedgerAccessPoint::new(config("bad-address"));
        let access = point.access().await;
        assert!(!access.is_connected());
    }

    #[test]
    fn fallback_access_is_disconnected() {
        let access = LedgerAccess::fallback();
        assert!(!access.is_connected());
        access.close();
    }
}

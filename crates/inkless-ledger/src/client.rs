//! # Ledger Client
//!
//! Owns the connection to an EVM JSON-RPC node and the key that signs
//! anchoring transactions. Unlike a provider-signed flow, the key is held
//! locally and transactions are submitted pre-signed via
//! `eth_sendRawTransaction`, which works against any node.
//!
//! ## Anchoring Flow
//!
//! 1. Derive the document word and hardware word ([`crate::abi`]).
//! 2. Encode `anchorSignature(bytes32,bytes,bytes32)` call data.
//! 3. Fetch the sender's pending nonce and the node's gas price.
//! 4. Build and sign an EIP-155 legacy transaction (value 0, fixed gas limit).
//! 5. Submit it and return the transaction hash.
//!
//! The returned reference identifies a submission, not an included or final
//! transaction. There is no receipt polling.

use std::time::Duration;

use inkless_core::{DocumentFingerprint, HardwareId, TxReference};
use k256::ecdsa::SigningKey;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use url::Url;
use zeroize::Zeroizing;

use crate::abi::{self, ContractInterface};
use crate::error::{AnchorError, ConnectionError, VerifyError};
use crate::rpc::{self, JsonRpcTransport};
use crate::tx::{self, LegacyTransaction};

/// Gas ceiling for anchoring transactions.
pub const DEFAULT_GAS_LIMIT: u64 = 500_000;

/// Connection parameters for the ledger.
///
/// Custom `Debug` implementation redacts the signing key.
#[derive(Clone)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the ledger node.
    pub rpc_url: Url,
    /// Registry contract address (`0x` + 40 hex). Empty selects fallback mode.
    pub contract_address: String,
    /// Hex secp256k1 private key, with or without `0x`.
    pub signing_key: Zeroizing<String>,
    /// Per-request HTTP timeout in seconds (default: 30).
    pub timeout_secs: u64,
    /// Gas ceiling for anchoring transactions (default: 500 000).
    pub gas_limit: u64,
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("contract_address", &self.contract_address)
            .field("signing_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .field("gas_limit", &self.gas_limit)
            .finish()
    }
}

impl LedgerConfig {
    /// Create a configuration with a 30s timeout and the default gas ceiling.
    pub fn new(
        rpc_url: Url,
        contract_address: impl Into<String>,
        signing_key: impl Into<String>,
    ) -> Self {
        Self {
            rpc_url,
            contract_address: contract_address.into(),
            signing_key: Zeroizing::new(signing_key.into()),
            timeout_secs: 30,
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }

    /// Set the per-request HTTP timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Whether a contract is configured. `false` means fallback mode.
    pub fn is_configured(&self) -> bool {
        !self.contract_address.trim().is_empty()
    }
}

/// Result of reading a document's anchor back from the registry contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAttestation {
    /// Whether the registry holds a signature for the document.
    pub is_valid: bool,
    /// Address that anchored it (`0x` + 40 lowercase hex).
    pub signer_address: String,
    /// Block timestamp of the anchor, seconds since the epoch.
    pub timestamp: u64,
    /// Stored hardware word (`0x` + 64 hex).
    pub hardware_hash: String,
}

impl From<abi::VerifyOutput> for LedgerAttestation {
    fn from(out: abi::VerifyOutput) -> Self {
        Self {
            is_valid: out.is_valid,
            signer_address: format!("0x{}", hex::encode(out.signer)),
            timestamp: out.timestamp,
            hardware_hash: format!("0x{}", hex::encode(out.hardware)),
        }
    }
}

/// A live connection to the signature registry.
pub struct LedgerClient {
    transport: RwLock<Option<JsonRpcTransport>>,
    contract: [u8; 20],
    signer: SigningKey,
    sender: [u8; 20],
    chain_id: u64,
    interface: ContractInterface,
    gas_limit: u64,
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("contract", &hex_address(&self.contract))
            .field("sender", &hex_address(&self.sender))
            .field("chain_id", &self.chain_id)
            .field("open", &self.transport.read().is_some())
            .finish()
    }
}

impl LedgerClient {
    /// Connect to the ledger.
    ///
    /// Validates the contract address, decodes the signing key, parses the
    /// contract interface, then resolves the chain id from the node.
    ///
    /// # Errors
    ///
    /// A single [`ConnectionError`] for whichever step fails first. No client
    /// is returned on failure.
    pub async fn connect(config: &LedgerConfig) -> Result<Self, ConnectionError> {
        let contract = parse_address(&config.contract_address)
            .ok_or_else(|| ConnectionError::InvalidContractAddress(config.contract_address.clone()))?;
        let signer = decode_signing_key(&config.signing_key)?;
        let interface = ContractInterface::registry()?;

        let transport =
            JsonRpcTransport::new(config.rpc_url.clone(), Duration::from_secs(config.timeout_secs))
                .map_err(|e| ConnectionError::Transport(e.to_string()))?;

        let raw_chain_id = transport
            .call("eth_chainId", serde_json::json!([]))
            .await
            .map_err(ConnectionError::ChainId)?;
        let chain_id = rpc::parse_quantity(&raw_chain_id)
            .and_then(|id| u64::try_from(id).ok())
            .ok_or_else(|| ConnectionError::MalformedChainId(raw_chain_id.to_string()))?;

        let sender = tx::address_of(&signer);
        tracing::info!(
            chain_id,
            contract = %hex_address(&contract),
            sender = %hex_address(&sender),
            "connected to ledger"
        );

        Ok(Self {
            transport: RwLock::new(Some(transport)),
            contract,
            signer,
            sender,
            chain_id,
            interface,
            gas_limit: config.gas_limit,
        })
    }

    /// Chain identifier resolved at connect time.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Address of the signing account.
    pub fn sender_address(&self) -> String {
        hex_address(&self.sender)
    }

    /// Anchor a signature, returning the submitted transaction's hash.
    ///
    /// # Errors
    ///
    /// [`AnchorError`] for any failed step, including
    /// [`AnchorError::DeadlineExceeded`] when `deadline` elapses first.
    pub async fn anchor(
        &self,
        fingerprint: &DocumentFingerprint,
        signature: &[u8],
        hardware_id: &HardwareId,
        deadline: Duration,
    ) -> Result<TxReference, AnchorError> {
        tokio::time::timeout(deadline, self.submit_anchor(fingerprint, signature, hardware_id))
            .await
            .map_err(|_| AnchorError::DeadlineExceeded {
                millis: deadline.as_millis(),
            })?
    }

    async fn submit_anchor(
        &self,
        fingerprint: &DocumentFingerprint,
        signature: &[u8],
        hardware_id: &HardwareId,
    ) -> Result<TxReference, AnchorError> {
        let transport = self.transport().ok_or(AnchorError::ConnectionClosed)?;
        let data = self.interface.encode_anchor(
            abi::document_word(fingerprint),
            signature,
            abi::hardware_word(hardware_id),
        );
        let sender = hex_address(&self.sender);

        let raw_nonce = transport
            .call("eth_getTransactionCount", serde_json::json!([sender, "pending"]))
            .await
            .map_err(AnchorError::Nonce)?;
        let nonce = rpc::parse_quantity(&raw_nonce)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| AnchorError::MalformedQuantity {
                field: "nonce",
                value: raw_nonce.to_string(),
            })?;

        let raw_price = transport
            .call("eth_gasPrice", serde_json::json!([]))
            .await
            .map_err(AnchorError::GasPrice)?;
        let gas_price = rpc::parse_quantity(&raw_price).ok_or_else(|| AnchorError::MalformedQuantity {
            field: "gas price",
            value: raw_price.to_string(),
        })?;

        let signed = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit: self.gas_limit,
            to: self.contract,
            value: 0,
            data,
            chain_id: self.chain_id,
        }
        .sign(&self.signer)?;

        let reference = TxReference::ledger(signed.hash);
        let accepted = transport
            .call(
                "eth_sendRawTransaction",
                serde_json::json!([format!("0x{}", hex::encode(&signed.raw))]),
            )
            .await
            .map_err(AnchorError::Submission)?;

        if accepted.as_str() != Some(reference.as_str()) {
            tracing::warn!(
                local = %reference,
                node = %accepted,
                "node reported a different transaction hash"
            );
        }

        tracing::debug!(
            fingerprint = %fingerprint,
            tx_reference = %reference,
            nonce,
            "anchor transaction submitted"
        );
        Ok(reference)
    }

    /// Read a document's anchor back from the registry.
    ///
    /// # Errors
    ///
    /// [`VerifyError`] if the call fails, times out, or returns undecodable data.
    pub async fn verify(
        &self,
        fingerprint: &DocumentFingerprint,
        deadline: Duration,
    ) -> Result<LedgerAttestation, VerifyError> {
        let transport = self.transport().ok_or(VerifyError::ConnectionClosed)?;
        let call = serde_json::json!([
            {
                "to": hex_address(&self.contract),
                "data": format!("0x{}", hex::encode(self.interface.encode_verify(abi::document_word(fingerprint)))),
            },
            "latest"
        ]);

        let result = tokio::time::timeout(deadline, transport.call("eth_call", call))
            .await
            .map_err(|_| VerifyError::DeadlineExceeded {
                millis: deadline.as_millis(),
            })?
            .map_err(VerifyError::Call)?;

        let bytes = rpc::parse_data(&result)
            .ok_or_else(|| VerifyError::Decode(format!("result is not hex data: {result}")))?;
        Ok(abi::decode_verify_output(&bytes)?.into())
    }

    /// Release the network connection. Idempotent.
    pub fn close(&self) {
        if self.transport.write().take().is_some() {
            tracing::info!("ledger connection closed");
        }
    }

    fn transport(&self) -> Option<JsonRpcTransport> {
        self.transport.read().clone()
    }
}

/// Validate that a string is a well-formed Ethereum address (0x + 40 hex chars).
pub fn is_valid_eth_address(addr: &str) -> bool {
    parse_address(addr).is_some()
}

fn parse_address(addr: &str) -> Option<[u8; 20]> {
    let digits = addr.strip_prefix("0x")?;
    if digits.len() != 40 {
        return None;
    }
    let mut out = [0u8; 20];
    hex::decode_to_slice(digits, &mut out).ok()?;
    Some(out)
}

fn decode_signing_key(raw: &str) -> Result<SigningKey, ConnectionError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = Zeroizing::new(
        hex::decode(digits).map_err(|e| ConnectionError::InvalidSigningKey(e.to_string()))?,
    );
    if bytes.len() != 32 {
        return Err(ConnectionError::InvalidSigningKey(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    SigningKey::from_slice(&bytes).map_err(|e| ConnectionError::InvalidSigningKey(e.to_string()))
}

fn hex_address(addr: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(addr))
}

//! # Legacy Transactions with EIP-155 Replay Protection
//!
//! The registry contract is called with pre-London legacy transactions, the
//! form every EVM chain (public or permissioned) accepts. The signing payload
//! is `rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0])` and
//! the signed form replaces the trailing triple with `v, r, s` where
//! `v = recovery_id + chainId * 2 + 35`.

use k256::ecdsa::SigningKey;

use crate::abi::keccak256;
use crate::error::AnchorError;
use crate::rlp::RlpList;

/// An unsigned legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    /// Sender's pending transaction count.
    pub nonce: u64,
    /// Fee per gas unit, in wei.
    pub gas_price: u128,
    /// Gas ceiling.
    pub gas_limit: u64,
    /// Recipient (the registry contract).
    pub to: [u8; 20],
    /// Transferred value, in wei.
    pub value: u128,
    /// Call data.
    pub data: Vec<u8>,
    /// Chain identifier for replay protection.
    pub chain_id: u64,
}

/// A signed, RLP-encoded transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// RLP encoding of the signed transaction.
    pub raw: Vec<u8>,
    /// keccak-256 of `raw`; the transaction hash.
    pub hash: [u8; 32],
}

impl LegacyTransaction {
    fn fields(&self) -> RlpList {
        RlpList::new()
            .uint(u128::from(self.nonce))
            .uint(self.gas_price)
            .uint(u128::from(self.gas_limit))
            .bytes(&self.to)
            .uint(self.value)
            .bytes(&self.data)
    }

    /// The EIP-155 signing payload.
    pub fn signing_payload(&self) -> Vec<u8> {
        self.fields()
            .uint(u128::from(self.chain_id))
            .uint(0)
            .uint(0)
            .finish()
    }

    /// Hash that is signed.
    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Sign with `key`, producing the raw transaction and its hash.
    ///
    /// # Errors
    ///
    /// [`AnchorError::Signing`] if the ECDSA backend rejects the digest.
    pub fn sign(&self, key: &SigningKey) -> Result<SignedTransaction, AnchorError> {
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&self.signing_hash())
            .map_err(|e| AnchorError::Signing(e.to_string()))?;

        let v = u128::from(recovery_id.to_byte())
            + u128::from(self.chain_id) * 2
            + 35;
        let rs = signature.to_bytes();
        let (r, s) = rs.split_at(32);

        let raw = self.fields().uint(v).scalar(r).scalar(s).finish();
        let hash = keccak256(&raw);
        Ok(SignedTransaction { raw, hash })
    }
}

/// Ethereum address of the account controlled by `key`.
pub fn address_of(key: &SigningKey) -> [u8; 20] {
    let point = key.verifying_key().to_encoded_point(false);
    // Uncompressed SEC1: 0x04 || X || Y
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    addr
}

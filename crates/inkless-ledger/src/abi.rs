//! # Signature Registry Contract Interface
//!
//! ABI encoding for the two registry functions the subsystem calls:
//!
//! ```solidity
//! function anchorSignature(bytes32 _docHash, bytes _pqcSignature, bytes32 _hardwareID) external;
//! function verifySignature(bytes32 _docHash) external view
//!     returns (bool isValid, address signerDID, uint256 timestamp, bytes32 hardwareID);
//! ```
//!
//! The interface description is embedded as JSON and parsed at connect time.
//! Selectors are derived from the parsed signatures, so a missing or
//! mistyped function is a connection error rather than a silent revert.
//!
//! ## Identifier Derivation
//!
//! - Document word: a hex fingerprint (optional `0x`) is decoded, keeping the
//!   rightmost 32 bytes and left-padding shorter values. Any other fingerprint
//!   is keccak-256 hashed.
//! - Hardware word: keccak-256 of the hardware identifier bytes.

use inkless_core::{DocumentFingerprint, HardwareId};
use serde::Deserialize;
use sha3::{Digest, Keccak256};

use crate::error::{ConnectionError, VerifyError};

/// The registry contract interface description.
pub const REGISTRY_ABI: &str = r#"[
    {
        "inputs": [
            {"internalType": "bytes32", "name": "_docHash", "type": "bytes32"},
            {"internalType": "bytes", "name": "_pqcSignature", "type": "bytes"},
            {"internalType": "bytes32", "name": "_hardwareID", "type": "bytes32"}
        ],
        "name": "anchorSignature",
        "outputs": [],
        "stateMutability": "nonpayable",
        "type": "function"
    },
    {
        "inputs": [{"internalType": "bytes32", "name": "_docHash", "type": "bytes32"}],
        "name": "verifySignature",
        "outputs": [
            {"internalType": "bool", "name": "isValid", "type": "bool"},
            {"internalType": "address", "name": "signerDID", "type": "address"},
            {"internalType": "uint256", "name": "timestamp", "type": "uint256"},
            {"internalType": "bytes32", "name": "hardwareID", "type": "bytes32"}
        ],
        "stateMutability": "view",
        "type": "function"
    }
]"#;

const ANCHOR_SIGNATURE: &str = "anchorSignature(bytes32,bytes,bytes32)";
const VERIFY_SIGNATURE: &str = "verifySignature(bytes32)";
const VERIFY_OUTPUTS: [&str; 4] = ["bool", "address", "uint256", "bytes32"];

/// keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// First four bytes of the keccak-256 hash of a canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

#[derive(Debug, Deserialize)]
struct AbiEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<AbiParam>,
    #[serde(default)]
    outputs: Vec<AbiParam>,
}

#[derive(Debug, Deserialize)]
struct AbiParam {
    #[serde(rename = "type")]
    kind: String,
}

impl AbiEntry {
    fn signature(&self) -> String {
        let params: Vec<&str> = self.inputs.iter().map(|p| p.kind.as_str()).collect();
        format!("{}({})", self.name, params.join(","))
    }
}

/// Parsed registry interface with resolved selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractInterface {
    anchor_selector: [u8; 4],
    verify_selector: [u8; 4],
}

impl ContractInterface {
    /// Parse the embedded [`REGISTRY_ABI`].
    pub fn registry() -> Result<Self, ConnectionError> {
        Self::parse(REGISTRY_ABI)
    }

    /// Parse an interface description and resolve the registry functions.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::ContractInterface`] if the JSON is malformed or
    /// either function is missing or has a different shape.
    pub fn parse(json: &str) -> Result<Self, ConnectionError> {
        let entries: Vec<AbiEntry> = serde_json::from_str(json)
            .map_err(|e| ConnectionError::ContractInterface(e.to_string()))?;

        let find = |signature: &str| {
            entries
                .iter()
                .find(|e| e.kind == "function" && e.signature() == signature)
                .ok_or_else(|| {
                    ConnectionError::ContractInterface(format!("missing function {signature}"))
                })
        };

        find(ANCHOR_SIGNATURE)?;
        let verify = find(VERIFY_SIGNATURE)?;
        let outputs: Vec<&str> = verify.outputs.iter().map(|p| p.kind.as_str()).collect();
        if outputs != VERIFY_OUTPUTS {
            return Err(ConnectionError::ContractInterface(format!(
                "{VERIFY_SIGNATURE} returns ({}), expected ({})",
                outputs.join(","),
                VERIFY_OUTPUTS.join(",")
            )));
        }

        Ok(Self {
            anchor_selector: selector(ANCHOR_SIGNATURE),
            verify_selector: selector(VERIFY_SIGNATURE),
        })
    }

    /// Call data for `anchorSignature(bytes32,bytes,bytes32)`.
    ///
    /// Layout: selector, document word, offset of the dynamic `bytes` (0x60),
    /// hardware word, then the length word and the right-padded signature.
    pub fn encode_anchor(&self, doc: [u8; 32], signature: &[u8], hardware: [u8; 32]) -> Vec<u8> {
        let padded = signature.len().div_ceil(32) * 32;
        let mut out = Vec::with_capacity(4 + 32 * 4 + padded);
        out.extend_from_slice(&self.anchor_selector);
        out.extend_from_slice(&doc);
        out.extend_from_slice(&uint_word(0x60));
        out.extend_from_slice(&hardware);
        out.extend_from_slice(&uint_word(signature.len() as u64));
        out.extend_from_slice(signature);
        out.resize(4 + 32 * 4 + padded, 0);
        out
    }

    /// Call data for `verifySignature(bytes32)`.
    pub fn encode_verify(&self, doc: [u8; 32]) -> Vec<u8> {
        let mut out = Vec::with_capacity(36);
        out.extend_from_slice(&self.verify_selector);
        out.extend_from_slice(&doc);
        out
    }
}

/// Decoded `verifySignature` return tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutput {
    /// Whether the registry holds a signature for the document.
    pub is_valid: bool,
    /// Address that anchored it.
    pub signer: [u8; 20],
    /// Block timestamp of the anchor, seconds since the epoch.
    pub timestamp: u64,
    /// Hardware word stored with the anchor.
    pub hardware: [u8; 32],
}

/// Decode the `(bool, address, uint256, bytes32)` return data.
///
/// # Errors
///
/// [`VerifyError::Decode`] for short data, a boolean word other than 0/1,
/// an address word with non-zero padding, or a timestamp beyond `u64`.
pub fn decode_verify_output(data: &[u8]) -> Result<VerifyOutput, VerifyError> {
    if data.len() < 128 {
        return Err(VerifyError::Decode(format!(
            "expected 128 bytes, got {}",
            data.len()
        )));
    }
    let word = |i: usize| &data[i * 32..(i + 1) * 32];

    let flag = word(0);
    if flag[..31].iter().any(|b| *b != 0) || flag[31] > 1 {
        return Err(VerifyError::Decode("isValid is not a boolean".to_string()));
    }

    let addr = word(1);
    if addr[..12].iter().any(|b| *b != 0) {
        return Err(VerifyError::Decode("signer address has dirty padding".to_string()));
    }
    let mut signer = [0u8; 20];
    signer.copy_from_slice(&addr[12..]);

    let ts = word(2);
    if ts[..24].iter().any(|b| *b != 0) {
        return Err(VerifyError::Decode("timestamp exceeds u64".to_string()));
    }
    let mut ts_bytes = [0u8; 8];
    ts_bytes.copy_from_slice(&ts[24..]);

    let mut hardware = [0u8; 32];
    hardware.copy_from_slice(word(3));

    Ok(VerifyOutput {
        is_valid: flag[31] == 1,
        signer,
        timestamp: u64::from_be_bytes(ts_bytes),
        hardware,
    })
}

/// The 32-byte on-ledger document identifier for a fingerprint.
pub fn document_word(fingerprint: &DocumentFingerprint) -> [u8; 32] {
    let raw = fingerprint.as_str();
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return keccak256(raw.as_bytes());
    }

    let even = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    match hex::decode(even) {
        Ok(bytes) => {
            let mut word = [0u8; 32];
            let tail = &bytes[bytes.len().saturating_sub(32)..];
            word[32 - tail.len()..].copy_from_slice(tail);
            word
        }
        Err(_) => keccak256(raw.as_bytes()),
    }
}

/// The 32-byte on-ledger hardware identifier.
pub fn hardware_word(hardware_id: &HardwareId) -> [u8; 32] {
    keccak256(hardware_id.as_bytes())
}

fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fp(s: &str) -> DocumentFingerprint {
        DocumentFingerprint::new(s).unwrap()
    }

    #[test]
    fn keccak_of_empty_input() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn selector_matches_erc20_transfer() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
    }

    #[test]
    fn registry_interface_parses() {
        let iface = ContractInterface::registry().unwrap();
        assert_eq!(iface.anchor_selector, selector(ANCHOR_SIGNATURE));
        assert_eq!(iface.verify_selector, selector(VERIFY_SIGNATURE));
    }

    #[test]
    fn interface_missing_function_is_rejected() {
        let json = r#"[{"type":"function","name":"verifySignature","inputs":[{"type":"bytes32"}],"outputs":[]}]"#;
        let err = ContractInterface::parse(json).unwrap_err();
        assert!(err.to_string().contains("anchorSignature"));
    }

    #[test]
    fn interface_with_wrong_outputs_is_rejected() {
        let json = r#"[
            {"type":"function","name":"anchorSignature","inputs":[{"type":"bytes32"},{"type":"bytes"},{"type":"bytes32"}]},
            {"type":"function","name":"verifySignature","inputs":[{"type":"bytes32"}],"outputs":[{"type":"bool"}]}
        ]"#;
        assert!(ContractInterface::parse(json).is_err());
        assert!(ContractInterface::parse("not json").is_err());
    }

    #[test]
    fn anchor_calldata_layout() {
        let iface = ContractInterface::registry().unwrap();
        let doc = [0x11; 32];
        let hw = [0x22; 32];
        let sig = vec![0xaa; 40];
        let data = iface.encode_anchor(doc, &sig, hw);

        // selector + 4 head/length words + 2 words of signature
        assert_eq!(data.len(), 4 + 32 * 4 + 64);
        assert_eq!(&data[..4], &selector(ANCHOR_SIGNATURE));
        assert_eq!(&data[4..36], &doc);
        assert_eq!(data[67], 0x60);
        assert_eq!(&data[68..100], &hw);
        assert_eq!(data[131], 40);
        assert_eq!(&data[132..172], sig.as_slice());
        assert!(data[172..].iter().all(|b| *b == 0));
    }

    #[test]
    fn anchor_calldata_with_empty_signature() {
        let iface = ContractInterface::registry().unwrap();
        let data = iface.encode_anchor([0; 32], &[], [0; 32]);
        assert_eq!(data.len(), 4 + 32 * 4);
    }

    #[test]
    fn verify_calldata_layout() {
        let iface = ContractInterface::registry().unwrap();
        let data = iface.encode_verify([0x33; 32]);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &selector(VERIFY_SIGNATURE));
    }

    #[test]
    fn decode_valid_output() {
        let mut data = vec![0u8; 128];
        data[31] = 1;
        data[44..64].copy_from_slice(&[0x9d; 20]);
        data[88..96].copy_from_slice(&1_700_000_000u64.to_be_bytes());
        data[96..128].copy_from_slice(&[0x44; 32]);

        let out = decode_verify_output(&data).unwrap();
        assert!(out.is_valid);
        assert_eq!(out.signer, [0x9d; 20]);
        assert_eq!(out.timestamp, 1_700_000_000);
        assert_eq!(out.hardware, [0x44; 32]);
    }

    #[test]
    fn decode_rejects_malformed_output() {
        assert!(matches!(decode_verify_output(&[0u8; 64]), Err(VerifyError::Decode(_))));

        let mut bad_bool = vec![0u8; 128];
        bad_bool[31] = 2;
        assert!(decode_verify_output(&bad_bool).is_err());

        let mut dirty_addr = vec![0u8; 128];
        dirty_addr[32] = 1;
        assert!(decode_verify_output(&dirty_addr).is_err());

        let mut huge_ts = vec![0u8; 128];
        huge_ts[64] = 1;
        assert!(decode_verify_output(&huge_ts).is_err());
    }

    #[test]
    fn document_word_left_pads_hex() {
        let word = document_word(&fp("abc123"));
        assert!(word[..29].iter().all(|b| *b == 0));
        assert_eq!(&word[29..], &[0xab, 0xc1, 0x23]);
        assert_eq!(document_word(&fp("0xabc123")), word);
    }

    #[test]
    fn document_word_handles_odd_length_and_full_hashes() {
        assert_eq!(document_word(&fp("abc"))[30..], [0x0a, 0xbc]);
        let full = "ff".repeat(32);
        assert_eq!(document_word(&fp(&full)), [0xff; 32]);
        let long = format!("01{}", "ee".repeat(32));
        assert_eq!(document_word(&fp(&long)), [0xee; 32]);
    }

    #[test]
    fn document_word_hashes_non_hex() {
        assert_eq!(
            document_word(&fp("report-2026.pdf")),
            keccak256(b"report-2026.pdf")
        );
    }

    #[test]
    fn hardware_word_is_keccak() {
        let hw = HardwareId::new("hw-1").unwrap();
        assert_eq!(hardware_word(&hw), keccak256(b"hw-1"));
    }

    proptest! {
        #[test]
        fn anchor_calldata_is_word_aligned(sig in proptest::collection::vec(any::<u8>(), 0..300)) {
            let iface = ContractInterface::registry().unwrap();
            let data = iface.encode_anchor([1; 32], &sig, [2; 32]);
            prop_assert_eq!((data.len() - 4) % 32, 0);
            prop_assert_eq!(&data[132..132 + sig.len()], sig.as_slice());
        }
    }
}

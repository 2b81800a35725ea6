//! # API Route Modules
//!
//! - `signatures`: online anchoring and the recent-signatures feed.
//! - `verify`: multi-party verification and the ledger read-back.
//! - `offline`: offline batch sync and the pending counter.

pub mod offline;
pub mod signatures;
pub mod verify;

use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};

/// Decode a standard base64 signature field. Empty input is rejected.
pub(crate) fn decode_signature(encoded: &str) -> Result<Vec<u8>, String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("pqcSignature is not valid base64: {e}"))?;
    if bytes.is_empty() {
        return Err("pqcSignature must not be empty".to_string());
    }
    Ok(bytes)
}

/// RFC 3339 with second precision and a `Z` suffix.
pub(crate) fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_field_must_be_non_empty_base64() {
        assert_eq!(decode_signature("3q2+7w==").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(decode_signature("").is_err());
        assert!(decode_signature("not base64!").is_err());
    }

    #[test]
    fn timestamps_use_zulu_seconds() {
        let at = DateTime::parse_from_rfc3339("2025-03-01T12:30:45.123+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(rfc3339(at), "2025-03-01T12:30:45Z");
    }
}

//! Minimal RLP encoder for legacy transactions.
//!
//! Only encoding is needed: transactions are built and signed locally, and
//! the node's responses are JSON. Integers are big-endian with leading zero
//! bytes stripped, so zero encodes as the empty string (`0x80`).

/// Accumulates the items of a single RLP list.
#[derive(Debug, Default)]
pub struct RlpList {
    payload: Vec<u8>,
}

impl RlpList {
    /// Start an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a byte string.
    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        encode_bytes(&mut self.payload, bytes);
        self
    }

    /// Append an unsigned integer.
    pub fn uint(self, value: u128) -> Self {
        let be = value.to_be_bytes();
        self.scalar(&be)
    }

    /// Append a big-endian scalar, stripping leading zero bytes.
    pub fn scalar(self, be_bytes: &[u8]) -> Self {
        let first = be_bytes.iter().position(|b| *b != 0).unwrap_or(be_bytes.len());
        self.bytes(&be_bytes[first..])
    }

    /// Close the list and return its encoding.
    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload.len() + 9);
        encode_header(&mut out, 0xc0, self.payload.len());
        out.extend_from_slice(&self.payload);
        out
    }
}

fn encode_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.len() == 1 && bytes[0] < 0x80 {
        out.push(bytes[0]);
    } else {
        encode_header(out, 0x80, bytes.len());
        out.extend_from_slice(bytes);
    }
}

fn encode_header(out: &mut Vec<u8>, offset: u8, len: usize) {
    if len <= 55 {
        out.push(offset + len as u8);
    } else {
        let be = (len as u64).to_be_bytes();
        let first = be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1);
        let len_bytes = &be[first..];
        out.push(offset + 55 + len_bytes.len() as u8);
        out.extend_from_slice(len_bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Encode a single string item by stripping the list header.
    fn item(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_bytes(&mut out, bytes);
        out
    }

    #[test]
    fn short_strings() {
        assert_eq!(item(b"dog"), vec![0x83, b'd', b'o', b'g']);
        assert_eq!(item(b""), vec![0x80]);
        assert_eq!(item(&[0x0f]), vec![0x0f]);
        assert_eq!(item(&[0x80]), vec![0x81, 0x80]);
    }

    #[test]
    fn long_string_header() {
        let s = vec![b'a'; 56];
        let enc = item(&s);
        assert_eq!(&enc[..2], &[0xb8, 0x38]);
        assert_eq!(enc.len(), 58);
    }

    #[test]
    fn integers() {
        assert_eq!(RlpList::new().uint(0).finish(), vec![0xc1, 0x80]);
        assert_eq!(RlpList::new().uint(15).finish(), vec![0xc1, 0x0f]);
        assert_eq!(RlpList::new().uint(1024).finish(), vec![0xc3, 0x82, 0x04, 0x00]);
    }

    #[test]
    fn lists() {
        assert_eq!(RlpList::new().finish(), vec![0xc0]);
        assert_eq!(
            RlpList::new().bytes(b"cat").bytes(b"dog").finish(),
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
    }

    #[test]
    fn long_list_header() {
        let enc = RlpList::new().bytes(&[0xaa; 60]).finish();
        // 62-byte payload: 0xb8 0x3c + 60 bytes
        assert_eq!(&enc[..2], &[0xf8, 62]);
        assert_eq!(enc.len(), 64);
    }

    proptest! {
        #[test]
        fn string_length_is_reflected_in_header(bytes in proptest::collection::vec(any::<u8>(), 2..2000)) {
            let enc = item(&bytes);
            prop_assert!(enc.ends_with(&bytes));
            if bytes.len() <= 55 {
                prop_assert_eq!(enc[0] as usize, 0x80 + bytes.len());
            } else {
                prop_assert!(enc[0] > 0xb7);
            }
        }
    }
}

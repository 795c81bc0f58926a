//! # Identity Primitives — Account Addresses
//!
//! `Address` is the 20-byte account identifier used for evidence submitters
//! and recipient key slots. It participates in the fixed-layout Merkle leaf
//! encoding at exactly 20 bytes, so it is a validated newtype rather than a
//! bare string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::KeyFormatError;
use crate::hexutil;

/// A 20-byte account address.
///
/// Serializes as 40 lowercase hex chars without prefix (canonical byte-field
/// form); parsing tolerates a `0x` prefix and mixed case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Create an address from raw 20 bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parse an address from hex text (with or without `0x`).
    pub fn from_hex(s: &str) -> Result<Self, KeyFormatError> {
        let raw = hexutil::decode(s).map_err(|e| KeyFormatError::InvalidHex(e.to_string()))?;
        if raw.len() != 20 {
            return Err(KeyFormatError::InvalidLength {
                expected: "20 bytes",
                got: raw.len(),
            });
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&raw);
        Ok(Self(out))
    }

    /// Return the raw 20-byte address.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Render as 40 lowercase hex chars, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_accepts_prefix_and_case() {
        let a = Address::from_hex("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf").unwrap();
        let b = Address::from_hex("7e5f4552091a69125d5dfcb7b8c2659029395bdf").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_hex(), "7e5f4552091a69125d5dfcb7b8c2659029395bdf");
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(matches!(
            Address::from_hex("0xaabb"),
            Err(KeyFormatError::InvalidLength { got: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!(matches!(
            Address::from_hex("0xzz5f4552091a69125d5dfcb7b8c2659029395bdf"),
            Err(KeyFormatError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_serde_roundtrip() {
        let a = Address::from_bytes([0x11; 20]);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, format!("\"{}\"", "11".repeat(20)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }
}

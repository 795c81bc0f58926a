//! # Hex Serde Helpers
//!
//! Canonical form renders every byte field as lowercase hex without a
//! prefix. These `with`-modules keep that rule in one place for all
//! `Serialize`/`Deserialize` derives in the workspace. Deserialization is
//! tolerant of a leading `0x` and uppercase digits; serialization is always
//! canonical.

use serde::{Deserialize, Deserializer, Serializer};

/// Strip an optional `0x`/`0X` prefix and lowercase the rest.
pub fn normalize_hex(s: &str) -> String {
    let t = s.trim();
    let t = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")).unwrap_or(t);
    t.to_lowercase()
}

/// Decode hex text into bytes, tolerating a `0x` prefix and mixed case.
pub fn decode(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(normalize_hex(s))
}

/// Serde module for `Vec<u8>` fields rendered as lowercase hex.
pub mod hex_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde module for `[u8; 32]` fields rendered as lowercase hex.
pub mod hex_bytes32 {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = decode(&s).map_err(serde::de::Error::custom)?;
        if raw.len() != 32 {
            return Err(serde::de::Error::custom(format!(
                "expected 32 bytes, got {}",
                raw.len()
            )));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&raw);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Blob {
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
        #[serde(with = "hex_bytes32")]
        digest: [u8; 32],
    }

    #[test]
    fn test_roundtrip_lowercase_no_prefix() {
        let b = Blob {
            data: vec![0xde, 0xad, 0xbe, 0xef],
            digest: [0xab; 32],
        };
        let json = serde_json::to_string(&b).unwrap();
        assert!(json.contains("\"deadbeef\""));
        assert!(!json.contains("0x"));
        let back: Blob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn test_tolerant_deserialization() {
        let json = format!(
            "{{\"data\":\"0xDEADBEEF\",\"digest\":\"0x{}\"}}",
            "AB".repeat(32)
        );
        let b: Blob = serde_json::from_str(&json).unwrap();
        assert_eq!(b.data, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(b.digest, [0xab; 32]);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let json = "{\"data\":\"00\",\"digest\":\"aabb\"}";
        assert!(serde_json::from_str::<Blob>(json).is_err());
    }

    #[test]
    fn test_normalize_hex() {
        assert_eq!(normalize_hex(" 0xAbCd "), "abcd");
        assert_eq!(normalize_hex("abcd"), "abcd");
    }
}

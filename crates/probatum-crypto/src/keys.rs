//! # secp256k1 Key Material
//!
//! `PublicKey` and `PrivateKey` newtypes over fixed-length secp256k1
//! encodings. Several interoperating producers disagree on key encodings —
//! `0x`-prefixed vs bare hex, compressed vs uncompressed points, and
//! uncompressed points with the leading `0x04` marker dropped. Every
//! accepted form is normalized to one canonical byte length at the
//! boundary; anything that cannot be normalized is rejected with
//! `KeyFormatError` before it reaches a cipher.
//!
//! ## Security Invariant
//!
//! - `PrivateKey` never implements `Serialize` and its scalar is zeroized
//!   on drop (via `k256::SecretKey`).
//! - Canonical public form is the 65-byte uncompressed SEC1 encoding,
//!   rendered as 130 lowercase hex chars.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use probatum_core::error::KeyFormatError;
use probatum_core::{hash, hexutil, Address};

/// A secp256k1 public key, held in canonical uncompressed SEC1 form.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    bytes: [u8; 65],
}

/// A secp256k1 private key (32-byte scalar).
///
/// Does not implement `Serialize` — private keys must not be accidentally
/// serialized into logs, responses, or artifacts.
pub struct PrivateKey {
    secret: k256::SecretKey,
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print scalar bytes.
        f.write_str("PrivateKey(..)")
    }
}

impl PublicKey {
    /// Normalize a byte encoding to the canonical uncompressed form.
    ///
    /// Accepted inputs:
    /// - 65 bytes, uncompressed SEC1 (`0x04` marker);
    /// - 33 bytes, compressed SEC1 (decompressed on the curve);
    /// - 64 bytes, uncompressed coordinates with the marker dropped.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyFormatError> {
        let sec1: Vec<u8> = match bytes.len() {
            65 | 33 => bytes.to_vec(),
            64 => {
                let mut v = Vec::with_capacity(65);
                v.push(0x04);
                v.extend_from_slice(bytes);
                v
            }
            other => {
                return Err(KeyFormatError::InvalidLength {
                    expected: "33, 64, or 65 bytes",
                    got: other,
                })
            }
        };
        let point = k256::PublicKey::from_sec1_bytes(&sec1)
            .map_err(|e| KeyFormatError::NotOnCurve(e.to_string()))?;
        Ok(Self::from_k256(&point))
    }

    /// Normalize hex text (with or without `0x`, any case, compressed or
    /// uncompressed, marker optionally dropped).
    pub fn from_hex(s: &str) -> Result<Self, KeyFormatError> {
        let raw = hexutil::decode(s).map_err(|e| KeyFormatError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&raw)
    }

    pub(crate) fn from_k256(point: &k256::PublicKey) -> Self {
        let encoded = point.to_encoded_point(false);
        let mut bytes = [0u8; 65];
        bytes.copy_from_slice(encoded.as_bytes());
        Self { bytes }
    }

    pub(crate) fn to_k256(&self) -> Result<k256::PublicKey, KeyFormatError> {
        k256::PublicKey::from_sec1_bytes(&self.bytes)
            .map_err(|e| KeyFormatError::NotOnCurve(e.to_string()))
    }

    /// The canonical 65-byte uncompressed encoding.
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.bytes
    }

    /// Render as 130 lowercase hex chars (uncompressed, `04`-prefixed).
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Derive the 20-byte account address:
    /// `keccak256(uncompressed[1..65])[12..32]`.
    pub fn address(&self) -> Address {
        let digest = hash::keccak256(&self.bytes[1..]);
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[12..]);
        Address::from_bytes(out)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl PrivateKey {
    /// Construct from a 32-byte scalar. Rejects zero and unreduced scalars.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyFormatError> {
        if bytes.len() != 32 {
            return Err(KeyFormatError::InvalidLength {
                expected: "32 bytes",
                got: bytes.len(),
            });
        }
        let secret = k256::SecretKey::from_slice(bytes)
            .map_err(|e| KeyFormatError::InvalidScalar(e.to_string()))?;
        Ok(Self { secret })
    }

    /// Parse from 64 hex chars (with or without `0x`).
    pub fn from_hex(s: &str) -> Result<Self, KeyFormatError> {
        let raw = hexutil::decode(s).map_err(|e| KeyFormatError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&raw)
    }

    /// Generate a fresh private key from the OS entropy source.
    pub fn random() -> Self {
        Self {
            secret: k256::SecretKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// The corresponding public key in canonical uncompressed form.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_k256(&self.secret.public_key())
    }

    pub(crate) fn secret(&self) -> &k256::SecretKey {
        &self.secret
    }
}

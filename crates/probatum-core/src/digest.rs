//! # Content Digest — Algorithm-Tagged 256-Bit Identifiers
//!
//! Defines `ContentDigest` and `DigestAlgorithm` for the content-addressed
//! evidence scheme that underpins the Probatum stack.
//!
//! ## Security Invariant
//!
//! A bound digest can only be computed from `CanonicalBytes`, ensuring that
//! all ledger-facing digests are produced through the canonicalization
//! pipeline. This is enforced by the signature of [`keccak256_digest()`].
//!
//! Raw-byte digests (Merkle leaves, stored blobs) go through
//! [`ContentDigest::of_bytes`], which is explicit about hashing exact bytes
//! rather than a canonical serialization.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::canonical::CanonicalBytes;
use crate::error::KeyFormatError;
use crate::hash;

/// The hash algorithm used to produce a content digest.
///
/// Keccak-256 is the binding algorithm for envelope digests and Merkle
/// paths (it must match the values anchored externally). SHA-256 appears in
/// storage-reference digests produced by content-addressed storage
/// collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// Keccak-256 — ledger-compatible content addressing.
    Keccak256,
    /// SHA-256 — storage-collaborator content addressing.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keccak256 => "keccak256",
            Self::Sha256 => "sha256",
        }
    }

    /// Parse an algorithm identifier string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "keccak256" => Some(Self::Keccak256),
            "sha256" => Some(Self::Sha256),
            _ => None,
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content digest with its algorithm tag.
///
/// Serializes as `"<algorithm>:<64 lowercase hex chars>"` so digests are
/// self-describing in exported artifacts and remain a single sorted JSON
/// string in canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a content digest from raw bytes and algorithm.
    ///
    /// Prefer [`keccak256_digest()`] for digests over canonical structures.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Hash exact bytes (a stored blob, a Merkle leaf encoding) with the
    /// given algorithm.
    pub fn of_bytes(algorithm: DigestAlgorithm, data: &[u8]) -> Self {
        let bytes = match algorithm {
            DigestAlgorithm::Keccak256 => hash::keccak256(data),
            DigestAlgorithm::Sha256 => hash::sha256(data),
        };
        Self { algorithm, bytes }
    }

    /// Render the digest value as a lowercase hex string (no algorithm tag).
    pub fn to_hex(&self) -> String {
        hash::to_hex(&self.bytes)
    }

    /// Parse a digest from its `"<algorithm>:<hex>"` string form.
    pub fn parse(s: &str) -> Result<Self, KeyFormatError> {
        let (alg, hex_part) = s
            .split_once(':')
            .ok_or_else(|| KeyFormatError::Malformed("digest missing algorithm tag".into()))?;
        let algorithm = DigestAlgorithm::parse(alg)
            .ok_or_else(|| KeyFormatError::Malformed(format!("unknown digest algorithm: {alg}")))?;
        let raw = hex::decode(hex_part)
            .map_err(|e| KeyFormatError::Malformed(format!("invalid digest hex: {e}")))?;
        if raw.len() != 32 {
            return Err(KeyFormatError::InvalidLength {
                expected: "32 bytes",
                got: raw.len(),
            });
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&raw);
        Ok(Self { algorithm, bytes })
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Compute a Keccak-256 content digest from canonical bytes.
///
/// This is the digest-binding path: the result is the value recorded
/// externally and later compared bit-for-bit at verification time.
///
/// # Security Invariant
///
/// Accepts only `&CanonicalBytes`, not raw `&[u8]`. This compile-time
/// constraint prevents any code path from binding a digest over
/// non-canonical bytes.
pub fn keccak256_digest(data: &CanonicalBytes) -> ContentDigest {
    ContentDigest::new(DigestAlgorithm::Keccak256, hash::keccak256(data.as_bytes()))
}

/// Compute a Keccak-256 hex string from canonical bytes.
///
/// Convenience wrapper around [`keccak256_digest()`] for contexts that need
/// the digest as a hex string (e.g., artifact naming).
pub fn keccak256_hex(data: &CanonicalBytes) -> String {
    keccak256_digest(data).to_hex()
}

/// Compute a SHA-256 content digest from canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    ContentDigest::new(DigestAlgorithm::Sha256, hash::sha256(data.as_bytes()))
}

//! # Evidence Leaf Encoding
//!
//! A fixed-layout byte encoding of one evidence submission, hashed into the
//! batch Merkle tree. The layout is positional with big-endian integers and
//! no field delimiters, so every implementation that follows it produces
//! identical leaf hashes:
//!
//! ```text
//! caseId        32 bytes   u64 widened, big-endian
//! contentDigest 32 bytes   bound digest of the ciphertext envelope
//! storageRef    32 bytes   Keccak-256 of the storage reference string
//! submitter     20 bytes   account address
//! timestamp     32 bytes   u64 widened, big-endian
//! ```
//!
//! 148 bytes total; the leaf hash is Keccak-256 over them.

use serde::{Deserialize, Serialize};

use probatum_core::{hash, Address, ContentDigest, DigestAlgorithm};

/// Byte length of the fixed leaf layout.
pub const LEAF_ENCODING_LEN: usize = 148;

/// One evidence submission, as committed into a batch tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceLeaf {
    /// The dispute case this evidence belongs to.
    pub case_id: u64,
    /// Bound digest of the ciphertext envelope (Keccak-256 of its
    /// canonical bytes).
    pub content_digest: ContentDigest,
    /// Keccak-256 digest of the storage reference string.
    pub storage_ref_digest: ContentDigest,
    /// Address of the submitting party.
    pub submitter: Address,
    /// Submission time, seconds since the Unix epoch.
    pub timestamp: u64,
}

impl EvidenceLeaf {
    /// Digest a storage reference string (URI, content id, path) for the
    /// `storageRef` field.
    pub fn digest_storage_ref(storage_ref: &str) -> ContentDigest {
        ContentDigest::of_bytes(DigestAlgorithm::Keccak256, storage_ref.as_bytes())
    }

    /// The 148-byte fixed-layout encoding.
    pub fn encode(&self) -> [u8; LEAF_ENCODING_LEN] {
        let mut out = [0u8; LEAF_ENCODING_LEN];
        out[24..32].copy_from_slice(&self.case_id.to_be_bytes());
        out[32..64].copy_from_slice(&self.content_digest.bytes);
        out[64..96].copy_from_slice(&self.storage_ref_digest.bytes);
        out[96..116].copy_from_slice(self.submitter.as_bytes());
        out[140..148].copy_from_slice(&self.timestamp.to_be_bytes());
        out
    }

    /// The leaf hash: Keccak-256 over the fixed-layout encoding.
    pub fn hash(&self) -> [u8; 32] {
        hash::keccak256(&self.encode())
    }
}

//! # Hash Utility — Fixed 256-Bit Digests Over Byte Sequences
//!
//! The single place raw hashing happens. Keccak-256 is the binding hash for
//! envelope digests and every Merkle path; changing it would break agreement
//! with previously anchored values. SHA-256 is provided for storage-reference
//! digests produced by external collaborators and for the ECIES key
//! derivation steps in `probatum-crypto`.

use sha2::{Digest as _, Sha256};
use sha3::Keccak256;

/// Compute Keccak-256 over a byte slice.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let hash = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

/// Compute SHA-256 over a byte slice.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

/// Render a 32-byte digest as lowercase hex.
pub fn to_hex(bytes: &[u8; 32]) -> String {
    hex::encode(bytes)
}

//! # probatum-core — Foundational Types for the Probatum Evidence Layer
//!
//! This crate is the bedrock of the Probatum stack: the legal-evidence
//! integrity layer of a dispute-arbitration platform. It defines the core
//! type-system primitives that enforce correctness guarantees at compile time.
//! Every other crate in the workspace depends on `probatum-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** ALL digest computation flows through
//!    `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for digests.
//!    Ever. Two structurally-equal values must always hash identically, or
//!    an envelope digest recorded on a ledger would stop matching the bytes
//!    it was computed from.
//!
//! 2. **Algorithm-tagged digests.** `ContentDigest` carries a
//!    `DigestAlgorithm` tag. Keccak-256 is the binding algorithm for
//!    envelope digests and Merkle paths; SHA-256 remains representable for
//!    storage-reference digests produced by external collaborators.
//!
//! 3. **Newtype wrappers for domain primitives.** `Address` is a validated
//!    20-byte account identifier, not a bare string.
//!
//! 4. **Structured errors.** One layered `thiserror` hierarchy in
//!    `error`; cryptographic failures are never silently downgraded.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `probatum-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod hash;
pub mod hexutil;
pub mod identity;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{keccak256_digest, keccak256_hex, sha256_digest, ContentDigest, DigestAlgorithm};
pub use error::{
    CanonicalizationError, DecryptionError, EncryptionError, IntegrityError, KeyFormatError,
    ProbatumError, RangeError, StoreError,
};
pub use identity::Address;

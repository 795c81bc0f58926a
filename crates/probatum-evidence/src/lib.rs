//! # probatum-evidence — Merkle Batch Engine
//!
//! Commits batches of evidence submissions to a single anchorable root:
//!
//! - **Evidence leaves**: a fixed 148-byte positional encoding of one
//!   submission (case, envelope digest, storage reference, submitter,
//!   timestamp), hashed with Keccak-256.
//! - **Batch trees**: Merkle trees with sorted-pair hashing and last-node
//!   duplication, so proofs carry no direction bits.
//! - **Inclusion proofs**: verifiable from the anchored root alone,
//!   without the batch or its leaf count.
//!
//! ## Crate Policy
//!
//! - Depends only on `probatum-core` internally.
//! - Leaf hashing and pair hashing are pure functions of their byte
//!   encodings; no test mocks any hash.
//! - `unsafe` prohibited without `// SAFETY:` justification.

pub mod batch;
pub mod leaf;
pub mod merkle;

pub use batch::{BatchExport, BatcherStatus, EvidenceBatch, EvidenceBatcher};
pub use leaf::{EvidenceLeaf, LEAF_ENCODING_LEN};
pub use merkle::{hash_pair, verify_proof, MerkleProof, MerkleTree};

//! # probatum-crypto — Evidence Encryption Primitives
//!
//! Cryptographic building blocks for the Probatum evidence layer:
//!
//! - **Hybrid envelopes**: AES-256-GCM payload encryption with the
//!   symmetric key ECIES-wrapped to every recipient over secp256k1.
//! - **Fallback resolver**: decryption across the encoding and backend
//!   conventions of every producer that has ever written an envelope.
//! - **Digest binding**: Keccak-256 over canonical envelope bytes, matching
//!   externally anchored references bit for bit.
//! - **Evidence store**: content-addressed blob storage with read-time
//!   digest verification.
//!
//! ## Crate Policy
//!
//! - Depends only on `probatum-core` internally.
//! - No mocking of cryptographic operations in tests — all tests use real
//!   keys, real ciphers, real digests.
//! - Key material lives in zeroizing containers; `PrivateKey` is never
//!   serializable.
//! - `unsafe` prohibited without `// SAFETY:` justification.

pub mod binder;
pub mod cas;
pub mod ecies;
pub mod envelope;
pub mod keys;
pub mod resolver;

pub use binder::{bind_digest, canonical_envelope_bytes, verify_against_reference};
pub use cas::{ContentId, EvidenceStore, FsEvidenceStore, MemoryEvidenceStore};
pub use envelope::{
    decrypt, encrypt, encrypt_with_options, EncryptOptions, EncryptOutcome, Envelope,
    SkippedRecipient, ENVELOPE_VERSION,
};
pub use keys::{PrivateKey, PublicKey};
pub use resolver::{recover_symmetric_key, recover_symmetric_key_traced, ResolverReport};

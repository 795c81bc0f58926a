//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error taxonomy used throughout the evidence layer. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Propagation Policy
//!
//! - Cryptographic failures fail loudly with full context and are never
//!   downgraded to a default or empty result.
//! - `IntegrityError` is fatal: callers must not attempt decryption of an
//!   envelope whose digest failed verification against its ledger reference.
//! - The decryption fallback resolver is the only place uncertainty is
//!   tolerated internally; it surfaces a single aggregated
//!   `DecryptionError::KeyRecoveryFailed` after exhausting all strategies.

use thiserror::Error;

/// Top-level error type for the Probatum stack.
#[derive(Error, Debug)]
pub enum ProbatumError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Envelope encryption failed.
    #[error("encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    /// Envelope decryption failed.
    #[error("decryption error: {0}")]
    Decryption(#[from] DecryptionError),

    /// Digest verification against an external reference failed.
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// Proof or leaf index out of bounds.
    #[error("range error: {0}")]
    Range(#[from] RangeError),

    /// Key material could not be normalized.
    #[error("key format error: {0}")]
    KeyFormat(#[from] KeyFormatError),

    /// Evidence store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts and counters must be strings or integers.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A supplied key (or other fixed-length byte field) cannot be normalized
/// to its canonical form.
#[derive(Error, Debug)]
pub enum KeyFormatError {
    /// The textual form is not valid hexadecimal.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The byte form has a length no accepted encoding produces.
    #[error("invalid length: expected {expected}, got {got} bytes")]
    InvalidLength {
        /// The accepted canonical length(s).
        expected: &'static str,
        /// The length that was supplied.
        got: usize,
    },

    /// The bytes do not decode to a point on the secp256k1 curve.
    #[error("not a valid curve point: {0}")]
    NotOnCurve(String),

    /// The private scalar is zero or not reduced modulo the curve order.
    #[error("invalid private scalar: {0}")]
    InvalidScalar(String),

    /// Any other malformed fixed-length field (digest tags, addresses).
    #[error("malformed: {0}")]
    Malformed(String),
}

/// Error during hybrid envelope encryption.
#[derive(Error, Debug)]
pub enum EncryptionError {
    /// Plaintext exceeds the configured size ceiling. Defensive limit,
    /// not a protocol requirement.
    #[error("plaintext too large: {size} bytes exceeds ceiling of {limit}")]
    PlaintextTooLarge {
        /// Size of the rejected plaintext.
        size: usize,
        /// The configured ceiling.
        limit: usize,
    },

    /// Recipient key material was malformed.
    #[error("recipient key malformed: {0}")]
    KeyFormat(#[from] KeyFormatError),

    /// No recipient slot could be produced (empty recipient list, or every
    /// per-recipient wrap failed).
    #[error("no recipient key slot could be produced")]
    NoRecipients,

    /// The underlying cipher operation failed.
    #[error("cipher failure: {0}")]
    Cipher(String),
}

/// Error during hybrid envelope decryption.
///
/// "No matching recipient" and "auth tag mismatch" are deliberately
/// distinguished: the former indicates a wrong key or recipient, the latter
/// indicates tampered ciphertext.
#[derive(Error, Debug)]
pub enum DecryptionError {
    /// The envelope carries no recipient slots at all.
    #[error("no matching recipient")]
    NoMatchingRecipient,

    /// The payload authentication tag check failed after a symmetric key
    /// was successfully recovered.
    #[error("auth tag mismatch")]
    AuthTagMismatch,

    /// Every fallback strategy across every recipient slot was exhausted
    /// without recovering a symmetric key.
    #[error("key recovery failed after {attempts} attempts")]
    KeyRecoveryFailed {
        /// Total number of (slot, strategy) attempts made.
        attempts: usize,
    },

    /// The envelope structure itself is unusable (missing or undecodable
    /// required fields).
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

/// Digest verification against an externally recorded reference failed.
///
/// Fatal: the envelope bytes are not the bytes the reference was computed
/// from. Callers must not proceed to decryption.
#[derive(Error, Debug)]
#[error("digest mismatch: reference {reference}, computed {computed}")]
pub struct IntegrityError {
    /// The externally supplied reference digest (hex).
    pub reference: String,
    /// The digest recomputed from the envelope (hex).
    pub computed: String,
}

/// A proof or leaf index is out of bounds for its batch.
#[derive(Error, Debug)]
#[error("index {index} out of range for {len} leaves")]
pub struct RangeError {
    /// The requested index.
    pub index: usize,
    /// The number of leaves in the batch.
    pub len: usize,
}

/// Error in evidence store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying IO failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// No blob is stored under the requested content id.
    #[error("content not found: {0}")]
    NotFound(String),

    /// Retrieved bytes do not hash to the requested content id.
    #[error("stored content digest mismatch for {0}")]
    DigestMismatch(String),
}

//! # Canonical Serialization — Deterministic Byte Production
//!
//! Defines `CanonicalBytes`, the sole construction path for bytes used in
//! digest computation across the evidence layer.
//!
//! ## Security Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through `CanonicalBytes::new()`, which rejects floats and
//! then serializes through RFC 8785 (JSON Canonicalization Scheme): object
//! keys sorted lexicographically at every level, arrays in original order,
//! compact separators, UTF-8 output.
//!
//! An envelope digest is recorded externally (on a ledger) and later compared
//! bit-for-bit against a recomputation. Any code path that serialized an
//! envelope differently — key order, whitespace, number formatting — would
//! produce a digest that never matches. Forcing every digest input through
//! this constructor makes that defect class structurally impossible: a
//! function needing canonical bytes must accept `&CanonicalBytes`, and the
//! only producer is the correct pipeline.
//!
//! ## Cross-Implementation Compatibility
//!
//! The output matches `JSON.stringify` over key-sorted objects with compact
//! separators, the convention the platform's other producers use before
//! hashing. Byte-valued fields reach this layer already rendered as lowercase
//! hex strings by their `Serialize` impls, so the canonical form contains
//! only strings, integers, arrays, and objects.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - No float values anywhere in the serialized tree.
/// - Object keys sorted, compact separators (RFC 8785), UTF-8.
///
/// These invariants are enforced by the constructor and cannot be violated by
/// downstream code because the inner `Vec<u8>` is private.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// This is the ONLY way to construct `CanonicalBytes`. All digest
    /// computation in the workspace must flow through this constructor.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains
    /// non-integer numbers. Returns `CanonicalizationError::SerializationFailed`
    /// if JCS serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively reject float values in a JSON tree.
///
/// Floats have non-deterministic serialization edge cases across JSON
/// implementations; amounts and counters in canonical structures must be
/// integers or strings. Everything else (`null`, `bool`, `string`,
/// integer-valued numbers, arrays, objects) passes through.
fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Object(map) => {
            for v in map.values() {
                reject_floats(v)?;
            }
            Ok(())
        }
        Value::Array(arr) => {
            for v in arr {
                reject_floats(v)?;
            }
            Ok(())
        }
    }
}

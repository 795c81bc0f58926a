//! # Envelope Digest Binding
//!
//! Binds a ciphertext envelope to a 32-byte digest suitable for external
//! anchoring. The digest is Keccak-256 over the envelope's canonical
//! serialization, so two envelopes that differ only in serialization form
//! (key order, hex case on re-encode) bind to the same digest, while any
//! semantic mutation — a flipped ciphertext byte, an added recipient slot —
//! produces a different one.

use subtle::ConstantTimeEq;

use probatum_core::error::{IntegrityError, ProbatumError};
use probatum_core::{keccak256_digest, CanonicalBytes, ContentDigest};

use crate::envelope::Envelope;

/// Canonical serialization of an envelope.
///
/// # Errors
///
/// `CanonicalizationError` if the envelope cannot be serialized. Envelopes
/// produced by this crate always canonicalize; the error path exists for
/// foreign values deserialized into [`Envelope`].
pub fn canonical_envelope_bytes(envelope: &Envelope) -> Result<CanonicalBytes, ProbatumError> {
    Ok(CanonicalBytes::new(envelope)?)
}

/// The digest an envelope binds to: Keccak-256 of its canonical bytes.
pub fn bind_digest(envelope: &Envelope) -> Result<ContentDigest, ProbatumError> {
    Ok(keccak256_digest(&canonical_envelope_bytes(envelope)?))
}

/// Verify an envelope against a previously anchored 32-byte reference.
///
/// The comparison is constant-time. On mismatch the error carries both hex
/// digests for the audit trail; neither value is secret.
pub fn verify_against_reference(
    envelope: &Envelope,
    reference: &[u8; 32],
) -> Result<(), ProbatumError> {
    let computed = bind_digest(envelope)?;
    if computed.bytes.ct_eq(reference).into() {
        Ok(())
    } else {
        Err(ProbatumError::Integrity(IntegrityError {
            reference: hex::encode(reference),
            computed: hex::encode(computed.bytes),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::encrypt;
    use crate::keys::PrivateKey;
    use probatum_core::DigestAlgorithm;

    fn sample_envelope() -> Envelope {
        let public = PrivateKey::random().public_key();
        encrypt(b"exhibit a", &[public]).unwrap().envelope
    }

    #[test]
    fn test_bind_digest_is_keccak_and_deterministic() {
        let envelope = sample_envelope();
        let a = bind_digest(&envelope).unwrap();
        let b = bind_digest(&envelope).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.algorithm, DigestAlgorithm::Keccak256);
    }

    #[test]
    fn test_serialization_form_does_not_change_digest() {
        let envelope = sample_envelope();
        let before = bind_digest(&envelope).unwrap();
        // Round-trip through JSON text; field order and whitespace may vary.
        let json = serde_json::to_string_pretty(&envelope).unwrap();
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(bind_digest(&back).unwrap(), before);
    }

    #[test]
    fn test_mutation_changes_digest() {
        let envelope = sample_envelope();
        let before = bind_digest(&envelope).unwrap();

        let mut tampered = envelope.clone();
        tampered.ciphertext[0] ^= 0x01;
        assert_ne!(bind_digest(&tampered).unwrap(), before);

        let mut extended = envelope.clone();
        extended.recipients.push(envelope.recipients[0].clone());
        assert_ne!(bind_digest(&extended).unwrap(), before);
    }

    #[test]
    fn test_verify_against_reference() {
        let envelope = sample_envelope();
        let reference = bind_digest(&envelope).unwrap().bytes;
        assert!(verify_against_reference(&envelope, &reference).is_ok());

        let mut tampered = envelope;
        tampered.aes_params.tag[0] ^= 0x01;
        match verify_against_reference(&tampered, &reference) {
            Err(ProbatumError::Integrity(e)) => {
                assert_eq!(e.reference, hex::encode(reference));
                assert_ne!(e.computed, e.reference);
            }
            other => panic!("expected integrity error, got {other:?}"),
        }
    }
}

//! # Decryption Fallback Resolver
//!
//! Recovers the envelope's symmetric key from whichever recipient slot the
//! caller's private key can open. Foreign producers diverge in three ways:
//! hex encoding of slot fields (`0x` prefixes, uppercase), uncompressed
//! ephemeral keys with the leading `0x04` marker dropped, and the ECIES
//! backend itself (CBC+HMAC vs legacy GCM). The resolver tries a fixed
//! strategy ladder per slot rather than trusting any single convention.
//!
//! Strategy order per slot:
//!
//! 1. CBC+HMAC backend against the as-is, normalized, and marker-repaired
//!    field interpretations (duplicates skipped);
//! 2. legacy GCM backend against the same interpretations;
//!
//! then the next slot. A successful unwrap still has to decode to exactly
//! 32 key bytes (raw, hex text, or base64 text); a slot that unwraps but
//! decodes to the wrong width counts as a failed attempt.
//!
//! The ladder stops at the first success. Exhaustion aggregates into a
//! single `DecryptionError::KeyRecoveryFailed { attempts }` — individual
//! attempt failures are diagnostics, not errors.

use base64::Engine;
use zeroize::Zeroizing;

use probatum_core::error::DecryptionError;
use probatum_core::hexutil;

use crate::ecies::{self, EciesParts};
use crate::envelope::{Envelope, WrappedKey};
use crate::keys::PrivateKey;

/// How a slot's hex text fields were read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpretation {
    /// Fields decoded exactly as serialized.
    AsIs,
    /// Fields trimmed, `0x`-stripped, and lowercased before decoding.
    Normalized,
    /// Normalized, with the `0x04` marker restored on a 64-byte ephemeral.
    MarkerRepaired,
}

/// Which ECIES backend an attempt used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// SHA-512 KDF, AES-256-CBC, HMAC-SHA256.
    CbcHmac,
    /// SHA-256 KDF over the shared point, AES-256-GCM.
    LegacyGcm,
}

impl Interpretation {
    fn as_str(self) -> &'static str {
        match self {
            Self::AsIs => "as-is",
            Self::Normalized => "normalized",
            Self::MarkerRepaired => "marker-repaired",
        }
    }
}

impl Backend {
    fn as_str(self) -> &'static str {
        match self {
            Self::CbcHmac => "cbc-hmac",
            Self::LegacyGcm => "legacy-gcm",
        }
    }
}

/// One resolver attempt, for diagnostics.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// Index of the recipient slot within the envelope.
    pub slot: usize,
    /// Field interpretation used.
    pub interpretation: Interpretation,
    /// Backend used.
    pub backend: Backend,
    /// `None` on success, otherwise the failure description.
    pub failure: Option<String>,
}

/// Full record of a resolver run. Never contains key material.
#[derive(Debug, Clone, Default)]
pub struct ResolverReport {
    /// Every attempt actually made, in order.
    pub attempts: Vec<Attempt>,
}

impl ResolverReport {
    /// Whether any attempt succeeded.
    pub fn succeeded(&self) -> bool {
        self.attempts.iter().any(|a| a.failure.is_none())
    }
}

/// Recover the envelope's 32-byte symmetric key.
pub fn recover_symmetric_key(
    envelope: &Envelope,
    private: &PrivateKey,
) -> Result<Zeroizing<[u8; 32]>, DecryptionError> {
    run(envelope, private, &mut ResolverReport::default())
}

/// Recover the symmetric key and report every attempt made.
///
/// The report is complete even on failure; use it to diagnose foreign
/// envelopes that should have been decryptable.
pub fn recover_symmetric_key_traced(
    envelope: &Envelope,
    private: &PrivateKey,
) -> (Result<Zeroizing<[u8; 32]>, DecryptionError>, ResolverReport) {
    let mut report = ResolverReport::default();
    let result = run(envelope, private, &mut report);
    (result, report)
}

fn run(
    envelope: &Envelope,
    private: &PrivateKey,
    report: &mut ResolverReport,
) -> Result<Zeroizing<[u8; 32]>, DecryptionError> {
    if envelope.recipients.is_empty() {
        return Err(DecryptionError::NoMatchingRecipient);
    }
    let interpretations = [
        Interpretation::AsIs,
        Interpretation::Normalized,
        Interpretation::MarkerRepaired,
    ];

    for (slot_index, slot) in envelope.recipients.iter().enumerate() {
        for backend in [Backend::CbcHmac, Backend::LegacyGcm] {
            let mut tried: Vec<EciesParts> = Vec::with_capacity(3);
            for interpretation in interpretations {
                let Some(parts) = read_slot(&slot.encrypted_key, interpretation) else {
                    continue;
                };
                // Identical reads of the same slot are one attempt, not three.
                if tried.contains(&parts) {
                    continue;
                }
                tried.push(parts.clone());

                let outcome = attempt(&parts, private, backend);
                let failure = outcome.as_ref().err().cloned();
                tracing::debug!(
                    slot = slot_index,
                    recipient = %slot.recipient,
                    interpretation = interpretation.as_str(),
                    backend = backend.as_str(),
                    ok = failure.is_none(),
                    "key recovery attempt"
                );
                report.attempts.push(Attempt {
                    slot: slot_index,
                    interpretation,
                    backend,
                    failure,
                });
                if let Ok(key) = outcome {
                    return Ok(key);
                }
            }
        }
    }

    Err(DecryptionError::KeyRecoveryFailed {
        attempts: report.attempts.len(),
    })
}

fn attempt(
    parts: &EciesParts,
    private: &PrivateKey,
    backend: Backend,
) -> Result<Zeroizing<[u8; 32]>, String> {
    let recovered = match backend {
        Backend::CbcHmac => ecies::unwrap(parts, private),
        Backend::LegacyGcm => ecies::unwrap_legacy_gcm(parts, private),
    }
    .map_err(|e| e.to_string())?;
    decode_symmetric_key(&recovered).ok_or_else(|| {
        format!(
            "unwrapped value does not decode to 32 key bytes (len {})",
            recovered.len()
        )
    })
}

/// Read a slot's hex text fields under one interpretation.
///
/// Returns `None` when the fields do not decode at all under that reading,
/// or the ephemeral key does not come out at 65 bytes.
fn read_slot(slot: &WrappedKey, interpretation: Interpretation) -> Option<EciesParts> {
    let decode: fn(&str) -> Option<Vec<u8>> = match interpretation {
        Interpretation::AsIs => |s| hex::decode(s).ok(),
        Interpretation::Normalized | Interpretation::MarkerRepaired => {
            |s| hexutil::decode(s).ok()
        }
    };

    let mut ephemeral = decode(&slot.ephem_public_key)?;
    if interpretation == Interpretation::MarkerRepaired && ephemeral.len() == 64 {
        ephemeral.insert(0, 0x04);
    }
    if ephemeral.len() != 65 {
        return None;
    }
    let mut ephemeral_public_key = [0u8; 65];
    ephemeral_public_key.copy_from_slice(&ephemeral);

    Some(EciesParts {
        ephemeral_public_key,
        iv: decode(&slot.iv)?,
        ciphertext: decode(&slot.ciphertext)?,
        mac: decode(&slot.mac)?,
    })
}

/// Interpret unwrapped bytes as a 32-byte symmetric key.
///
/// Foreign producers have wrapped the key raw, as 64 hex chars, and as
/// base64 text; each decoding must land on exactly 32 bytes.
fn decode_symmetric_key(recovered: &[u8]) -> Option<Zeroizing<[u8; 32]>> {
    if recovered.len() == 32 {
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(recovered);
        return Some(out);
    }
    let text = std::str::from_utf8(recovered).ok()?;
    let decoded = hexutil::decode(text)
        .ok()
        .filter(|b| b.len() == 32)
        .or_else(|| {
            base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .ok()
                .filter(|b| b.len() == 32)
        })?;
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&decoded);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{self, RecipientKeySlot};
    use crate::keys::PublicKey;

    fn keypair() -> (PrivateKey, PublicKey) {
        let private = PrivateKey::random();
        let public = private.public_key();
        (private, public)
    }

    fn slot_from_parts(recipient: &str, parts: &EciesParts) -> RecipientKeySlot {
        RecipientKeySlot {
            recipient: recipient.to_string(),
            encrypted_key: WrappedKey::from_parts(parts),
        }
    }

    fn envelope_with_slots(slots: Vec<RecipientKeySlot>) -> Envelope {
        // Payload fields are irrelevant to key recovery.
        Envelope {
            version: envelope::ENVELOPE_VERSION,
            ciphertext: vec![0u8; 16],
            aes_params: crate::envelope::AesParams {
                iv: vec![0u8; 12],
                tag: vec![0u8; 16],
            },
            recipients: slots,
        }
    }

    #[test]
    fn test_recovers_canonical_cbc_hmac_slot() {
        let (private, public) = keypair();
        let key = [0x2au8; 32];
        let parts = ecies::wrap(&public, &key).unwrap();
        let env = envelope_with_slots(vec![slot_from_parts("a", &parts)]);
        let recovered = recover_symmetric_key(&env, &private).unwrap();
        assert_eq!(recovered.as_ref(), &key);
    }

    #[test]
    fn test_recovers_legacy_gcm_slot() {
        let (private, public) = keypair();
        let key = [0x2bu8; 32];
        let parts = ecies::wrap_legacy_gcm(&public, &key).unwrap();
        let env = envelope_with_slots(vec![slot_from_parts("a", &parts)]);
        let recovered = recover_symmetric_key(&env, &private).unwrap();
        assert_eq!(recovered.as_ref(), &key);
    }

    #[test]
    fn test_recovers_prefixed_uppercase_fields() {
        let (private, public) = keypair();
        let key = [0x2cu8; 32];
        let parts = ecies::wrap(&public, &key).unwrap();
        let mut slot = slot_from_parts("a", &parts);
        slot.encrypted_key.ephem_public_key =
            format!("0x{}", slot.encrypted_key.ephem_public_key.to_uppercase());
        slot.encrypted_key.iv = format!("0x{}", slot.encrypted_key.iv);
        slot.encrypted_key.mac = slot.encrypted_key.mac.to_uppercase();
        let env = envelope_with_slots(vec![slot]);
        let recovered = recover_symmetric_key(&env, &private).unwrap();
        assert_eq!(recovered.as_ref(), &key);
    }

    #[test]
    fn test_recovers_marker_dropped_ephemeral() {
        let (private, public) = keypair();
        let key = [0x2du8; 32];
        let parts = ecies::wrap(&public, &key).unwrap();
        let mut slot = slot_from_parts("a", &parts);
        // Drop the leading 0x04 marker: 130 hex chars -> 128.
        slot.encrypted_key.ephem_public_key =
            slot.encrypted_key.ephem_public_key[2..].to_string();
        let env = envelope_with_slots(vec![slot]);
        let recovered = recover_symmetric_key(&env, &private).unwrap();
        assert_eq!(recovered.as_ref(), &key);
    }

    #[test]
    fn test_recovers_hex_text_wrapped_key() {
        let (private, public) = keypair();
        let key = [0x2eu8; 32];
        // Wrap the textual hex form instead of the raw bytes.
        let hex_text = hex::encode(key);
        let parts = wrap_arbitrary(&public, hex_text.as_bytes());
        let env = envelope_with_slots(vec![slot_from_parts("a", &parts)]);
        let recovered = recover_symmetric_key(&env, &private).unwrap();
        assert_eq!(recovered.as_ref(), &key);
    }

    #[test]
    fn test_recovers_base64_text_wrapped_key() {
        let (private, public) = keypair();
        let key = [0x2fu8; 32];
        let b64 = base64::engine::general_purpose::STANDARD.encode(key);
        let parts = wrap_arbitrary(&public, b64.as_bytes());
        let env = envelope_with_slots(vec![slot_from_parts("a", &parts)]);
        let recovered = recover_symmetric_key(&env, &private).unwrap();
        assert_eq!(recovered.as_ref(), &key);
    }

    #[test]
    fn test_skips_foreign_slot_and_uses_own() {
        let (private, public) = keypair();
        let (_, other_public) = keypair();
        let key = [0x30u8; 32];
        let foreign = ecies::wrap(&other_public, &key).unwrap();
        let mine = ecies::wrap(&public, &key).unwrap();
        let env = envelope_with_slots(vec![
            slot_from_parts("other", &foreign),
            slot_from_parts("me", &mine),
        ]);
        let recovered = recover_symmetric_key(&env, &private).unwrap();
        assert_eq!(recovered.as_ref(), &key);
    }

    #[test]
    fn test_exhaustion_aggregates_attempts() {
        let (_, public) = keypair();
        let (outsider, _) = keypair();
        let parts = ecies::wrap(&public, &[0x31u8; 32]).unwrap();
        let env = envelope_with_slots(vec![slot_from_parts("a", &parts)]);
        let (result, report) = recover_symmetric_key_traced(&env, &outsider);
        match result {
            Err(DecryptionError::KeyRecoveryFailed { attempts }) => {
                assert_eq!(attempts, report.attempts.len());
                assert!(attempts >= 2); // at least both backends tried
            }
            other => panic!("expected KeyRecoveryFailed, got {other:?}"),
        }
        assert!(!report.succeeded());
        assert!(report.attempts.iter().all(|a| a.failure.is_some()));
    }

    #[test]
    fn test_no_slots_is_no_matching_recipient() {
        let (private, _) = keypair();
        let env = envelope_with_slots(vec![]);
        assert!(matches!(
            recover_symmetric_key(&env, &private),
            Err(DecryptionError::NoMatchingRecipient)
        ));
    }

    #[test]
    fn test_identical_interpretations_counted_once() {
        let (_, public) = keypair();
        let (outsider, _) = keypair();
        // Canonical lowercase fields: as-is, normalized, and marker-repaired
        // all read identically, so each backend contributes one attempt.
        let parts = ecies::wrap(&public, &[0x32u8; 32]).unwrap();
        let env = envelope_with_slots(vec![slot_from_parts("a", &parts)]);
        let (_, report) = recover_symmetric_key_traced(&env, &outsider);
        assert_eq!(report.attempts.len(), 2);
    }

    /// CBC+HMAC wrap of an arbitrary-length payload, for foreign-producer
    /// fixtures whose wrapped value is key text rather than key bytes.
    fn wrap_arbitrary(recipient: &PublicKey, payload: &[u8]) -> EciesParts {
        use aes::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
        use hmac::{Hmac, Mac};
        use rand::RngCore;
        use sha2::{Digest, Sha512};

        let ephemeral = PrivateKey::random();
        let mut iv = vec![0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let point = recipient.to_k256().unwrap();
        let shared = k256::ecdh::diffie_hellman(
            ephemeral.secret().to_nonzero_scalar(),
            point.as_affine(),
        );
        let digest = Sha512::digest(shared.raw_secret_bytes());
        let (enc_key, mac_key) = digest.split_at(32);

        let ciphertext = cbc::Encryptor::<aes::Aes256>::new_from_slices(enc_key, &iv)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(payload);

        let ephemeral_public_key = *ephemeral.public_key().as_bytes();
        let mut mac = Hmac::<sha2::Sha256>::new_from_slice(mac_key).unwrap();
        mac.update(&iv);
        mac.update(&ephemeral_public_key);
        mac.update(&ciphertext);

        EciesParts {
            ephemeral_public_key,
            iv,
            ciphertext,
            mac: mac.finalize().into_bytes().to_vec(),
        }
    }
}

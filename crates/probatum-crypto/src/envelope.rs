//! # Hybrid Envelope Codec
//!
//! Turns plaintext into a self-describing ciphertext envelope for N
//! recipients: one fresh 32-byte symmetric key encrypts the payload with
//! AES-256-GCM, and that key is independently wrapped to every recipient
//! via ECIES. Each `RecipientKeySlot` is independently decryptable; exactly
//! one successful unwrap is needed to recover the payload.
//!
//! Envelopes are immutable once produced — the canonical serialization of
//! this structure is what gets digest-bound and anchored externally, so any
//! post-hoc mutation invalidates the bound digest.
//!
//! ## Wire Form
//!
//! All byte fields render as lowercase hex without prefix. Wrapped-key
//! fields are carried as strings on the wire because foreign producers emit
//! `0x`-prefixed or uppercase hex; the fallback resolver owns decoding them.

use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce, Tag};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use probatum_core::error::{DecryptionError, EncryptionError};
use probatum_core::hexutil::hex_bytes;

use crate::ecies::{self, EciesParts};
use crate::keys::{PrivateKey, PublicKey};
use crate::resolver;

/// Envelope format version, fixed for all envelopes this codec produces.
pub const ENVELOPE_VERSION: u32 = 1;

/// Default plaintext size ceiling (defensive limit, not protocol).
pub const DEFAULT_MAX_PLAINTEXT: usize = 10 * 1024 * 1024;

/// AES-GCM parameters of the payload encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AesParams {
    /// 12-byte GCM nonce, fresh per envelope.
    #[serde(with = "hex_bytes")]
    pub iv: Vec<u8>,
    /// 16-byte GCM authentication tag over the payload.
    #[serde(with = "hex_bytes")]
    pub tag: Vec<u8>,
}

/// One recipient's wrapped copy of the symmetric key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientKeySlot {
    /// Recipient account address (40 lowercase hex chars) or opaque id.
    pub recipient: String,
    /// The ECIES-wrapped symmetric key.
    pub encrypted_key: WrappedKey,
}

/// Wire form of an ECIES ciphertext: hex text fields, kept as strings to
/// tolerate foreign producers' encoding divergence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedKey {
    /// Ephemeral public key (uncompressed, 130 hex chars from this producer).
    pub ephem_public_key: String,
    /// Cipher iv.
    pub iv: String,
    /// Encrypted key bytes.
    pub ciphertext: String,
    /// HMAC tag (CBC+HMAC backend) or GCM tag (legacy backend).
    pub mac: String,
}

impl WrappedKey {
    /// Render ECIES parts in canonical lowercase hex.
    pub fn from_parts(parts: &EciesParts) -> Self {
        Self {
            ephem_public_key: hex::encode(parts.ephemeral_public_key),
            iv: hex::encode(&parts.iv),
            ciphertext: hex::encode(&parts.ciphertext),
            mac: hex::encode(&parts.mac),
        }
    }
}

/// A hybrid ciphertext envelope. Owned exclusively by the caller who
/// created it; immutable once produced except for serialization form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Format version ([`ENVELOPE_VERSION`]).
    pub version: u32,
    /// AES-256-GCM payload ciphertext.
    #[serde(with = "hex_bytes")]
    pub ciphertext: Vec<u8>,
    /// Payload cipher parameters.
    pub aes_params: AesParams,
    /// One independently decryptable slot per recipient.
    pub recipients: Vec<RecipientKeySlot>,
}

/// Encryption knobs. Only the plaintext ceiling is configurable.
#[derive(Debug, Clone)]
pub struct EncryptOptions {
    /// Reject plaintexts larger than this many bytes.
    pub max_plaintext: usize,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            max_plaintext: DEFAULT_MAX_PLAINTEXT,
        }
    }
}

/// A recipient whose key slot could not be produced.
#[derive(Debug, Clone)]
pub struct SkippedRecipient {
    /// The recipient's account address (or its raw hex if unparseable).
    pub recipient: String,
    /// Why the wrap failed.
    pub reason: String,
}

/// Result of envelope encryption: the envelope plus any recipients that
/// had to be omitted. One recipient's failure does not abort the whole
/// operation.
#[derive(Debug)]
pub struct EncryptOutcome {
    /// The produced envelope.
    pub envelope: Envelope,
    /// Recipients omitted from the envelope, with reasons.
    pub skipped: Vec<SkippedRecipient>,
}

/// Encrypt `plaintext` to every recipient with default options.
pub fn encrypt(
    plaintext: &[u8],
    recipients: &[PublicKey],
) -> Result<EncryptOutcome, EncryptionError> {
    encrypt_with_options(plaintext, recipients, &EncryptOptions::default())
}

/// Encrypt `plaintext` to every recipient.
///
/// Generates one fresh 32-byte symmetric key and one fresh 12-byte nonce,
/// encrypts the payload with AES-256-GCM, then wraps the key per recipient.
/// Pure function of inputs plus randomness; no shared state.
///
/// # Errors
///
/// - `EncryptionError::PlaintextTooLarge` when the ceiling is exceeded.
/// - `EncryptionError::NoRecipients` when no slot could be produced at all.
///   Individual wrap failures are reported in `EncryptOutcome::skipped`.
pub fn encrypt_with_options(
    plaintext: &[u8],
    recipients: &[PublicKey],
    options: &EncryptOptions,
) -> Result<EncryptOutcome, EncryptionError> {
    if plaintext.len() > options.max_plaintext {
        return Err(EncryptionError::PlaintextTooLarge {
            size: plaintext.len(),
            limit: options.max_plaintext,
        });
    }

    let mut symmetric_key = Zeroizing::new([0u8; 32]);
    rand::rngs::OsRng.fill_bytes(symmetric_key.as_mut());
    let mut iv = vec![0u8; 12];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let cipher = Aes256Gcm::new_from_slice(symmetric_key.as_ref())
        .map_err(|e| EncryptionError::Cipher(e.to_string()))?;
    let mut buf = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buf)
        .map_err(|e| EncryptionError::Cipher(e.to_string()))?;

    let mut slots = Vec::with_capacity(recipients.len());
    let mut skipped = Vec::new();
    for public in recipients {
        let address = public.address().to_hex();
        match ecies::wrap(public, &symmetric_key) {
            Ok(parts) => slots.push(RecipientKeySlot {
                recipient: address,
                encrypted_key: WrappedKey::from_parts(&parts),
            }),
            Err(e) => {
                tracing::warn!(recipient = %address, error = %e, "recipient key wrap failed; slot omitted");
                skipped.push(SkippedRecipient {
                    recipient: address,
                    reason: e.to_string(),
                });
            }
        }
    }
    if slots.is_empty() {
        return Err(EncryptionError::NoRecipients);
    }

    Ok(EncryptOutcome {
        envelope: Envelope {
            version: ENVELOPE_VERSION,
            ciphertext: buf,
            aes_params: AesParams {
                iv,
                tag: tag.to_vec(),
            },
            recipients: slots,
        },
        skipped,
    })
}

/// Decrypt an envelope with one recipient's private key.
///
/// Delegates key recovery to the fallback resolver, then opens the payload
/// with AES-256-GCM.
///
/// # Errors
///
/// - `DecryptionError::NoMatchingRecipient` for an envelope with no slots.
/// - `DecryptionError::KeyRecoveryFailed` when every resolver strategy is
///   exhausted (wrong key or recipient).
/// - `DecryptionError::AuthTagMismatch` when a key was recovered but the
///   payload tag check fails (tampered ciphertext).
pub fn decrypt(envelope: &Envelope, private: &PrivateKey) -> Result<Vec<u8>, DecryptionError> {
    if envelope.recipients.is_empty() {
        return Err(DecryptionError::NoMatchingRecipient);
    }
    let symmetric_key = resolver::recover_symmetric_key(envelope, private)?;
    open_payload(envelope, &symmetric_key)
}

/// AES-GCM payload decryption with an already-recovered symmetric key.
pub(crate) fn open_payload(
    envelope: &Envelope,
    symmetric_key: &[u8; 32],
) -> Result<Vec<u8>, DecryptionError> {
    if envelope.aes_params.iv.len() != 12 {
        return Err(DecryptionError::MalformedEnvelope(format!(
            "payload iv must be 12 bytes, got {}",
            envelope.aes_params.iv.len()
        )));
    }
    if envelope.aes_params.tag.len() != 16 {
        return Err(DecryptionError::MalformedEnvelope(format!(
            "payload tag must be 16 bytes, got {}",
            envelope.aes_params.tag.len()
        )));
    }
    let cipher = Aes256Gcm::new_from_slice(symmetric_key)
        .map_err(|e| DecryptionError::MalformedEnvelope(e.to_string()))?;
    let mut buf = envelope.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&envelope.aes_params.iv),
            b"",
            &mut buf,
            Tag::from_slice(&envelope.aes_params.tag),
        )
        .map_err(|_| DecryptionError::AuthTagMismatch)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> (PrivateKey, PublicKey) {
        let private = PrivateKey::random();
        let public = private.public_key();
        (private, public)
    }

    #[test]
    fn test_roundtrip_single_recipient() {
        let (private, public) = keypair();
        let outcome = encrypt(b"the tenant breached clause 4", &[public]).unwrap();
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.envelope.version, ENVELOPE_VERSION);
        let plain = decrypt(&outcome.envelope, &private).unwrap();
        assert_eq!(plain, b"the tenant breached clause 4");
    }

    #[test]
    fn test_every_recipient_can_decrypt() {
        let (priv_a, pub_a) = keypair();
        let (priv_b, pub_b) = keypair();
        let (priv_c, pub_c) = keypair();
        let outcome = encrypt(b"shared evidence", &[pub_a, pub_b, pub_c]).unwrap();
        assert_eq!(outcome.envelope.recipients.len(), 3);
        for private in [&priv_a, &priv_b, &priv_c] {
            assert_eq!(decrypt(&outcome.envelope, private).unwrap(), b"shared evidence");
        }
    }

    #[test]
    fn test_uninvolved_key_cannot_decrypt() {
        let (_, public) = keypair();
        let (outsider, _) = keypair();
        let outcome = encrypt(b"private", &[public]).unwrap();
        assert!(matches!(
            decrypt(&outcome.envelope, &outsider),
            Err(DecryptionError::KeyRecoveryFailed { .. })
        ));
    }

    #[test]
    fn test_ciphertext_tamper_is_auth_tag_mismatch() {
        let (private, public) = keypair();
        let mut outcome = encrypt(b"untampered", &[public]).unwrap();
        outcome.envelope.ciphertext[0] ^= 0x01;
        assert!(matches!(
            decrypt(&outcome.envelope, &private),
            Err(DecryptionError::AuthTagMismatch)
        ));
    }

    #[test]
    fn test_tag_tamper_is_auth_tag_mismatch() {
        let (private, public) = keypair();
        let mut outcome = encrypt(b"untampered", &[public]).unwrap();
        outcome.envelope.aes_params.tag[15] ^= 0x80;
        assert!(matches!(
            decrypt(&outcome.envelope, &private),
            Err(DecryptionError::AuthTagMismatch)
        ));
    }

    #[test]
    fn test_empty_recipient_list_rejected() {
        assert!(matches!(
            encrypt(b"x", &[]),
            Err(EncryptionError::NoRecipients)
        ));
    }

    #[test]
    fn test_no_slots_on_decrypt() {
        let (private, public) = keypair();
        let mut outcome = encrypt(b"x", &[public]).unwrap();
        outcome.envelope.recipients.clear();
        assert!(matches!(
            decrypt(&outcome.envelope, &private),
            Err(DecryptionError::NoMatchingRecipient)
        ));
    }

    #[test]
    fn test_plaintext_ceiling() {
        let (_, public) = keypair();
        let options = EncryptOptions { max_plaintext: 8 };
        let result = encrypt_with_options(b"nine bytes", &[public], &options);
        assert!(matches!(
            result,
            Err(EncryptionError::PlaintextTooLarge { size: 10, limit: 8 })
        ));
    }

    #[test]
    fn test_fresh_key_and_nonce_per_envelope() {
        let (_, public) = keypair();
        let a = encrypt(b"same plaintext", &[public.clone()]).unwrap().envelope;
        let b = encrypt(b"same plaintext", &[public]).unwrap().envelope;
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_ne!(a.aes_params.iv, b.aes_params.iv);
    }

    #[test]
    fn test_wire_form_is_lowercase_hex_camel_case() {
        let (_, public) = keypair();
        let envelope = encrypt(b"wire", &[public]).unwrap().envelope;
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json.get("aesParams").is_some());
        let slot = &json["recipients"][0]["encryptedKey"];
        let ephem = slot["ephemPublicKey"].as_str().unwrap();
        assert_eq!(ephem.len(), 130);
        assert!(ephem.starts_with("04"));
        assert_eq!(ephem, ephem.to_lowercase());
        let back: Envelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn test_recipient_slot_carries_account_address() {
        let (_, public) = keypair();
        let expected = public.address().to_hex();
        let envelope = encrypt(b"addr", &[public]).unwrap().envelope;
        assert_eq!(envelope.recipients[0].recipient, expected);
    }
}

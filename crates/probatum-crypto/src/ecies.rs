//! # ECIES Key Wrapping over secp256k1
//!
//! Wraps a 32-byte symmetric key to a recipient public key. Two backends
//! exist because the platform's historical producers disagree on KDF and
//! MAC conventions:
//!
//! - **CBC+HMAC** (primary, what this crate produces): ECDH x-coordinate →
//!   SHA-512 → (AES-256-CBC key, HMAC-SHA256 key); 16-byte iv; the `mac`
//!   field is `HMAC-SHA256(macKey, iv ‖ ephemeralPublicKey ‖ ciphertext)`.
//! - **Legacy GCM** (alternate unwrap path): full uncompressed shared-point
//!   encoding → SHA-256 over its trailing 32 bytes → AES-256-GCM key;
//!   12-byte iv; the `mac` field carries the 16-byte GCM tag.
//!
//! Both backends use a fresh ephemeral key per wrap. The decryption
//! fallback resolver decides which backend to try against a given slot;
//! nothing in the envelope announces the producer's convention.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce, Tag};
use hmac::{Hmac, Mac};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::RngCore;
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::keys::{PrivateKey, PublicKey};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Failure of a single ECIES wrap or unwrap attempt.
///
/// Unwrap failures are resolver-internal: they are recorded per attempt and
/// aggregated, never surfaced to callers individually.
#[derive(Error, Debug)]
pub enum EciesError {
    /// The slot's MAC does not authenticate its fields under the derived key.
    #[error("mac verification failed")]
    MacMismatch,

    /// A field has a length no known producer emits.
    #[error("invalid field length: {0}")]
    Length(String),

    /// The ephemeral key is not a valid curve point.
    #[error("invalid ephemeral key: {0}")]
    Point(String),

    /// The underlying cipher operation failed.
    #[error("cipher failure: {0}")]
    Cipher(String),
}

/// The raw byte fields of one wrapped-key slot.
///
/// `ephemeral_public_key` is always held uncompressed (65 bytes); the
/// envelope layer renders these as lowercase hex on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EciesParts {
    /// Fresh uncompressed ephemeral public key.
    pub ephemeral_public_key: [u8; 65],
    /// Cipher iv: 16 bytes (CBC+HMAC) or 12 bytes (legacy GCM).
    pub iv: Vec<u8>,
    /// Encrypted symmetric-key bytes.
    pub ciphertext: Vec<u8>,
    /// HMAC-SHA256 tag (32 bytes) or GCM tag (16 bytes).
    pub mac: Vec<u8>,
}

/// ECDH x-coordinate between a private scalar and a public point.
fn shared_x(private: &PrivateKey, public: &PublicKey) -> Result<Zeroizing<[u8; 32]>, EciesError> {
    let point = public.to_k256().map_err(|e| EciesError::Point(e.to_string()))?;
    let shared = k256::ecdh::diffie_hellman(
        private.secret().to_nonzero_scalar(),
        point.as_affine(),
    );
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(shared.raw_secret_bytes());
    Ok(out)
}

/// Full uncompressed SEC1 encoding (65 bytes) of the ECDH shared point.
fn shared_point(private: &PrivateKey, public: &PublicKey) -> Result<Zeroizing<[u8; 65]>, EciesError> {
    let point = public.to_k256().map_err(|e| EciesError::Point(e.to_string()))?;
    let scalar = private.secret().to_nonzero_scalar();
    let product = k256::ProjectivePoint::from(*point.as_affine()) * *scalar;
    let encoded = product.to_affine().to_encoded_point(false);
    let mut out = Zeroizing::new([0u8; 65]);
    out.copy_from_slice(encoded.as_bytes());
    Ok(out)
}

/// SHA-512 KDF of the CBC+HMAC backend: first 32 bytes encrypt, last 32 MAC.
fn kdf_cbc_hmac(x: &[u8; 32]) -> (Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>) {
    let digest = Sha512::digest(x);
    let mut enc = Zeroizing::new([0u8; 32]);
    let mut mac = Zeroizing::new([0u8; 32]);
    enc.copy_from_slice(&digest[..32]);
    mac.copy_from_slice(&digest[32..]);
    (enc, mac)
}

/// KDF of the legacy GCM backend: SHA-256 over the trailing 32 bytes of
/// the uncompressed shared-point encoding.
fn kdf_legacy_gcm(shared: &[u8; 65]) -> Zeroizing<[u8; 32]> {
    let digest = Sha256::digest(&shared[33..]);
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&digest);
    out
}

fn hmac_tag(
    mac_key: &[u8; 32],
    iv: &[u8],
    ephemeral: &[u8; 65],
    ciphertext: &[u8],
) -> Result<[u8; 32], EciesError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key)
        .map_err(|e| EciesError::Cipher(e.to_string()))?;
    mac.update(iv);
    mac.update(ephemeral);
    mac.update(ciphertext);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Wrap 32 symmetric-key bytes to `recipient` with the CBC+HMAC backend.
///
/// Uses a fresh ephemeral key and a fresh 16-byte iv from the OS entropy
/// source on every call; ephemeral reuse across wraps is a protocol
/// violation, never an optimization.
pub fn wrap(recipient: &PublicKey, key_bytes: &[u8; 32]) -> Result<EciesParts, EciesError> {
    let ephemeral = PrivateKey::random();
    let mut iv = vec![0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let x = shared_x(&ephemeral, recipient)?;
    let (enc_key, mac_key) = kdf_cbc_hmac(&x);

    let ciphertext = Aes256CbcEnc::new_from_slices(enc_key.as_ref(), &iv)
        .map_err(|e| EciesError::Cipher(e.to_string()))?
        .encrypt_padded_vec_mut::<Pkcs7>(key_bytes);

    let ephemeral_public_key = *ephemeral.public_key().as_bytes();
    let mac = hmac_tag(&mac_key, &iv, &ephemeral_public_key, &ciphertext)?;

    Ok(EciesParts {
        ephemeral_public_key,
        iv,
        ciphertext,
        mac: mac.to_vec(),
    })
}

/// Unwrap a CBC+HMAC slot, returning the recovered plaintext bytes.
///
/// The result may be the raw 32 key bytes or a textual key encoding from a
/// foreign producer; interpreting it is the resolver's job.
pub fn unwrap(parts: &EciesParts, recipient: &PrivateKey) -> Result<Zeroizing<Vec<u8>>, EciesError> {
    if parts.iv.len() != 16 {
        return Err(EciesError::Length(format!(
            "cbc iv must be 16 bytes, got {}",
            parts.iv.len()
        )));
    }
    if parts.mac.len() != 32 {
        return Err(EciesError::Length(format!(
            "hmac tag must be 32 bytes, got {}",
            parts.mac.len()
        )));
    }
    let ephemeral = PublicKey::from_bytes(&parts.ephemeral_public_key)
        .map_err(|e| EciesError::Point(e.to_string()))?;
    let x = shared_x(recipient, &ephemeral)?;
    let (enc_key, mac_key) = kdf_cbc_hmac(&x);

    // Constant-time MAC check before touching the ciphertext.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key.as_ref())
        .map_err(|e| EciesError::Cipher(e.to_string()))?;
    mac.update(&parts.iv);
    mac.update(&parts.ephemeral_public_key);
    mac.update(&parts.ciphertext);
    mac.verify_slice(&parts.mac)
        .map_err(|_| EciesError::MacMismatch)?;

    let plaintext = Aes256CbcDec::new_from_slices(enc_key.as_ref(), &parts.iv)
        .map_err(|e| EciesError::Cipher(e.to_string()))?
        .decrypt_padded_vec_mut::<Pkcs7>(&parts.ciphertext)
        .map_err(|e| EciesError::Cipher(e.to_string()))?;
    Ok(Zeroizing::new(plaintext))
}

/// Wrap with the legacy GCM backend.
///
/// Only foreign envelopes carry this convention; this producer exists so
/// the alternate unwrap path stays tested against real fixtures.
pub fn wrap_legacy_gcm(
    recipient: &PublicKey,
    key_bytes: &[u8; 32],
) -> Result<EciesParts, EciesError> {
    let ephemeral = PrivateKey::random();
    let mut iv = vec![0u8; 12];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let shared = shared_point(&ephemeral, recipient)?;
    let key = kdf_legacy_gcm(&shared);

    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|e| EciesError::Cipher(e.to_string()))?;
    let mut buf = key_bytes.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buf)
        .map_err(|e| EciesError::Cipher(e.to_string()))?;

    Ok(EciesParts {
        ephemeral_public_key: *ephemeral.public_key().as_bytes(),
        iv,
        ciphertext: buf,
        mac: tag.to_vec(),
    })
}

/// Unwrap with the legacy GCM backend (resolver fallback step).
pub fn unwrap_legacy_gcm(
    parts: &EciesParts,
    recipient: &PrivateKey,
) -> Result<Zeroizing<Vec<u8>>, EciesError> {
    if parts.iv.len() != 12 {
        return Err(EciesError::Length(format!(
            "gcm iv must be 12 bytes, got {}",
            parts.iv.len()
        )));
    }
    if parts.mac.len() != 16 {
        return Err(EciesError::Length(format!(
            "gcm tag must be 16 bytes, got {}",
            parts.mac.len()
        )));
    }
    let ephemeral = PublicKey::from_bytes(&parts.ephemeral_public_key)
        .map_err(|e| EciesError::Point(e.to_string()))?;
    let shared = shared_point(recipient, &ephemeral)?;
    let key = kdf_legacy_gcm(&shared);

    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|e| EciesError::Cipher(e.to_string()))?;
    let mut buf = parts.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&parts.iv),
            b"",
            &mut buf,
            Tag::from_slice(&parts.mac),
        )
        .map_err(|_| EciesError::MacMismatch)?;
    Ok(Zeroizing::new(buf))
}

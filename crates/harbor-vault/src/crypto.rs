// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Record encryption — PBKDF2-HMAC-SHA256 key derivation plus AES-256-GCM
// sealing, both via `ring`.
//
// Every encrypt call draws a fresh random salt and nonce, derives a
// per-operation key from the caller's capability key, and seals with an
// AEAD so tampering is detected at open time. Wrong key, bit flips, and
// truncation are indistinguishable to the caller: all of them surface as
// `DecryptionFailed` with no further detail.

use std::num::NonZeroU32;

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, instrument};

use harbor_core::error::{HarborError, Result};
use harbor_core::types::EncryptedBlob;

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// KDF salt length in bytes (128 bits), freshly drawn per encryption.
pub const SALT_LEN: usize = 16;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Floor on the PBKDF2 iteration count.
pub const MIN_KDF_ITERATIONS: u32 = 10_000;

/// Derive a 256-bit key from `secret` and `salt`.
///
/// Deterministic for identical inputs. Rejects empty key material and
/// iteration counts below [`MIN_KDF_ITERATIONS`].
pub fn derive_key(secret: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; KEY_LEN]> {
    if secret.is_empty() {
        return Err(HarborError::InvalidKeyMaterial("empty secret".into()));
    }
    if salt.is_empty() {
        return Err(HarborError::InvalidKeyMaterial("empty salt".into()));
    }
    let iterations = NonZeroU32::new(iterations)
        .filter(|n| n.get() >= MIN_KDF_ITERATIONS)
        .ok_or_else(|| {
            HarborError::InvalidKeyMaterial(format!(
                "iteration count below minimum of {MIN_KDF_ITERATIONS}"
            ))
        })?;

    let mut key = [0u8; KEY_LEN];
    pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, iterations, salt, secret, &mut key);
    Ok(key)
}

/// Encrypt `plaintext` under a per-operation key derived from `key`.
///
/// Returns the ciphertext (with the GCM tag appended) together with the
/// nonce and salt needed to open it. The nonce is never reused: both it and
/// the salt come fresh from the OS CSPRNG on every call.
#[instrument(skip_all, fields(plaintext_len = plaintext.len()))]
pub fn encrypt(plaintext: &[u8], key: &[u8], iterations: u32) -> Result<EncryptedBlob> {
    let rng = SystemRandom::new();

    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| HarborError::Encryption("salt generation failed".into()))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| HarborError::Encryption("nonce generation failed".into()))?;

    let derived = derive_key(key, &salt, iterations)?;
    let unbound = UnboundKey::new(&AES_256_GCM, &derived)
        .map_err(|_| HarborError::Encryption("key setup failed".into()))?;
    let sealing = LessSafeKey::new(unbound);

    let mut in_out = plaintext.to_vec();
    sealing
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| HarborError::Encryption("sealing failed".into()))?;

    debug!(ciphertext_len = in_out.len(), "encryption complete");
    Ok(EncryptedBlob {
        ciphertext: in_out,
        iv: nonce_bytes.to_vec(),
        salt: salt.to_vec(),
    })
}

/// Open a blob sealed by [`encrypt`].
///
/// Integrity is verified before any plaintext is returned; a blob whose
/// ciphertext, nonce, or salt has been altered fails here rather than
/// decrypting to garbage.
#[instrument(skip_all, fields(ciphertext_len = blob.ciphertext.len()))]
pub fn decrypt(blob: &EncryptedBlob, key: &[u8], iterations: u32) -> Result<Vec<u8>> {
    let derived =
        derive_key(key, &blob.salt, iterations).map_err(|_| HarborError::DecryptionFailed)?;
    let unbound =
        UnboundKey::new(&AES_256_GCM, &derived).map_err(|_| HarborError::DecryptionFailed)?;
    let opening = LessSafeKey::new(unbound);

    let nonce =
        Nonce::try_assume_unique_for_key(&blob.iv).map_err(|_| HarborError::DecryptionFailed)?;

    let mut in_out = blob.ciphertext.clone();
    let plaintext = opening
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| HarborError::DecryptionFailed)?;

    debug!(plaintext_len = plaintext.len(), "decryption complete");
    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITERS: u32 = MIN_KDF_ITERATIONS;

    fn user_key() -> [u8; 32] {
        [0x5Au8; 32]
    }

    #[test]
    fn round_trip() {
        let plaintext = b"a sensitive incident report";
        let blob = encrypt(plaintext, &user_key(), ITERS).expect("encrypt failed");

        assert_ne!(&blob.ciphertext[..], &plaintext[..]);
        assert_eq!(blob.iv.len(), NONCE_LEN);
        assert_eq!(blob.salt.len(), SALT_LEN);

        let decrypted = decrypt(&blob, &user_key(), ITERS).expect("decrypt failed");
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn empty_plaintext_round_trip() {
        let blob = encrypt(b"", &user_key(), ITERS).expect("encrypt failed");
        let decrypted = decrypt(&blob, &user_key(), ITERS).expect("decrypt failed");
        assert!(decrypted.is_empty());
    }

    #[test]
    fn fresh_salt_and_nonce_every_call() {
        let a = encrypt(b"same input", &user_key(), ITERS).unwrap();
        let b = encrypt(b"same input", &user_key(), ITERS).unwrap();

        assert_ne!(a.salt, b.salt, "salt must not repeat across calls");
        assert_ne!(a.iv, b.iv, "nonce must not repeat across calls");
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn wrong_key_fails() {
        let blob = encrypt(b"secret", &user_key(), ITERS).unwrap();
        let wrong = [0xA5u8; 32];
        let result = decrypt(&blob, &wrong, ITERS);
        assert!(matches!(result, Err(HarborError::DecryptionFailed)));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let mut blob = encrypt(b"secret", &user_key(), ITERS).unwrap();
        for i in 0..blob.ciphertext.len() {
            let mut tampered = blob.clone();
            tampered.ciphertext[i] ^= 0x01;
            assert!(
                matches!(decrypt(&tampered, &user_key(), ITERS), Err(HarborError::DecryptionFailed)),
                "flipping ciphertext byte {i} must fail decryption"
            );
        }
        // Truncation fails too.
        blob.ciphertext.pop();
        assert!(decrypt(&blob, &user_key(), ITERS).is_err());
    }

    #[test]
    fn tampered_nonce_fails() {
        let blob = encrypt(b"secret", &user_key(), ITERS).unwrap();
        for i in 0..blob.iv.len() {
            let mut tampered = blob.clone();
            tampered.iv[i] ^= 0x01;
            assert!(decrypt(&tampered, &user_key(), ITERS).is_err());
        }
    }

    #[test]
    fn tampered_salt_fails() {
        let blob = encrypt(b"secret", &user_key(), ITERS).unwrap();
        for i in 0..blob.salt.len() {
            let mut tampered = blob.clone();
            tampered.salt[i] ^= 0x01;
            assert!(decrypt(&tampered, &user_key(), ITERS).is_err());
        }
    }

    #[test]
    fn derive_is_deterministic() {
        let a = derive_key(b"secret", b"0123456789abcdef", ITERS).unwrap();
        let b = derive_key(b"secret", b"0123456789abcdef", ITERS).unwrap();
        assert_eq!(a, b);

        let c = derive_key(b"secret", b"fedcba9876543210", ITERS).unwrap();
        assert_ne!(a, c, "different salts must give different keys");
    }

    #[test]
    fn derive_rejects_bad_inputs() {
        assert!(matches!(
            derive_key(b"", b"salt-bytes", ITERS),
            Err(HarborError::InvalidKeyMaterial(_))
        ));
        assert!(matches!(
            derive_key(b"secret", b"", ITERS),
            Err(HarborError::InvalidKeyMaterial(_))
        ));
        assert!(matches!(
            derive_key(b"secret", b"salt-bytes", 9_999),
            Err(HarborError::InvalidKeyMaterial(_))
        ));
        assert!(matches!(
            derive_key(b"secret", b"salt-bytes", 0),
            Err(HarborError::InvalidKeyMaterial(_))
        ));
    }

    #[test]
    fn decrypt_rejects_malformed_nonce() {
        let mut blob = encrypt(b"secret", &user_key(), ITERS).unwrap();
        blob.iv.truncate(4);
        assert!(matches!(
            decrypt(&blob, &user_key(), ITERS),
            Err(HarborError::DecryptionFailed)
        ));
    }
}

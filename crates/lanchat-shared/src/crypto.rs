use std::sync::Mutex;

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::constants::{
    ARGON2_ITERATIONS, ARGON2_MEMORY_KIB, ARGON2_PARALLELISM, KDF_CONTEXT_ROOM_FINGERPRINT,
    KDF_CONTEXT_ROOM_KEY, NONCE_SIZE, ROOM_KDF_SALT, SYMMETRIC_KEY_SIZE,
};
use crate::error::CryptoError;
use crate::types::RoomFingerprint;

pub type SymmetricKey = [u8; SYMMETRIC_KEY_SIZE];

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

// Returns nonce || ciphertext (24 bytes nonce prepended)
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce_bytes = generate_nonce();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

pub fn decrypt(key: &SymmetricKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < NONCE_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Stretch a room passphrase with Argon2id. Every derived room value starts
/// from this secret, so guessing a passphrase from a broadcast fingerprint
/// costs one Argon2id run per guess.
pub fn stretch_passphrase(passphrase: &str) -> Result<SymmetricKey, CryptoError> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(SYMMETRIC_KEY_SIZE),
    )
    .map_err(|e| CryptoError::KeyDerivationFailed(format!("Invalid Argon2 params: {e}")))?;

    let mut secret = [0u8; SYMMETRIC_KEY_SIZE];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(passphrase.as_bytes(), ROOM_KDF_SALT, &mut secret)
        .map_err(|e| CryptoError::KeyDerivationFailed(format!("Argon2id failed: {e}")))?;
    Ok(secret)
}

/// BLAKE3 subkey of a stretched secret, separated by `context`.
pub fn derive_subkey(secret: &SymmetricKey, context: &str) -> SymmetricKey {
    blake3::derive_key(context, secret)
}

/// Room identifier announced to the relay. Uses a different KDF context than
/// the room key so the fingerprint reveals nothing about the key.
///
/// The empty passphrase maps to the empty fingerprint (public room), not to
/// the digest of the empty string.
pub fn room_fingerprint(passphrase: &str) -> Result<RoomFingerprint, CryptoError> {
    if passphrase.is_empty() {
        return Ok(RoomFingerprint::public());
    }
    let secret = stretch_passphrase(passphrase)?;
    let digest = derive_subkey(&secret, KDF_CONTEXT_ROOM_FINGERPRINT);
    Ok(RoomFingerprint(hex::encode(digest)))
}

/// Key that seals messages for the room joined with `passphrase`.
pub fn room_key(passphrase: &str) -> Result<SymmetricKey, CryptoError> {
    let secret = stretch_passphrase(passphrase)?;
    Ok(derive_subkey(&secret, KDF_CONTEXT_ROOM_KEY))
}

/// Symmetric cipher keyed by a room passphrase, operating on text frames.
pub trait CryptoProvider {
    fn encrypt(&self, plaintext: &str, passphrase: &str) -> Result<String, CryptoError>;
    fn decrypt(&self, ciphertext: &str, passphrase: &str) -> Result<String, CryptoError>;
}

/// XChaCha20-Poly1305 with an Argon2id/BLAKE3 room key; ciphertext travels
/// as standard base64 of `nonce || ciphertext`.
///
/// The key for the most recent passphrase is kept, so only a room switch
/// pays for stretching.
#[derive(Debug, Default)]
pub struct PassphraseCipher {
    cached: Mutex<Option<(String, SymmetricKey)>>,
}

impl PassphraseCipher {
    pub fn new() -> Self {
        Self::default()
    }

    fn key_for(&self, passphrase: &str) -> Result<SymmetricKey, CryptoError> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| CryptoError::KeyDerivationFailed("key cache poisoned".into()))?;

        if let Some((cached_pass, key)) = cached.as_ref() {
            if cached_pass == passphrase {
                return Ok(*key);
            }
        }
        let key = room_key(passphrase)?;
        *cached = Some((passphrase.to_string(), key));
        Ok(key)
    }
}

impl CryptoProvider for PassphraseCipher {
    fn encrypt(&self, plaintext: &str, passphrase: &str) -> Result<String, CryptoError> {
        let key = self.key_for(passphrase)?;
        let sealed = encrypt(&key, plaintext.as_bytes())?;
        Ok(STANDARD.encode(sealed))
    }

    fn decrypt(&self, ciphertext: &str, passphrase: &str) -> Result<String, CryptoError> {
        let sealed = STANDARD
            .decode(ciphertext.trim())
            .map_err(|_| CryptoError::InvalidEncoding)?;
        let key = self.key_for(passphrase)?;
        let opened = decrypt(&key, &sealed)?;
        String::from_utf8(opened).map_err(|_| CryptoError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = PassphraseCipher::new();
        let plaintext = r#"{"type":"message","content":"salut"}"#;

        let sealed = cipher.encrypt(plaintext, "secret").unwrap();
        let opened = cipher.decrypt(&sealed, "secret").unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let cipher = PassphraseCipher::new();
        let sealed = cipher.encrypt("Secret message", "room-a").unwrap();

        assert!(cipher.decrypt(&sealed, "room-b").is_err());
        assert!(cipher.decrypt(&sealed, "").is_err());
        // Switching back re-derives the right key.
        assert_eq!(cipher.decrypt(&sealed, "room-a").unwrap(), "Secret message");
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = room_key("pw").unwrap();

        let mut encrypted = encrypt(&key, b"Important data").unwrap();
        let len = encrypted.len();
        encrypted[len - 1] ^= 0xFF;

        assert!(decrypt(&key, &encrypted).is_err());
    }

    #[test]
    fn test_garbage_input_fails_without_panicking() {
        let cipher = PassphraseCipher::new();
        assert!(matches!(
            cipher.decrypt("not base64 at all!", "pw"),
            Err(CryptoError::InvalidEncoding)
        ));
        assert!(matches!(
            cipher.decrypt("AAAA", "pw"),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_nonce_prepended() {
        let key = [7u8; SYMMETRIC_KEY_SIZE];
        let encrypted = encrypt(&key, b"test").unwrap();
        // nonce (24) + ciphertext (4 + 16 tag)
        assert_eq!(encrypted.len(), NONCE_SIZE + 4 + 16);
    }

    #[test]
    fn test_empty_passphrase_is_public_room() {
        assert_eq!(room_fingerprint("").unwrap(), RoomFingerprint::public());
        assert!(!room_fingerprint(" ").unwrap().is_public());
    }

    #[test]
    fn test_fingerprint_deterministic_and_distinct() {
        let a1 = room_fingerprint("alpha").unwrap();
        let a2 = room_fingerprint("alpha").unwrap();
        let b = room_fingerprint("beta").unwrap();

        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(a1.as_str().len(), 64);
    }

    #[test]
    fn test_fingerprint_is_not_a_fast_hash() {
        let fp = room_fingerprint("alpha").unwrap();
        let unstretched = blake3::derive_key(KDF_CONTEXT_ROOM_FINGERPRINT, b"alpha");
        assert_ne!(fp.as_str(), hex::encode(unstretched));

        let secret = stretch_passphrase("alpha").unwrap();
        assert_eq!(fp.as_str(), hex::encode(derive_subkey(&secret, KDF_CONTEXT_ROOM_FINGERPRINT)));
    }

    #[test]
    fn test_fingerprint_differs_from_room_key() {
        let fp = room_fingerprint("alpha").unwrap();
        let key = room_key("alpha").unwrap();
        assert_ne!(fp.as_str(), hex::encode(key));
    }
}

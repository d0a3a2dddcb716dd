//! Password-based secret storage.
//!
//! Secrets are never decrypted. Verification re-derives the key from a
//! candidate password plus the stored salt, re-encrypts with the stored IV,
//! and compares ciphertexts; deterministic encryption given identical
//! (password, salt, IV) makes that comparison sound.

use crate::errors::AppError;
use aes::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const PBKDF2_ROUNDS: u32 = 65_536;

/// Fresh random salt from the OS entropy source.
pub fn create_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Fresh random IV from the OS entropy source. Separate call from
/// [`create_salt`]; the two must never share bytes.
pub fn create_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// PBKDF2-HMAC-SHA256, 65536 rounds, 256-bit key. Identical password and
/// salt always yield identical key bytes.
pub fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], AppError> {
    if salt.is_empty() {
        return Err(AppError::KeyDerivation("salt must not be empty".to_string()));
    }
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    Ok(key)
}

/// AES-256-CBC with PKCS7 padding; the ciphertext is returned
/// Base64-encoded. Deterministic given identical inputs.
pub fn encrypt(plaintext: &str, key: &[u8], iv: &[u8]) -> Result<String, AppError> {
    if key.len() != KEY_LEN {
        return Err(AppError::Encryption(format!(
            "key must be {} bytes, got {}",
            KEY_LEN,
            key.len()
        )));
    }
    if iv.len() != IV_LEN {
        return Err(AppError::Encryption(format!(
            "iv must be {} bytes, got {}",
            IV_LEN,
            iv.len()
        )));
    }

    let cipher = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    Ok(BASE64.encode(ciphertext))
}

/// The persisted form of a secret: ciphertext, salt and IV, all Base64.
/// Key material is derived on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSecret {
    pub cipher_b64: String,
    pub salt_b64: String,
    pub iv_b64: String,
}

/// Seals a password under a key derived from itself, with a fresh salt and
/// IV per call.
pub fn seal(password: &str) -> Result<SealedSecret, AppError> {
    let salt = create_salt();
    let iv = create_iv();
    let key = derive_key(password, &salt)?;
    let cipher_b64 = encrypt(password, &key, &iv)?;
    Ok(SealedSecret {
        cipher_b64,
        salt_b64: BASE64.encode(salt),
        iv_b64: BASE64.encode(iv),
    })
}

/// Checks a candidate password against a sealed secret by recomputing the
/// ciphertext from the stored salt and IV.
pub fn verify(candidate: &str, sealed: &SealedSecret) -> Result<bool, AppError> {
    let salt = BASE64
        .decode(&sealed.salt_b64)
        .map_err(|e| AppError::KeyDerivation(format!("stored salt is not Base64: {}", e)))?;
    let iv = BASE64
        .decode(&sealed.iv_b64)
        .map_err(|e| AppError::Encryption(format!("stored iv is not Base64: {}", e)))?;

    let key = derive_key(candidate, &salt)?;
    let recomputed = encrypt(candidate, &key, &iv)?;
    Ok(recomputed == sealed.cipher_b64)
}

//! AES-256-GCM sealing of secret buffers.
//!
//! Sealed layout: nonce(12) || ciphertext || tag(16).

use crate::core::errors::{Result, WalletError};
use crate::security::SecretVec;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::Aes256Gcm;
use rand::RngCore;

const NONCE_LEN: usize = 12;

pub fn seal(plaintext: &[u8], key: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| WalletError::crypto("invalid encryption key length"))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    #[allow(deprecated)]
    let nonce = aes_gcm::aead::Nonce::<Aes256Gcm>::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|_| WalletError::crypto("encryption failed"))?;

    let mut sealed = nonce_bytes.to_vec();
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Opens a sealed buffer. A tag mismatch is reported as an
/// authentication failure since it means the key was derived from a wrong
/// password.
pub fn open(sealed: &[u8], key: &[u8], aad: &[u8]) -> Result<SecretVec> {
    if sealed.len() < NONCE_LEN + 16 {
        return Err(WalletError::crypto("ciphertext too short"));
    }
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| WalletError::crypto("invalid encryption key length"))?;
    #[allow(deprecated)]
    let nonce = aes_gcm::aead::Nonce::<Aes256Gcm>::from_slice(&sealed[..NONCE_LEN]);

    let plaintext = cipher
        .decrypt(nonce, Payload { msg: &sealed[NONCE_LEN..], aad })
        .map_err(|_| WalletError::AuthenticationError("decryption failed".into()))?;
    Ok(SecretVec::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let key = [7u8; 32];
        let sealed = seal(b"secret seed", &key, b"seed").unwrap();
        assert_eq!(open(&sealed, &key, b"seed").unwrap().as_slice(), b"secret seed");
    }

    #[test]
    fn test_open_with_wrong_key_is_authentication_error() {
        let sealed = seal(b"secret", &[1u8; 32], b"").unwrap();
        let err = open(&sealed, &[2u8; 32], b"").unwrap_err();
        assert_eq!(err.kind(), "AuthenticationError");
    }

    #[test]
    fn test_aad_is_bound() {
        let key = [3u8; 32];
        let sealed = seal(b"secret", &key, b"mnemonic").unwrap();
        assert!(open(&sealed, &key, b"seed").is_err());
    }

    #[test]
    fn test_nonce_is_random() {
        let key = [4u8; 32];
        assert_ne!(seal(b"x", &key, b"").unwrap(), seal(b"x", &key, b"").unwrap());
    }
}

use crate::core::errors::{Result, WalletError};
use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use scrypt::Params;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

#[derive(Debug, Clone, PartialEq)]
pub enum KDFAlgorithm {
    PBKDF2 { iterations: u32 },
    Scrypt { log_n: u8, r: u32, p: u32 },
}

/// Password-based key derivation for the vault and for keystore files.
pub struct KeyDerivation {
    algorithm: KDFAlgorithm,
}

impl KeyDerivation {
    pub fn new(algorithm: KDFAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn pbkdf2(iterations: u32) -> Self {
        Self::new(KDFAlgorithm::PBKDF2 { iterations })
    }

    pub fn scrypt(log_n: u8, r: u32, p: u32) -> Self {
        Self::new(KDFAlgorithm::Scrypt { log_n, r, p })
    }

    pub fn algorithm(&self) -> &KDFAlgorithm {
        &self.algorithm
    }

    pub fn derive_key(
        &self,
        password: &[u8],
        salt: &[u8],
        key_length: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        match &self.algorithm {
            KDFAlgorithm::PBKDF2 { iterations } => {
                debug!("Using PBKDF2 with {} iterations", iterations);
                let mut key = Zeroizing::new(vec![0u8; key_length]);
                pbkdf2_hmac::<Sha256>(password, salt, *iterations, &mut key);
                Ok(key)
            }
            KDFAlgorithm::Scrypt { log_n, r, p } => {
                debug!("Using Scrypt with parameters logN={}, r={}, p={}", log_n, r, p);
                let params = Params::new(*log_n, *r, *p, key_length)
                    .map_err(|e| WalletError::crypto(format!("invalid scrypt parameters: {}", e)))?;
                let mut key = Zeroizing::new(vec![0u8; key_length]);
                scrypt::scrypt(password, salt, &params, &mut key)
                    .map_err(|e| WalletError::crypto(format!("scrypt derivation failed: {}", e)))?;
                Ok(key)
            }
        }
    }

    pub fn generate_salt(length: usize) -> Vec<u8> {
        use rand::RngCore;
        let mut salt = vec![0u8; length];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        salt
    }
}

/// Expands a stretched password key into an independent 32-byte subkey.
pub fn expand_subkey(master: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let hk = Hkdf::<Sha256>::new(None, master);
    let mut out = Zeroizing::new([0u8; 32]);
    hk.expand(info, out.as_mut())
        .map_err(|e| WalletError::crypto(format!("HKDF expansion failed: {}", e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pbkdf2_derivation() {
        let kdf = KeyDerivation::pbkdf2(1000);
        let key1 = kdf.derive_key(b"test_password", b"test_salt_123", 32).unwrap();
        let key2 = kdf.derive_key(b"test_password", b"test_salt_123", 32).unwrap();
        assert_eq!(key1, key2);
        assert_eq!(key1.len(), 32);

        let key3 = kdf.derive_key(b"test_password", b"other_salt", 32).unwrap();
        assert_ne!(key1, key3);
    }

    #[test]
    fn test_scrypt_derivation() {
        let kdf = KeyDerivation::scrypt(4, 8, 1);
        let key1 = kdf.derive_key(b"pw", b"salt", 32).unwrap();
        let key2 = kdf.derive_key(b"pw", b"salt", 32).unwrap();
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_subkeys_are_domain_separated() {
        let a = expand_subkey(b"master key material", b"enc").unwrap();
        let b = expand_subkey(b"master key material", b"verify").unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_generate_salt_length() {
        assert_eq!(KeyDerivation::generate_salt(16).len(), 16);
    }
}

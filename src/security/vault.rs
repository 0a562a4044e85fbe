//! Encrypted-at-rest root key material
//!
//! Every secret is sealed on its own with AES-256-GCM. The sealing key and a
//! password verifier are both expanded from one PBKDF2 stretch of the pay
//! password, so a wrong password is rejected before any ciphertext is
//! touched.

use crate::core::errors::{Result, WalletError};
use crate::crypto::encryption::{open, seal};
use crate::crypto::kdf::{expand_subkey, KeyDerivation};
use crate::security::password_validator::validate_pay_password;
use crate::security::{SecretString, SecretVec};
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;
use tracing::{debug, info};
use zeroize::Zeroizing;

const SALT_LEN: usize = 16;
const MASTER_KEY_LEN: usize = 32;

/// Label of one sealed secret. Used as the AEAD associated data so a
/// ciphertext cannot be swapped into another slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecretKind {
    Seed,
    Mnemonic,
    RootXprv,
    SinglePrivateKey,
}

impl SecretKind {
    fn aad(self) -> &'static [u8] {
        match self {
            SecretKind::Seed => b"seed",
            SecretKind::Mnemonic => b"mnemonic",
            SecretKind::RootXprv => b"xprv",
            SecretKind::SinglePrivateKey => b"private-key",
        }
    }
}

/// Decrypted root material. Every buffer is zeroed when dropped.
pub enum RootMaterial {
    /// BIP39 seed, with the mnemonic it came from when known.
    Seed {
        seed: SecretVec,
        mnemonic: Option<SecretString>,
    },
    /// Base58 root xprv on secp256r1.
    RootXprv(SecretString),
    /// Lone secp256k1 key.
    SinglePrivateKey(Zeroizing<[u8; 32]>),
}

impl std::fmt::Debug for RootMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            RootMaterial::Seed { .. } => "Seed",
            RootMaterial::RootXprv(_) => "RootXprv",
            RootMaterial::SinglePrivateKey(_) => "SinglePrivateKey",
        };
        f.debug_tuple("RootMaterial").field(&kind).finish()
    }
}

impl RootMaterial {
    fn parts(&self) -> Vec<(SecretKind, &[u8])> {
        match self {
            RootMaterial::Seed { seed, mnemonic } => {
                let mut parts = vec![(SecretKind::Seed, seed.as_slice())];
                if let Some(m) = mnemonic {
                    parts.push((SecretKind::Mnemonic, m.as_bytes()));
                }
                parts
            }
            RootMaterial::RootXprv(xprv) => vec![(SecretKind::RootXprv, xprv.as_bytes())],
            RootMaterial::SinglePrivateKey(key) => vec![(SecretKind::SinglePrivateKey, &key[..])],
        }
    }

    fn from_parts(mut parts: BTreeMap<SecretKind, SecretVec>) -> Result<Self> {
        if let Some(seed) = parts.remove(&SecretKind::Seed) {
            let mnemonic = parts
                .remove(&SecretKind::Mnemonic)
                .map(|bytes| utf8_secret(&bytes))
                .transpose()?;
            return Ok(RootMaterial::Seed { seed, mnemonic });
        }
        if let Some(xprv) = parts.remove(&SecretKind::RootXprv) {
            return Ok(RootMaterial::RootXprv(utf8_secret(&xprv)?));
        }
        if let Some(key) = parts.remove(&SecretKind::SinglePrivateKey) {
            if key.len() != 32 {
                return Err(WalletError::crypto("sealed private key has wrong length"));
            }
            let mut out = Zeroizing::new([0u8; 32]);
            out.copy_from_slice(&key);
            return Ok(RootMaterial::SinglePrivateKey(out));
        }
        Err(WalletError::InternalError("vault holds no root material".into()))
    }

    pub fn mnemonic(&self) -> Option<&str> {
        match self {
            RootMaterial::Seed { mnemonic: Some(m), .. } => Some(m.as_str()),
            _ => None,
        }
    }

    pub fn seed(&self) -> Option<&[u8]> {
        match self {
            RootMaterial::Seed { seed, .. } => Some(seed.as_slice()),
            _ => None,
        }
    }
}

fn utf8_secret(bytes: &[u8]) -> Result<SecretString> {
    let s = std::str::from_utf8(bytes)
        .map_err(|_| WalletError::crypto("sealed secret is not valid UTF-8"))?;
    Ok(Zeroizing::new(s.to_string()))
}

struct DerivedKeys {
    encryption: Zeroizing<[u8; 32]>,
    verifier: Zeroizing<[u8; 32]>,
}

/// Sealed root material of one master wallet.
pub struct KeyVault {
    iterations: u32,
    salt: Vec<u8>,
    verifier: [u8; 32],
    /// Public binding of the root, such as an account xpub fingerprint and
    /// chain code. Checked before a reset replaces the secrets.
    binding: Vec<u8>,
    secrets: BTreeMap<SecretKind, Vec<u8>>,
}

impl std::fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVault")
            .field("iterations", &self.iterations)
            .field("secrets", &self.secrets.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl KeyVault {
    /// Seals `material` under `password`.
    pub fn seal(material: &RootMaterial, password: &str, iterations: u32, binding: Vec<u8>) -> Result<Self> {
        validate_pay_password(password)?;
        let salt = KeyDerivation::generate_salt(SALT_LEN);
        let keys = derive_keys(password, &salt, iterations)?;
        let secrets = seal_all(material, &keys)?;
        debug!("Sealed {} secrets", secrets.len());
        Ok(Self {
            iterations,
            salt,
            verifier: *keys.verifier,
            binding,
            secrets,
        })
    }

    fn check(&self, password: &str) -> Result<DerivedKeys> {
        let keys = derive_keys(password, &self.salt, self.iterations)?;
        if !bool::from(keys.verifier[..].ct_eq(&self.verifier[..])) {
            return Err(WalletError::AuthenticationError("wrong password".into()));
        }
        Ok(keys)
    }

    pub fn verify_password(&self, password: &str) -> Result<()> {
        self.check(password).map(|_| ())
    }

    pub fn has_mnemonic(&self) -> bool {
        self.secrets.contains_key(&SecretKind::Mnemonic)
    }

    /// Decrypts the root material. The caller drops it as soon as the
    /// derive or sign step is done.
    pub fn unlock(&self, password: &str) -> Result<RootMaterial> {
        let keys = self.check(password)?;
        let mut parts = BTreeMap::new();
        for (kind, sealed) in &self.secrets {
            parts.insert(*kind, open(sealed, &keys.encryption[..], kind.aad())?);
        }
        RootMaterial::from_parts(parts)
    }

    pub fn change_password(&mut self, old: &str, new: &str) -> Result<()> {
        self.change_password_with(old, new, |_| Ok(()))
    }

    /// Re-seals every secret under `new`. `after_each` runs after the n-th
    /// secret has been re-sealed; an error from it, or from any re-seal,
    /// leaves the vault untouched.
    pub fn change_password_with(
        &mut self,
        old: &str,
        new: &str,
        mut after_each: impl FnMut(usize) -> Result<()>,
    ) -> Result<()> {
        validate_pay_password(new)?;
        let old_keys = self.check(old)?;

        let salt = KeyDerivation::generate_salt(SALT_LEN);
        let new_keys = derive_keys(new, &salt, self.iterations)?;
        let mut resealed = BTreeMap::new();
        for (i, (kind, sealed)) in self.secrets.iter().enumerate() {
            let plain = open(sealed, &old_keys.encryption[..], kind.aad())?;
            resealed.insert(*kind, seal(&plain, &new_keys.encryption[..], kind.aad())?);
            after_each(i)?;
        }

        self.salt = salt;
        self.verifier = *new_keys.verifier;
        self.secrets = resealed;
        info!("Vault password rotated");
        Ok(())
    }

    /// Replaces the sealed secrets with `material` re-derived from a
    /// mnemonic, provided it has the same public `binding` as the
    /// original root.
    pub fn reset_password(&mut self, material: &RootMaterial, binding: &[u8], new: &str) -> Result<()> {
        validate_pay_password(new)?;
        if !bool::from(self.binding.as_slice().ct_eq(binding)) {
            return Err(WalletError::AuthenticationError(
                "mnemonic does not match this wallet".into(),
            ));
        }
        let salt = KeyDerivation::generate_salt(SALT_LEN);
        let keys = derive_keys(new, &salt, self.iterations)?;
        let secrets = seal_all(material, &keys)?;
        self.salt = salt;
        self.verifier = *keys.verifier;
        self.secrets = secrets;
        info!("Vault password reset");
        Ok(())
    }
}

fn derive_keys(password: &str, salt: &[u8], iterations: u32) -> Result<DerivedKeys> {
    let master = KeyDerivation::pbkdf2(iterations).derive_key(password.as_bytes(), salt, MASTER_KEY_LEN)?;
    Ok(DerivedKeys {
        encryption: expand_subkey(&master, b"vault-enc")?,
        verifier: expand_subkey(&master, b"vault-verify")?,
    })
}

fn seal_all(material: &RootMaterial, keys: &DerivedKeys) -> Result<BTreeMap<SecretKind, Vec<u8>>> {
    material
        .parts()
        .into_iter()
        .map(|(kind, plain)| Ok((kind, seal(plain, &keys.encryption[..], kind.aad())?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITER: u32 = 10;

    fn seed_material() -> RootMaterial {
        RootMaterial::Seed {
            seed: Zeroizing::new(vec![9u8; 64]),
            mnemonic: Some(Zeroizing::new("word ".repeat(11) + "word")),
        }
    }

    #[test]
    fn test_unlock_round_trip() {
        let vault = KeyVault::seal(&seed_material(), "password123", ITER, vec![1]).unwrap();
        let root = vault.unlock("password123").unwrap();
        assert_eq!(root.seed().unwrap(), &[9u8; 64][..]);
        assert!(root.mnemonic().unwrap().starts_with("word"));
        assert!(vault.has_mnemonic());
    }

    #[test]
    fn test_wrong_password() {
        let vault = KeyVault::seal(&seed_material(), "password123", ITER, vec![]).unwrap();
        let err = vault.unlock("password124").unwrap_err();
        assert_eq!(err.kind(), "AuthenticationError");
    }

    #[test]
    fn test_short_password_rejected_at_seal() {
        let err = KeyVault::seal(&seed_material(), "short", ITER, vec![]).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn test_change_password() {
        let mut vault = KeyVault::seal(&seed_material(), "password123", ITER, vec![]).unwrap();
        vault.change_password("password123", "newpassword").unwrap();
        assert!(vault.unlock("password123").is_err());
        assert!(vault.unlock("newpassword").is_ok());
    }

    #[test]
    fn test_interrupted_rotation_keeps_old_password() {
        let mut vault = KeyVault::seal(&seed_material(), "password123", ITER, vec![]).unwrap();
        let err = vault
            .change_password_with("password123", "newpassword", |i| {
                if i == 1 {
                    Err(WalletError::InternalError("simulated failure".into()))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert_eq!(err.kind(), "InternalError");
        assert!(vault.unlock("password123").is_ok());
        assert!(vault.unlock("newpassword").is_err());
    }

    #[test]
    fn test_reset_requires_matching_binding() {
        let mut vault = KeyVault::seal(&seed_material(), "password123", ITER, vec![1, 2, 3]).unwrap();
        let err = vault.reset_password(&seed_material(), &[9, 9, 9], "newpassword").unwrap_err();
        assert_eq!(err.kind(), "AuthenticationError");
        assert!(vault.unlock("password123").is_ok());

        vault.reset_password(&seed_material(), &[1, 2, 3], "newpassword").unwrap();
        assert!(vault.unlock("newpassword").is_ok());
    }

    #[test]
    fn test_single_private_key() {
        let material = RootMaterial::SinglePrivateKey(Zeroizing::new([5u8; 32]));
        let vault = KeyVault::seal(&material, "password123", ITER, vec![]).unwrap();
        match vault.unlock("password123").unwrap() {
            RootMaterial::SinglePrivateKey(key) => assert_eq!(*key, [5u8; 32]),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!vault.has_mnemonic());
    }
}

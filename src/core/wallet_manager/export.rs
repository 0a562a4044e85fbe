//! Wallet export and keystore import.
//!
//! A keystore is a JSON envelope around an AES-256-GCM sealed body. The body
//! key is stretched from the backup password with scrypt.

use super::lifecycle::{parse_cosigners, WalletParts};
use super::MasterWalletManager;
use crate::core::errors::{Result, WalletError};
use crate::core::master_wallet::MasterWallet;
use crate::core::wallet_info::WalletKind;
use crate::crypto::encryption::{open, seal};
use crate::crypto::kdf::KeyDerivation;
use crate::security::password_validator::validate_backup_password;
use crate::security::{RootMaterial, SecretString};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

const KEYSTORE_VERSION: u32 = 1;
const KEYSTORE_AAD: &[u8] = b"ela-wallet-keystore";
const SALT_LEN: usize = 32;

/// Keystore envelope as exchanged with other wallets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Keystore {
    pub version: u32,
    #[serde(rename = "KDF")]
    pub kdf: String,
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
    pub salt: String,
    pub nonce: String,
    pub ciphertext: String,
}

/// Sealed content of a keystore.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "PascalCase")]
struct KeystoreBody {
    #[zeroize(skip)]
    kind: WalletKind,
    #[serde(default)]
    mnemonic: Option<String>,
    #[serde(default)]
    seed: Option<String>,
    #[serde(default)]
    xprv: Option<String>,
    #[serde(default)]
    private_key: Option<String>,
    single_address: bool,
    has_passphrase: bool,
    m: u8,
    #[serde(default)]
    cosigners: Vec<String>,
    created_at: i64,
}

impl KeystoreBody {
    fn root(&self) -> Result<Option<RootMaterial>> {
        if let Some(seed) = &self.seed {
            let seed = Zeroizing::new(hex::decode(seed)?);
            let mnemonic = self.mnemonic.as_ref().map(|m| Zeroizing::new(m.clone()));
            return Ok(Some(RootMaterial::Seed { seed, mnemonic }));
        }
        if let Some(xprv) = &self.xprv {
            return Ok(Some(RootMaterial::RootXprv(Zeroizing::new(xprv.clone()))));
        }
        if let Some(key) = &self.private_key {
            let bytes = Zeroizing::new(hex::decode(key)?);
            let mut out = Zeroizing::new([0u8; 32]);
            if bytes.len() != out.len() {
                return Err(WalletError::SerializationError("keystore private key has wrong length".into()));
            }
            out.copy_from_slice(&bytes);
            return Ok(Some(RootMaterial::SinglePrivateKey(out)));
        }
        if self.kind != WalletKind::Readonly {
            return Err(WalletError::SerializationError("keystore holds no key material".into()));
        }
        Ok(None)
    }
}

impl MasterWalletManager {
    fn keystore_kdf(&self) -> KeyDerivation {
        let s = &self.config.security;
        KeyDerivation::scrypt(s.keystore_scrypt_log_n, s.keystore_scrypt_r, s.keystore_scrypt_p)
    }

    /// Keystore JSON holding the wallet's secrets and public configuration.
    /// Readonly wallets export their co-signer keys only and need no pay
    /// password.
    pub fn export_wallet_with_keystore(&self, id: &str, backup_password: &str, pay_password: &str) -> Result<String> {
        validate_backup_password(backup_password)?;
        let wallet = self.wallet(id)?;
        let info = wallet.info();
        let mut body = KeystoreBody {
            kind: info.kind,
            mnemonic: None,
            seed: None,
            xprv: None,
            private_key: None,
            single_address: info.single_address,
            has_passphrase: info.has_passphrase,
            m: info.m,
            cosigners: wallet.keys().cosigners().iter().map(|k| k.to_base58()).collect(),
            created_at: info.created_at.timestamp(),
        };
        if !info.readonly() {
            wallet.with_root(pay_password, |root| {
                match root {
                    RootMaterial::Seed { seed, mnemonic } => {
                        body.seed = Some(hex::encode(seed.as_slice()));
                        body.mnemonic = mnemonic.as_ref().map(|m| m.to_string());
                    }
                    RootMaterial::RootXprv(xprv) => body.xprv = Some(xprv.to_string()),
                    RootMaterial::SinglePrivateKey(key) => body.private_key = Some(hex::encode(&key[..])),
                }
                Ok(())
            })?;
        }
        let plaintext = Zeroizing::new(serde_json::to_vec(&body)?);

        let kdf = self.keystore_kdf();
        let salt = KeyDerivation::generate_salt(SALT_LEN);
        let key = kdf.derive_key(backup_password.as_bytes(), &salt, 32)?;
        let sealed = seal(&plaintext, &key, KEYSTORE_AAD)?;
        let (nonce, ciphertext) = sealed.split_at(12);
        let s = &self.config.security;
        let keystore = Keystore {
            version: KEYSTORE_VERSION,
            kdf: "scrypt".to_string(),
            log_n: s.keystore_scrypt_log_n,
            r: s.keystore_scrypt_r,
            p: s.keystore_scrypt_p,
            salt: BASE64.encode(&salt),
            nonce: BASE64.encode(nonce),
            ciphertext: BASE64.encode(ciphertext),
        };
        info!(wallet = %id, "exported keystore");
        Ok(serde_json::to_string(&keystore)?)
    }

    /// Restores a wallet from keystore JSON, sealing its secrets under
    /// `pay_password`.
    pub fn import_wallet_with_keystore(
        &self,
        id: &str,
        keystore: &str,
        backup_password: &str,
        pay_password: &str,
    ) -> Result<Arc<MasterWallet>> {
        if let Some(existing) = self.existing(id) {
            return Ok(existing);
        }
        let envelope: Keystore = serde_json::from_str(keystore)?;
        if envelope.version != KEYSTORE_VERSION || envelope.kdf != "scrypt" {
            return Err(WalletError::validation(format!(
                "unsupported keystore version {} / kdf {}",
                envelope.version, envelope.kdf
            )));
        }
        let decode = |field: &str, v: &str| {
            BASE64
                .decode(v)
                .map_err(|e| WalletError::SerializationError(format!("keystore {}: {}", field, e)))
        };
        let salt = decode("Salt", &envelope.salt)?;
        let mut sealed = decode("Nonce", &envelope.nonce)?;
        sealed.extend(decode("Ciphertext", &envelope.ciphertext)?);

        let kdf = KeyDerivation::scrypt(envelope.log_n, envelope.r, envelope.p);
        let key = kdf.derive_key(backup_password.as_bytes(), &salt, 32)?;
        let plaintext = open(&sealed, &key, KEYSTORE_AAD)
            .map_err(|_| WalletError::AuthenticationError("wrong backup password".into()))?;
        let body: KeystoreBody = serde_json::from_slice(&plaintext)?;

        let wallet = self.assemble(WalletParts {
            id,
            kind: body.kind,
            root: body.root()?,
            pay_password,
            single_address: body.single_address,
            has_passphrase: body.has_passphrase,
            cosigners: parse_cosigners(&body.cosigners)?,
            m: body.m,
            created_at: Some(body.created_at),
        })?;
        info!(wallet = %id, "imported keystore");
        Ok(wallet)
    }

    pub fn export_wallet_with_mnemonic(&self, id: &str, pay_password: &str) -> Result<SecretString> {
        self.wallet(id)?.export_mnemonic(pay_password)
    }

    /// BIP39 seed as hex.
    pub fn export_wallet_with_seed(&self, id: &str, pay_password: &str) -> Result<SecretString> {
        self.wallet(id)?.export_seed(pay_password)
    }

    /// Root xprv of the Elastos tree.
    pub fn export_wallet_with_private_key(&self, id: &str, pay_password: &str) -> Result<SecretString> {
        self.wallet(id)?.export_root_xprv(pay_password)
    }

    pub fn export_ethsc_private_key(&self, id: &str, pay_password: &str) -> Result<SecretString> {
        self.wallet(id)?.export_evm_private_key(pay_password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chain::NetworkType;
    use crate::core::config::WalletConfig;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn manager() -> MasterWalletManager {
        let mut config = WalletConfig::for_network(NetworkType::MainNet);
        config.security.pbkdf2_iterations = 1_000;
        config.security.keystore_scrypt_log_n = 4;
        MasterWalletManager::new(config).unwrap()
    }

    #[test]
    fn test_keystore_round_trip_keeps_keys() {
        let m = manager();
        let original = m.create_master_wallet("a", MNEMONIC, "", "password123", false).unwrap();
        let keystore = m.export_wallet_with_keystore("a", "backup-pass", "password123").unwrap();
        let envelope: Keystore = serde_json::from_str(&keystore).unwrap();
        assert_eq!(envelope.kdf, "scrypt");
        assert_eq!(envelope.log_n, 4);

        let restored = m
            .import_wallet_with_keystore("b", &keystore, "backup-pass", "another-pass")
            .unwrap();
        assert_eq!(restored.keys().binding(), original.keys().binding());
        assert_eq!(restored.info().created_at.timestamp(), original.info().created_at.timestamp());
        assert_eq!(&*restored.export_mnemonic("another-pass").unwrap(), MNEMONIC);
    }

    #[test]
    fn test_keystore_wrong_backup_password() {
        let m = manager();
        m.create_master_wallet("a", MNEMONIC, "", "password123", false).unwrap();
        let keystore = m.export_wallet_with_keystore("a", "backup-pass", "password123").unwrap();
        let err = m
            .import_wallet_with_keystore("b", &keystore, "wrong-pass", "password123")
            .unwrap_err();
        assert_eq!(err.kind(), "AuthenticationError");
        assert!(m.get_master_wallet("b").is_err());
    }

    #[test]
    fn test_export_requires_pay_password() {
        let m = manager();
        m.create_master_wallet("a", MNEMONIC, "", "password123", false).unwrap();
        let err = m.export_wallet_with_keystore("a", "backup-pass", "password124").unwrap_err();
        assert_eq!(err.kind(), "AuthenticationError");
    }
}

//! Master wallet lifecycle: create, import, list and destroy.
//!
//! Creation is create-or-get. A call naming an ID that is already registered
//! returns the registered wallet and ignores the other arguments.

use super::{check_id, MasterWalletManager};
use crate::core::bip44::ExtendedPublicKey;
use crate::core::derivation::DerivationEngine;
use crate::core::errors::{Result, WalletError};
use crate::core::key_ring::PublicKeyRing;
use crate::core::master_wallet::MasterWallet;
use crate::core::wallet_info::{WalletInfo, WalletKind};
use crate::crypto::signature_utils::CurveKind;
use crate::security::{KeyVault, RootMaterial, SecretString};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use zeroize::Zeroizing;

/// Everything needed to assemble one master wallet.
pub(crate) struct WalletParts<'a> {
    pub id: &'a str,
    pub kind: WalletKind,
    pub root: Option<RootMaterial>,
    pub pay_password: &'a str,
    pub single_address: bool,
    pub has_passphrase: bool,
    pub cosigners: Vec<ExtendedPublicKey>,
    pub m: u8,
    pub created_at: Option<i64>,
}

pub(crate) fn parse_cosigners(cosigners: &[String]) -> Result<Vec<ExtendedPublicKey>> {
    cosigners
        .iter()
        .map(|c| ExtendedPublicKey::from_base58(CurveKind::Secp256r1, c.trim()))
        .collect()
}

impl MasterWalletManager {
    pub fn generate_mnemonic(&self, language: &str) -> Result<SecretString> {
        DerivationEngine::generate_mnemonic(language)
    }

    pub(crate) fn assemble(&self, parts: WalletParts<'_>) -> Result<Arc<MasterWallet>> {
        check_id(parts.id)?;
        if let Some(existing) = self.existing(parts.id) {
            return Ok(existing);
        }
        let (keys, vault) = match &parts.root {
            Some(root) => {
                let keys = PublicKeyRing::from_root(&self.engine, root, parts.cosigners, parts.m)?;
                let vault = KeyVault::seal(
                    root,
                    parts.pay_password,
                    self.config.security.pbkdf2_iterations,
                    keys.binding(),
                )?;
                (keys, Some(vault))
            }
            None => (PublicKeyRing::readonly(parts.cosigners, parts.m)?, None),
        };
        let policy = keys.policy();
        let mut info = WalletInfo::new(
            parts.id,
            parts.kind,
            parts.single_address,
            parts.has_passphrase,
            policy.required,
            policy.total,
        );
        if let Some(at) = parts.created_at {
            info = info.with_created_at(at);
        }
        let wallet = self.register(MasterWallet::new(info, self.config.clone(), keys, vault));
        info!(wallet = %wallet.id(), kind = ?wallet.info().kind, m = policy.required, n = policy.total, "master wallet ready");
        Ok(wallet)
    }

    fn seed_root(mnemonic: &str, passphrase: &str) -> Result<RootMaterial> {
        let (mnemonic, seed) = DerivationEngine::derive_seed(mnemonic, passphrase)?;
        Ok(RootMaterial::Seed { seed, mnemonic: Some(mnemonic) })
    }

    /// Standard wallet from a mnemonic.
    pub fn create_master_wallet(
        &self,
        id: &str,
        mnemonic: &str,
        passphrase: &str,
        pay_password: &str,
        single_address: bool,
    ) -> Result<Arc<MasterWallet>> {
        self.import_wallet_with_mnemonic(id, mnemonic, passphrase, pay_password, single_address, None)
    }

    /// Like `create_master_wallet`, with the wallet's original creation time
    /// as a unix timestamp.
    pub fn import_wallet_with_mnemonic(
        &self,
        id: &str,
        mnemonic: &str,
        passphrase: &str,
        pay_password: &str,
        single_address: bool,
        created_at: Option<i64>,
    ) -> Result<Arc<MasterWallet>> {
        if let Some(existing) = self.existing(id) {
            return Ok(existing);
        }
        self.assemble(WalletParts {
            id,
            kind: WalletKind::Seed,
            root: Some(Self::seed_root(mnemonic, passphrase)?),
            pay_password,
            single_address,
            has_passphrase: !passphrase.is_empty(),
            cosigners: Vec::new(),
            m: 1,
            created_at,
        })
    }

    /// Standard wallet from a 64-byte BIP39 seed given as hex. The wallet
    /// cannot export a mnemonic.
    pub fn import_wallet_with_seed(
        &self,
        id: &str,
        seed: &str,
        pay_password: &str,
        single_address: bool,
        created_at: Option<i64>,
    ) -> Result<Arc<MasterWallet>> {
        let seed = Zeroizing::new(hex::decode(seed.trim())?);
        if seed.len() != 64 {
            return Err(WalletError::validation("seed must be 64 bytes"));
        }
        self.assemble(WalletParts {
            id,
            kind: WalletKind::Seed,
            root: Some(RootMaterial::Seed { seed, mnemonic: None }),
            pay_password,
            single_address,
            has_passphrase: false,
            cosigners: Vec::new(),
            m: 1,
            created_at,
        })
    }

    /// EVM-only wallet from one secp256k1 private key in hex.
    pub fn create_master_wallet_with_priv_key(&self, id: &str, private_key: &str, pay_password: &str) -> Result<Arc<MasterWallet>> {
        let bytes = Zeroizing::new(hex::decode(private_key.trim().trim_start_matches("0x"))?);
        let mut key = Zeroizing::new([0u8; 32]);
        if bytes.len() != key.len() {
            return Err(WalletError::validation("private key must be 32 bytes"));
        }
        key.copy_from_slice(&bytes);
        CurveKind::Secp256k1.validate_secret(&key[..])?;
        self.assemble(WalletParts {
            id,
            kind: WalletKind::PrivateKey,
            root: Some(RootMaterial::SinglePrivateKey(key)),
            pay_password,
            single_address: true,
            has_passphrase: false,
            cosigners: Vec::new(),
            m: 1,
            created_at: None,
        })
    }

    /// Watch-only M-of-N wallet over co-signer xPubKeyHDPM values.
    pub fn create_multi_sign_master_wallet(
        &self,
        id: &str,
        cosigners: &[String],
        m: u8,
        single_address: bool,
        created_at: Option<i64>,
    ) -> Result<Arc<MasterWallet>> {
        self.assemble(WalletParts {
            id,
            kind: WalletKind::Readonly,
            root: None,
            pay_password: "",
            single_address,
            has_passphrase: false,
            cosigners: parse_cosigners(cosigners)?,
            m,
            created_at,
        })
    }

    /// M-of-N participant holding a root xprv; `cosigners` are the others.
    #[allow(clippy::too_many_arguments)]
    pub fn create_multi_sign_master_wallet_with_priv_key(
        &self,
        id: &str,
        xprv: &str,
        pay_password: &str,
        cosigners: &[String],
        m: u8,
        single_address: bool,
        created_at: Option<i64>,
    ) -> Result<Arc<MasterWallet>> {
        if cosigners.is_empty() {
            return Err(WalletError::validation("a multi-sign wallet needs co-signers"));
        }
        let xprv = Zeroizing::new(xprv.trim().to_string());
        crate::core::bip44::ExtendedPrivateKey::from_base58(CurveKind::Secp256r1, &xprv)?;
        self.assemble(WalletParts {
            id,
            kind: WalletKind::RootXprv,
            root: Some(RootMaterial::RootXprv(xprv)),
            pay_password,
            single_address,
            has_passphrase: false,
            cosigners: parse_cosigners(cosigners)?,
            m,
            created_at,
        })
    }

    /// M-of-N participant holding a mnemonic; `cosigners` are the others.
    #[allow(clippy::too_many_arguments)]
    pub fn create_multi_sign_master_wallet_with_mnemonic(
        &self,
        id: &str,
        mnemonic: &str,
        passphrase: &str,
        pay_password: &str,
        cosigners: &[String],
        m: u8,
        single_address: bool,
        created_at: Option<i64>,
    ) -> Result<Arc<MasterWallet>> {
        if cosigners.is_empty() {
            return Err(WalletError::validation("a multi-sign wallet needs co-signers"));
        }
        if let Some(existing) = self.existing(id) {
            return Ok(existing);
        }
        self.assemble(WalletParts {
            id,
            kind: WalletKind::Seed,
            root: Some(Self::seed_root(mnemonic, passphrase)?),
            pay_password,
            single_address,
            has_passphrase: !passphrase.is_empty(),
            cosigners: parse_cosigners(cosigners)?,
            m,
            created_at,
        })
    }

    /// Removes the wallet. Handles still held elsewhere fail with
    /// `NotFoundError` from here on.
    pub fn destroy_wallet(&self, id: &str) -> Result<()> {
        let wallet = self
            .wallets
            .write()
            .remove(id)
            .ok_or_else(|| WalletError::NotFoundError(format!("master wallet {} not found", id)))?;
        wallet.destroy();
        Ok(())
    }

    pub fn get_master_wallet(&self, id: &str) -> Result<Arc<MasterWallet>> {
        self.wallet(id)
    }

    /// Every wallet, ordered by ID.
    pub fn get_all_master_wallets(&self) -> Vec<Arc<MasterWallet>> {
        let mut wallets: Vec<_> = self.wallets.read().values().cloned().collect();
        wallets.sort_by(|a, b| a.id().cmp(b.id()));
        wallets
    }

    pub fn get_all_master_wallet_ids(&self) -> Vec<String> {
        self.get_all_master_wallets().iter().map(|w| w.id().to_string()).collect()
    }

    pub fn get_master_wallet_basic_info(&self, id: &str) -> Result<Value> {
        Ok(self.wallet(id)?.info().basic_info())
    }

    pub fn get_pub_key_info(&self, id: &str) -> Result<Value> {
        let wallet = self.wallet(id)?;
        Ok(wallet.keys().pub_key_info(wallet.info().single_address, wallet.info().readonly()))
    }

    pub fn get_version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

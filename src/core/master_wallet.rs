//! One master wallet: public key ring, sealed root material and per-wallet
//! state
//!
//! All mutable state sits behind one mutex. Signing, password changes and
//! address book updates against the same wallet serialize on it; different
//! wallets never contend. Root material is unlocked inside the lock for the
//! length of one derive-or-sign call and dropped (zeroed) on every exit path.

use crate::blockchain::elastos::address::Code;
use crate::blockchain::elastos::signing::{self, KeyProvider};
use crate::blockchain::elastos::Transaction;
use crate::core::bip44::ExtendedPrivateKey;
use crate::core::chain::ChainId;
use crate::core::config::WalletConfig;
use crate::core::derivation::{DerivationEngine, KeyPurpose};
use crate::core::errors::{Result, WalletError};
use crate::core::key_ring::{KeyLocation, PublicKeyRing, UtxoIndex};
use crate::core::wallet_info::WalletInfo;
use crate::crypto::signature_utils::CurveKind;
use crate::security::{KeyVault, RootMaterial, SecretString};
use crate::subwallet::address_book::AddressBook;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use zeroize::Zeroizing;

#[derive(Debug, Default)]
struct WalletState {
    vault: Option<KeyVault>,
    sub_wallets: BTreeMap<ChainId, AddressBook>,
    indexes: HashMap<ChainId, Arc<UtxoIndex>>,
    destroyed: bool,
}

#[derive(Debug)]
pub struct MasterWallet {
    info: WalletInfo,
    config: WalletConfig,
    engine: DerivationEngine,
    keys: PublicKeyRing,
    state: Mutex<WalletState>,
}

/// Signs with keys derived from unlocked root material, for the public keys
/// listed in a chain's index.
struct RootSigner<'a> {
    engine: &'a DerivationEngine,
    root: &'a RootMaterial,
    index: &'a UtxoIndex,
}

impl KeyProvider for RootSigner<'_> {
    fn secret_for(&self, public_key: &[u8; 33]) -> Result<Option<Zeroizing<[u8; 32]>>> {
        match self.index.keys.get(public_key) {
            Some(location) => self
                .engine
                .signing_secret(self.root, location.purpose, &location.tail)
                .map(Some),
            None => Ok(None),
        }
    }
}

impl MasterWallet {
    pub fn new(info: WalletInfo, config: WalletConfig, keys: PublicKeyRing, vault: Option<KeyVault>) -> Self {
        Self {
            info,
            engine: DerivationEngine::new(config.network),
            config,
            keys,
            state: Mutex::new(WalletState { vault, ..WalletState::default() }),
        }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn info(&self) -> &WalletInfo {
        &self.info
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn engine(&self) -> &DerivationEngine {
        &self.engine
    }

    pub fn keys(&self) -> &PublicKeyRing {
        &self.keys
    }

    fn live(&self, state: &WalletState) -> Result<()> {
        if state.destroyed {
            return Err(WalletError::NotFoundError(format!("master wallet {} was destroyed", self.info.id)));
        }
        Ok(())
    }

    pub fn ensure_live(&self) -> Result<()> {
        self.live(&self.state.lock())
    }

    /// Unlocks the root material, hands it to `f` and drops it again.
    pub fn with_root<T>(&self, pay_password: &str, f: impl FnOnce(&RootMaterial) -> Result<T>) -> Result<T> {
        let state = self.state.lock();
        self.live(&state)?;
        let vault = state
            .vault
            .as_ref()
            .ok_or_else(|| WalletError::capability("readonly wallet holds no private key"))?;
        let root = vault.unlock(pay_password)?;
        f(&root)
    }

    pub fn verify_pay_password(&self, pay_password: &str) -> Result<()> {
        let state = self.state.lock();
        self.live(&state)?;
        match &state.vault {
            Some(vault) => vault.verify_password(pay_password),
            None => Err(WalletError::capability("readonly wallet has no pay password")),
        }
    }

    /// Checks `passphrase` by re-deriving the root from the stored mnemonic.
    pub fn verify_passphrase(&self, passphrase: &str, pay_password: &str) -> Result<()> {
        let binding = self.with_root(pay_password, |root| {
            let mnemonic = root
                .mnemonic()
                .ok_or_else(|| WalletError::capability("wallet was not created from a mnemonic"))?;
            self.binding_for(mnemonic, passphrase).map(|(binding, _)| binding)
        })?;
        if binding != self.keys.binding() {
            return Err(WalletError::AuthenticationError("wrong passphrase".into()));
        }
        Ok(())
    }

    fn binding_for(&self, mnemonic: &str, passphrase: &str) -> Result<(Vec<u8>, RootMaterial)> {
        let (mnemonic, seed) = DerivationEngine::derive_seed(mnemonic, passphrase)?;
        let root = RootMaterial::Seed { seed, mnemonic: Some(mnemonic) };
        let ela = self.engine.derive_account_key(&root, KeyPurpose::Ela)?.to_extended_public()?;
        let mut binding = ela.fingerprint().to_vec();
        binding.extend_from_slice(ela.chain_code());
        Ok((binding, root))
    }

    pub fn change_password(&self, old: &str, new: &str) -> Result<()> {
        self.change_password_with(old, new, |_| Ok(()))
    }

    /// Password rotation with a hook run after each re-sealed secret.
    pub fn change_password_with(
        &self,
        old: &str,
        new: &str,
        after_each: impl FnMut(usize) -> Result<()>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        self.live(&state)?;
        let vault = state
            .vault
            .as_mut()
            .ok_or_else(|| WalletError::capability("readonly wallet has no pay password"))?;
        vault.change_password_with(old, new, after_each)?;
        info!(wallet = %self.info.id, "pay password changed");
        Ok(())
    }

    /// Replaces the pay password given the wallet's mnemonic, which must
    /// derive the same keys the wallet was created with.
    pub fn reset_password(&self, mnemonic: &str, passphrase: &str, new: &str) -> Result<()> {
        let (binding, root) = self.binding_for(mnemonic, passphrase)?;
        let mut state = self.state.lock();
        self.live(&state)?;
        let vault = state
            .vault
            .as_mut()
            .ok_or_else(|| WalletError::capability("readonly wallet has no pay password"))?;
        vault.reset_password(&root, &binding, new)?;
        info!(wallet = %self.info.id, "pay password reset");
        Ok(())
    }

    pub fn export_mnemonic(&self, pay_password: &str) -> Result<SecretString> {
        self.with_root(pay_password, |root| {
            root.mnemonic()
                .map(|m| Zeroizing::new(m.to_string()))
                .ok_or_else(|| WalletError::capability("wallet holds no mnemonic"))
        })
    }

    /// Seed as hex.
    pub fn export_seed(&self, pay_password: &str) -> Result<SecretString> {
        self.with_root(pay_password, |root| {
            root.seed()
                .map(|s| Zeroizing::new(hex::encode(s)))
                .ok_or_else(|| WalletError::capability("wallet holds no seed"))
        })
    }

    /// Root xprv of the Elastos tree.
    pub fn export_root_xprv(&self, pay_password: &str) -> Result<SecretString> {
        self.with_root(pay_password, |root| match root {
            RootMaterial::Seed { seed, .. } => {
                Ok(ExtendedPrivateKey::from_seed(CurveKind::Secp256r1, seed)?.to_base58())
            }
            RootMaterial::RootXprv(xprv) => Ok(xprv.clone()),
            RootMaterial::SinglePrivateKey(_) => {
                Err(WalletError::capability("a private key wallet has no extended key"))
            }
        })
    }

    /// EVM private key as hex without `0x`.
    pub fn export_evm_private_key(&self, pay_password: &str) -> Result<SecretString> {
        self.with_root(pay_password, |root| {
            let secret = self.engine.signing_secret(root, KeyPurpose::Evm, &[])?;
            Ok(Zeroizing::new(hex::encode(&secret[..])))
        })
    }

    /// Signs a prehashed digest with the key at `location`.
    pub fn sign_prehash(&self, location: &KeyLocation, digest: &[u8; 32], pay_password: &str) -> Result<[u8; 64]> {
        self.with_root(pay_password, |root| {
            let secret = self.engine.signing_secret(root, location.purpose, &location.tail)?;
            location.purpose.curve().sign_prehash(&secret[..], digest)
        })
    }

    /// Raw secret at `location`, for signers outside the Elastos format.
    pub fn secret_at(&self, location: &KeyLocation, pay_password: &str) -> Result<Zeroizing<[u8; 32]>> {
        self.with_root(pay_password, |root| {
            self.engine.signing_secret(root, location.purpose, &location.tail)
        })
    }

    fn span_of(&self, state: &WalletState, chain: ChainId) -> u32 {
        let limit = self.config.chains.address_lookup_limit;
        state
            .sub_wallets
            .get(&chain)
            .map_or(limit, |book| limit.max(book.issued(false)).max(book.issued(true)))
    }

    /// Indexes per branch a key search on `chain` has to cover: the lookup
    /// limit, or every address the book has issued when that is further.
    pub fn lookup_span(&self, chain: ChainId) -> Result<u32> {
        let state = self.state.lock();
        self.live(&state)?;
        Ok(self.span_of(&state, chain))
    }

    /// Address and key index of a UTXO chain. Built on first use and rebuilt
    /// once the address book issues past it.
    pub fn utxo_index(&self, chain: ChainId) -> Result<Arc<UtxoIndex>> {
        let span = {
            let state = self.state.lock();
            self.live(&state)?;
            let span = self.span_of(&state, chain);
            if let Some(index) = state.indexes.get(&chain).filter(|index| index.span >= span) {
                return Ok(Arc::clone(index));
            }
            span
        };
        let built = Arc::new(self.keys.utxo_index(chain, span)?);
        let mut state = self.state.lock();
        self.live(&state)?;
        let index = state.indexes.entry(chain).or_insert_with(|| Arc::clone(&built));
        if index.span < built.span {
            *index = built;
        }
        debug!(wallet = %self.info.id, %chain, span = index.span, addresses = index.codes.len(), "built address index");
        Ok(Arc::clone(index))
    }

    /// Redeem script of a wallet address on a UTXO chain.
    pub fn code_for(&self, chain: ChainId, address: &str) -> Result<Vec<u8>> {
        self.utxo_index(chain)?
            .codes
            .get(address)
            .cloned()
            .ok_or_else(|| WalletError::validation(format!("{} is not an address of this wallet", address)))
    }

    /// Location of the local key behind a wallet address.
    pub fn locate_address(&self, chain: ChainId, address: &str) -> Result<KeyLocation> {
        let index = self.utxo_index(chain)?;
        let code = index
            .codes
            .get(address)
            .ok_or_else(|| WalletError::validation(format!("{} is not an address of this wallet", address)))?;
        Code::parse(code)?
            .public_keys()
            .iter()
            .find_map(|pk| index.keys.get(pk).cloned())
            .ok_or_else(|| WalletError::capability(format!("no local key signs for {}", address)))
    }

    /// Adds this wallet's signatures to a UTXO transaction.
    pub fn sign_utxo_transaction(&self, chain: ChainId, tx: &mut Transaction, pay_password: &str) -> Result<usize> {
        let index = self.utxo_index(chain)?;
        let added = self.with_root(pay_password, |root| {
            let signer = RootSigner { engine: &self.engine, root, index: &index };
            signing::sign_transaction(tx, &signer)
        })?;
        info!(wallet = %self.info.id, %chain, id = %tx.id, added, "signed transaction");
        Ok(added)
    }

    pub fn has_sub_wallet(&self, chain: ChainId) -> bool {
        self.state.lock().sub_wallets.contains_key(&chain)
    }

    /// Opens a sub wallet. Returns false when it already existed.
    pub fn open_sub_wallet(&self, chain: ChainId) -> Result<bool> {
        if !self.info.supports(chain) {
            return Err(WalletError::capability(format!(
                "{:?} wallet {} does not support {}",
                self.info.kind, self.info.id, chain
            )));
        }
        let mut state = self.state.lock();
        self.live(&state)?;
        if state.sub_wallets.contains_key(&chain) {
            return Ok(false);
        }
        let book = AddressBook::new(self.info.single_address, self.config.chains.gap_limit);
        state.sub_wallets.insert(chain, book);
        info!(wallet = %self.info.id, %chain, "sub wallet created");
        Ok(true)
    }

    pub fn close_sub_wallet(&self, chain: ChainId) -> Result<()> {
        let mut state = self.state.lock();
        self.live(&state)?;
        if state.sub_wallets.remove(&chain).is_none() {
            return Err(WalletError::NotFoundError(format!("no {} sub wallet in {}", chain, self.info.id)));
        }
        state.indexes.remove(&chain);
        info!(wallet = %self.info.id, %chain, "sub wallet destroyed");
        Ok(())
    }

    pub fn sub_wallet_chains(&self) -> Vec<ChainId> {
        self.state.lock().sub_wallets.keys().copied().collect()
    }

    /// Runs `f` against the address book of an open sub wallet.
    pub fn with_address_book<T>(&self, chain: ChainId, f: impl FnOnce(&mut AddressBook) -> Result<T>) -> Result<T> {
        let mut state = self.state.lock();
        self.live(&state)?;
        let book = state
            .sub_wallets
            .get_mut(&chain)
            .ok_or_else(|| WalletError::NotFoundError(format!("no {} sub wallet in {}", chain, self.info.id)))?;
        f(book)
    }

    /// Drops the sealed secrets and every cached key. Later calls through
    /// any handle fail with `NotFoundError`.
    pub fn destroy(&self) {
        let mut state = self.state.lock();
        state.vault = None;
        state.sub_wallets.clear();
        state.indexes.clear();
        state.destroyed = true;
        info!(wallet = %self.info.id, "master wallet destroyed");
    }
}

//! Master wallet registry
//!
//! Owns every master wallet of one process, keyed by ID, and routes calls to
//! their sub wallets.
//!
//! ## Module Structure
//! - `lifecycle` - create, import, list and destroy master wallets
//! - `export` - keystore, mnemonic, seed and private key export
//! - `password` - pay password and passphrase checks and rotation
//! - `subwallets` - sub wallet creation, lookup and address validation

pub mod export;
pub mod lifecycle;
pub mod password;
pub mod subwallets;

pub use export::Keystore;

use crate::core::config::WalletConfig;
use crate::core::derivation::DerivationEngine;
use crate::core::errors::{Result, WalletError};
use crate::core::master_wallet::MasterWallet;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Entry point of the wallet engine.
///
/// Safe to share between threads. The registry lock is held only to look a
/// wallet up or to insert and remove one; all work on a wallet runs under
/// that wallet's own lock.
pub struct MasterWalletManager {
    config: WalletConfig,
    engine: DerivationEngine,
    wallets: RwLock<HashMap<String, Arc<MasterWallet>>>,
}

impl MasterWalletManager {
    pub fn new(config: WalletConfig) -> Result<Self> {
        config.validate()?;
        info!(network = %config.network, "wallet manager ready");
        Ok(Self {
            engine: DerivationEngine::new(config.network),
            config,
            wallets: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn engine(&self) -> &DerivationEngine {
        &self.engine
    }

    /// The wallet registered under `id`.
    pub fn wallet(&self, id: &str) -> Result<Arc<MasterWallet>> {
        self.wallets
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| WalletError::NotFoundError(format!("master wallet {} not found", id)))
    }

    fn existing(&self, id: &str) -> Option<Arc<MasterWallet>> {
        self.wallets.read().get(id).cloned()
    }

    /// Registers `wallet` unless its ID is taken, in which case the wallet
    /// already there wins.
    fn register(&self, wallet: MasterWallet) -> Arc<MasterWallet> {
        let mut wallets = self.wallets.write();
        let id = wallet.id().to_string();
        let entry = wallets.entry(id).or_insert_with(|| Arc::new(wallet));
        Arc::clone(entry)
    }
}

fn check_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(WalletError::validation("master wallet ID must not be empty"));
    }
    Ok(())
}

impl std::fmt::Debug for MasterWalletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterWalletManager")
            .field("network", &self.config.network)
            .field("wallets", &self.wallets.read().len())
            .finish()
    }
}

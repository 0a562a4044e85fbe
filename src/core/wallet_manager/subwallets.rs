//! Sub wallet routing.

use super::MasterWalletManager;
use crate::core::chain::ChainId;
use crate::core::errors::{Result, WalletError};
use crate::subwallet::{self, is_valid_for_family, SubWallet};
use std::sync::Arc;

impl MasterWalletManager {
    pub fn get_supported_chains(&self, id: &str) -> Result<Vec<ChainId>> {
        Ok(self.wallet(id)?.info().supported_chains())
    }

    /// Opens the sub wallet for `chain`, or returns it when already open.
    pub fn create_sub_wallet(&self, id: &str, chain: &str) -> Result<Arc<dyn SubWallet>> {
        let chain: ChainId = chain.parse()?;
        let wallet = self.wallet(id)?;
        wallet.open_sub_wallet(chain)?;
        subwallet::open(wallet, chain)
    }

    pub fn get_sub_wallet(&self, id: &str, chain: &str) -> Result<Arc<dyn SubWallet>> {
        let chain: ChainId = chain.parse()?;
        let wallet = self.wallet(id)?;
        if !wallet.has_sub_wallet(chain) {
            return Err(WalletError::NotFoundError(format!("{} has no {} sub wallet", id, chain)));
        }
        subwallet::open(wallet, chain)
    }

    pub fn get_all_sub_wallets(&self, id: &str) -> Result<Vec<Arc<dyn SubWallet>>> {
        let wallet = self.wallet(id)?;
        wallet
            .sub_wallet_chains()
            .into_iter()
            .map(|chain| subwallet::open(Arc::clone(&wallet), chain))
            .collect()
    }

    pub fn destroy_sub_wallet(&self, id: &str, chain: &str) -> Result<()> {
        let chain: ChainId = chain.parse()?;
        self.wallet(id)?.close_sub_wallet(chain)
    }

    /// Whether `address` is an Elastos address of any kind.
    pub fn is_address_valid(&self, address: &str) -> bool {
        crate::blockchain::elastos::address::is_valid(address)
    }

    /// Whether `address` is valid on `chain` under the configured network.
    pub fn is_sub_wallet_address_valid(&self, chain: &str, address: &str) -> Result<bool> {
        let chain: ChainId = chain.parse()?;
        Ok(is_valid_for_family(chain.family(), address, self.config.network))
    }
}

//! EVM side chain sub wallet
//!
//! One account per wallet at m/44'/60'/0'/0/0. Transfers are legacy EIP-155
//! transactions built and signed offline; the caller supplies the nonce and
//! gas parameters.

use super::{parse_digest, SubWallet};
use crate::blockchain::ethereum::{self, AmountUnit, EvmTransaction, TransferRequest};
use crate::core::chain::ChainId;
use crate::core::derivation::KeyPurpose;
use crate::core::errors::{Result, WalletError};
use crate::core::key_ring::KeyLocation;
use crate::core::master_wallet::MasterWallet;
use crate::crypto::signature_utils::CurveKind;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

const ACCOUNT: KeyLocation = KeyLocation { purpose: KeyPurpose::Evm, tail: Vec::new() };

#[derive(Debug, Clone)]
pub struct EthSidechainSubWallet {
    wallet: Arc<MasterWallet>,
    chain: ChainId,
}

impl EthSidechainSubWallet {
    pub fn new(wallet: Arc<MasterWallet>, chain: ChainId) -> Self {
        Self { wallet, chain }
    }

    /// The account address.
    pub fn address(&self) -> Result<String> {
        self.wallet.ensure_live()?;
        ethereum::address_from_public_key(&self.wallet.keys().evm_public_key()?)
    }

    /// Uncompressed account public key, hex.
    pub fn public_key(&self) -> Result<String> {
        self.wallet.ensure_live()?;
        let pk = self.wallet.keys().evm_public_key()?;
        Ok(hex::encode(CurveKind::Secp256k1.uncompressed_public(&pk)?))
    }

    pub fn evm_chain_id(&self) -> Result<u64> {
        self.wallet.config().evm_chain_id(self.chain)
    }

    /// Plain value transfer. Amount units are 0 (wei), 3 (gwei) or 6 (ether).
    #[allow(clippy::too_many_arguments)]
    pub fn create_transfer(
        &self,
        target: &str,
        amount: &str,
        amount_unit: u32,
        gas_price: &str,
        gas_price_unit: u32,
        gas_limit: &str,
        nonce: u64,
    ) -> Result<Value> {
        self.create_transfer_generic(target, amount, amount_unit, gas_price, gas_price_unit, gas_limit, "", nonce)
    }

    /// Transfer carrying contract call `data` (hex, optional `0x`).
    #[allow(clippy::too_many_arguments)]
    pub fn create_transfer_generic(
        &self,
        target: &str,
        amount: &str,
        amount_unit: u32,
        gas_price: &str,
        gas_price_unit: u32,
        gas_limit: &str,
        data: &str,
        nonce: u64,
    ) -> Result<Value> {
        self.wallet.ensure_live()?;
        let request = TransferRequest {
            to: target,
            amount,
            amount_unit: AmountUnit::from_code(amount_unit)?,
            gas_price,
            gas_price_unit: AmountUnit::from_code(gas_price_unit)?,
            gas_limit,
            data,
            nonce,
        };
        let tx = EvmTransaction::create(self.chain.as_str(), self.evm_chain_id()?, &request)?;
        info!(wallet = %self.wallet.id(), chain = %self.chain, nonce, "transaction created");
        Ok(serde_json::to_value(tx)?)
    }

    fn parse(&self, tx: &Value) -> Result<EvmTransaction> {
        let tx = EvmTransaction::from_json(tx)?;
        if tx.chain_id != self.chain.as_str() {
            return Err(WalletError::validation(format!(
                "transaction belongs to {}, not {}",
                tx.chain_id, self.chain
            )));
        }
        Ok(tx)
    }
}

impl SubWallet for EthSidechainSubWallet {
    fn chain_id(&self) -> ChainId {
        self.chain
    }

    fn master_wallet(&self) -> &Arc<MasterWallet> {
        &self.wallet
    }

    fn address_at(&self, _index: u32, _internal: bool) -> Result<String> {
        self.address()
    }

    fn public_key_at(&self, _index: u32, _internal: bool) -> Result<String> {
        self.public_key()
    }

    fn single_address(&self) -> bool {
        true
    }

    fn get_addresses(&self, _index: u32, _count: u32, _internal: bool) -> Result<Vec<String>> {
        Ok(vec![self.address()?])
    }

    fn get_public_keys(&self, _index: u32, _count: u32, _internal: bool) -> Result<Vec<String>> {
        Ok(vec![self.public_key()?])
    }

    fn is_address_valid(&self, address: &str) -> bool {
        ethereum::is_valid_address(address)
    }

    fn sign_transaction(&self, tx: &Value, pay_password: &str) -> Result<Value> {
        let mut tx = self.parse(tx)?;
        let secret = self.wallet.secret_at(&ACCOUNT, pay_password)?;
        tx.sign(&secret[..])?;
        info!(wallet = %self.wallet.id(), chain = %self.chain, hash = ?tx.hash, "signed transaction");
        Ok(serde_json::to_value(tx)?)
    }

    fn convert_to_raw_transaction(&self, tx: &Value) -> Result<String> {
        self.parse(tx)?.signed_raw()
    }

    fn sign_digest(&self, address: &str, digest: &str, pay_password: &str) -> Result<String> {
        if !address.eq_ignore_ascii_case(&self.address()?) {
            return Err(WalletError::validation(format!("{} is not an address of this wallet", address)));
        }
        let digest = parse_digest(digest)?;
        Ok(hex::encode(self.wallet.sign_prehash(&ACCOUNT, &digest, pay_password)?))
    }

    fn as_evm(&self) -> Result<&EthSidechainSubWallet> {
        Ok(self)
    }
}

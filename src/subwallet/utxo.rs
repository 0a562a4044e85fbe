//! Operations shared by the Elastos UTXO chains.

use super::parse_digest;
use crate::blockchain::elastos::address::{self, ProgramHash};
use crate::blockchain::elastos::builder::TxBuilder;
use crate::blockchain::elastos::payload::{parse_amount, tx_type, PayloadBytes};
use crate::blockchain::elastos::signing;
use crate::blockchain::elastos::utxo::{parse_inputs, parse_outputs};
use crate::blockchain::elastos::Transaction;
use crate::core::chain::ChainId;
use crate::core::errors::{Result, WalletError};
use crate::core::master_wallet::MasterWallet;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Wallet and chain a UTXO sub wallet works on.
#[derive(Debug, Clone)]
pub struct UtxoCore {
    wallet: Arc<MasterWallet>,
    chain: ChainId,
}

impl UtxoCore {
    pub fn new(wallet: Arc<MasterWallet>, chain: ChainId) -> Self {
        Self { wallet, chain }
    }

    pub fn wallet(&self) -> &Arc<MasterWallet> {
        &self.wallet
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn address_at(&self, index: u32, internal: bool) -> Result<String> {
        self.wallet.ensure_live()?;
        self.wallet.keys().utxo_address(self.chain, index, internal)
    }

    /// Local key hex; for multi-sign wallets the local co-signer key.
    pub fn public_key_at(&self, index: u32, internal: bool) -> Result<String> {
        self.wallet.ensure_live()?;
        Ok(hex::encode(self.wallet.keys().address_public_key(self.chain, index, internal)?))
    }

    /// Starts a transaction of this chain with `payload`.
    pub fn builder(&self, payload: PayloadBytes, inputs: &Value, fee: &str, memo: &str) -> Result<TxBuilder> {
        self.wallet.ensure_live()?;
        Ok(TxBuilder::new(self.chain, payload)
            .inputs(parse_inputs(inputs)?)
            .fee(parse_amount("Fee", fee)?)
            .memo(memo))
    }

    /// Finishes a transaction whose inputs all belong to this wallet.
    pub fn finish(&self, builder: TxBuilder) -> Result<Value> {
        let tx = builder.build(|address| self.wallet.code_for(self.chain, address))?;
        info!(wallet = %self.wallet.id(), chain = %self.chain, id = %tx.id, tx_type = tx.tx_type, "transaction created");
        tx.to_json()
    }

    /// Finishes a transaction spending inputs this wallet does not own and
    /// authorized by its payload alone, so it carries no programs.
    pub fn finish_unowned(&self, builder: TxBuilder) -> Result<Value> {
        let mut tx = builder.build(|_| Ok(Vec::new()))?;
        tx.programs.clear();
        info!(wallet = %self.wallet.id(), chain = %self.chain, id = %tx.id, tx_type = tx.tx_type, "transaction created");
        tx.to_json()
    }

    /// Plain transfer to every output, change back to the first input.
    pub fn create_transaction(&self, inputs: &Value, outputs: &Value, fee: &str, memo: &str) -> Result<Value> {
        let mut builder = self.builder(PayloadBytes::empty(tx_type::TRANSFER_ASSET), inputs, fee, memo)?;
        for output in parse_outputs(outputs)? {
            builder = builder.pay_to(&output.address, parse_amount("Amount", &output.amount)?)?;
        }
        self.finish(builder)
    }

    pub fn sign_transaction(&self, tx: &Value, pay_password: &str) -> Result<Value> {
        let mut tx = self.parse(tx)?;
        self.wallet.sign_utxo_transaction(self.chain, &mut tx, pay_password)?;
        tx.to_json()
    }

    pub fn parse(&self, tx: &Value) -> Result<Transaction> {
        let tx = Transaction::from_json(tx)?;
        if tx.chain_id != self.chain.as_str() {
            return Err(WalletError::validation(format!(
                "transaction belongs to {}, not {}",
                tx.chain_id, self.chain
            )));
        }
        Ok(tx)
    }

    pub fn signed_info(&self, tx: &Value) -> Result<Value> {
        signing::signed_info(&self.parse(tx)?)
    }

    pub fn convert_to_raw(&self, tx: &Value) -> Result<String> {
        signing::convert_to_raw(&self.parse(tx)?)
    }

    pub fn sign_digest(&self, address: &str, digest: &str, pay_password: &str) -> Result<String> {
        let digest = parse_digest(digest)?;
        let location = self.wallet.locate_address(self.chain, address)?;
        Ok(hex::encode(self.wallet.sign_prehash(&location, &digest, pay_password)?))
    }

    pub fn is_address_valid(&self, address: &str) -> bool {
        address::is_valid(address)
    }

    /// Program hash of an address, for outputs built by hand.
    pub fn program_hash(address: &str) -> Result<ProgramHash> {
        ProgramHash::from_address(address)
            .map_err(|_| WalletError::validation(format!("invalid address {}", address)))
    }
}

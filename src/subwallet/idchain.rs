//! ID chain sub wallet: DIDs, DID transactions and withdrawals to the main
//! chain.

use super::utxo::UtxoCore;
use super::{parse_digest, SubWallet};
use crate::blockchain::elastos::address::{self, ProgramHash};
use crate::blockchain::elastos::payload::cross_chain::{locked_amount, TransferCrossChainAsset};
use crate::blockchain::elastos::payload::did::DidOperation;
use crate::blockchain::elastos::transaction::TxOutput;
use crate::core::chain::ChainId;
use crate::core::derivation::{address_range, KeyPurpose};
use crate::core::errors::{Result, WalletError};
use crate::core::key_ring::KeyLocation;
use crate::core::master_wallet::MasterWallet;
use crate::crypto::hash::sha256;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct IdChainSubWallet {
    utxo: UtxoCore,
}

impl IdChainSubWallet {
    pub fn new(wallet: Arc<MasterWallet>) -> Self {
        Self { utxo: UtxoCore::new(wallet, ChainId::IdChain) }
    }

    fn wallet(&self) -> &Arc<MasterWallet> {
        self.utxo.wallet()
    }

    /// DIDs are bound to one key, so multi-sign wallets have none.
    fn did_key(&self, index: u32) -> Result<[u8; 33]> {
        self.wallet().ensure_live()?;
        if self.wallet().keys().is_multisig() {
            return Err(WalletError::capability("multi-sign wallets have no DID"));
        }
        self.wallet().keys().address_public_key(ChainId::IdChain, index, false)
    }

    fn keys_in(&self, index: u32, count: u32) -> Result<Vec<[u8; 33]>> {
        let (start, count, _) = address_range(self.single_address(), index, count, false);
        (start..start.saturating_add(count)).map(|i| self.did_key(i)).collect()
    }

    pub fn get_did(&self, index: u32, count: u32) -> Result<Vec<String>> {
        Ok(self.keys_in(index, count)?.iter().map(address::did).collect())
    }

    pub fn get_cid(&self, index: u32, count: u32) -> Result<Vec<String>> {
        Ok(self.keys_in(index, count)?.iter().map(address::cid).collect())
    }

    pub fn get_public_key_did(&self, public_key: &str) -> Result<String> {
        Ok(address::did(&address::parse_public_key(public_key)?))
    }

    pub fn get_public_key_cid(&self, public_key: &str) -> Result<String> {
        Ok(address::cid(&address::parse_public_key(public_key)?))
    }

    /// Publishes a signed DID operation.
    pub fn create_id_transaction(&self, inputs: &Value, payload: &Value, fee: &str, memo: &str) -> Result<Value> {
        let op = DidOperation::from_json(payload)?;
        self.utxo.finish(self.utxo.builder(op.to_payload(), inputs, fee, memo)?)
    }

    /// Burns `amount` plus the cross chain fee on the ID chain and names the
    /// main chain address that receives `amount`.
    pub fn create_withdraw_transaction(
        &self,
        inputs: &Value,
        amount: &str,
        main_chain_address: &str,
        fee: &str,
        memo: &str,
    ) -> Result<Value> {
        if !address::is_valid(main_chain_address) {
            return Err(WalletError::validation(format!("invalid main chain address {}", main_chain_address)));
        }
        let (amount, locked) = locked_amount(amount)?;
        let payload = TransferCrossChainAsset::single(main_chain_address, amount).to_payload();
        let builder = self
            .utxo
            .builder(payload, inputs, fee, memo)?
            .output(TxOutput::ela(ProgramHash::zero(), locked)?);
        self.utxo.finish(builder)
    }

    fn locate_did(&self, did: &str) -> Result<KeyLocation> {
        let span = self.wallet().lookup_span(ChainId::IdChain)?;
        for i in 0..span {
            if address::did(&self.did_key(i)?) == did {
                debug!(wallet = %self.wallet().id(), index = i, "located DID key");
                return Ok(KeyLocation { purpose: KeyPurpose::IdChain, tail: vec![0, i] });
            }
        }
        Err(WalletError::NotFoundError(format!("{} is not a DID of this wallet", did)))
    }

    /// Signs SHA-256 of `message` with the key behind `did`.
    pub fn did_sign(&self, did: &str, message: &str, pay_password: &str) -> Result<String> {
        if message.is_empty() {
            return Err(WalletError::validation("message is empty"));
        }
        let location = self.locate_did(did)?;
        let digest = sha256(message.as_bytes());
        Ok(hex::encode(self.wallet().sign_prehash(&location, &digest, pay_password)?))
    }

    pub fn did_sign_digest(&self, did: &str, digest: &str, pay_password: &str) -> Result<String> {
        let digest = parse_digest(digest)?;
        let location = self.locate_did(did)?;
        Ok(hex::encode(self.wallet().sign_prehash(&location, &digest, pay_password)?))
    }

    /// Checks a `did_sign` signature against a public key.
    pub fn verify_signature(&self, public_key: &str, message: &str, signature: &str) -> Result<bool> {
        let digest = sha256(message.as_bytes());
        self.verify_digest(public_key, &hex::encode(digest), signature)
    }
}

impl SubWallet for IdChainSubWallet {
    fn chain_id(&self) -> ChainId {
        ChainId::IdChain
    }

    fn master_wallet(&self) -> &Arc<MasterWallet> {
        self.utxo.wallet()
    }

    fn address_at(&self, index: u32, internal: bool) -> Result<String> {
        self.utxo.address_at(index, internal)
    }

    fn public_key_at(&self, index: u32, internal: bool) -> Result<String> {
        self.utxo.public_key_at(index, internal)
    }

    fn is_address_valid(&self, address: &str) -> bool {
        self.utxo.is_address_valid(address)
    }

    fn create_transaction(&self, inputs: &Value, outputs: &Value, fee: &str, memo: &str) -> Result<Value> {
        self.utxo.create_transaction(inputs, outputs, fee, memo)
    }

    fn sign_transaction(&self, tx: &Value, pay_password: &str) -> Result<Value> {
        self.utxo.sign_transaction(tx, pay_password)
    }

    fn get_transaction_signed_info(&self, tx: &Value) -> Result<Value> {
        self.utxo.signed_info(tx)
    }

    fn convert_to_raw_transaction(&self, tx: &Value) -> Result<String> {
        self.utxo.convert_to_raw(tx)
    }

    fn sign_digest(&self, address: &str, digest: &str, pay_password: &str) -> Result<String> {
        self.utxo.sign_digest(address, digest, pay_password)
    }

    fn as_idchain(&self) -> Result<&IdChainSubWallet> {
        Ok(self)
    }
}

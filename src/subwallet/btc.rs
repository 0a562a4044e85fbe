//! Bitcoin sub wallet over the m/84' account.

use super::{parse_digest, SubWallet};
use crate::blockchain::bitcoin::{address, AddressType, BtcInput, BtcOutput, BtcTransaction};
use crate::core::chain::ChainId;
use crate::core::derivation::{address_range, KeyPurpose};
use crate::core::errors::{Result, WalletError};
use crate::core::key_ring::KeyLocation;
use crate::core::master_wallet::MasterWallet;
use bitcoin::Network;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct BtcSubWallet {
    wallet: Arc<MasterWallet>,
}

impl BtcSubWallet {
    pub fn new(wallet: Arc<MasterWallet>) -> Self {
        Self { wallet }
    }

    fn network(&self) -> Network {
        self.wallet.engine().network().bitcoin_network()
    }

    fn key_at(&self, index: u32, internal: bool) -> Result<[u8; 33]> {
        self.wallet.ensure_live()?;
        self.wallet.keys().address_public_key(ChainId::Btc, index, internal)
    }

    fn address_of(&self, index: u32, internal: bool, kind: AddressType) -> Result<String> {
        address::from_public_key(&self.key_at(index, internal)?, kind, self.network())
    }

    /// P2PKH addresses of the same keys as the SegWit ones.
    pub fn get_legacy_addresses(&self, index: u32, count: u32, internal: bool) -> Result<Vec<String>> {
        let (start, count, internal) = address_range(self.single_address(), index, count, internal);
        (start..start.saturating_add(count))
            .map(|i| self.address_of(i, internal, AddressType::Legacy))
            .collect()
    }

    /// Spends `inputs` to `outputs` at `fee_per_kb` satoshis per 1000 vbytes.
    /// Change above the dust threshold goes to `change_address`.
    pub fn create_btc_transaction(&self, inputs: &Value, outputs: &Value, change_address: &str, fee_per_kb: u64) -> Result<Value> {
        self.wallet.ensure_live()?;
        let inputs: Vec<BtcInput> = serde_json::from_value(inputs.clone())?;
        let outputs: Vec<BtcOutput> = serde_json::from_value(outputs.clone())?;
        let tx = BtcTransaction::create(self.network(), inputs, &outputs, change_address, fee_per_kb)?;
        info!(wallet = %self.wallet.id(), chain = "BTC", fee = tx.fee, "transaction created");
        Ok(serde_json::to_value(tx)?)
    }

    /// Both address forms of every key the wallet may have handed out.
    fn key_map(&self) -> Result<HashMap<String, KeyLocation>> {
        let span = self.wallet.lookup_span(ChainId::Btc)?;
        let mut map = HashMap::new();
        for internal in [false, true] {
            for i in 0..span {
                let pk = self.key_at(i, internal)?;
                let location = KeyLocation { purpose: KeyPurpose::Btc, tail: vec![u32::from(internal), i] };
                for kind in [AddressType::SegWit, AddressType::Legacy] {
                    map.insert(address::from_public_key(&pk, kind, self.network())?, location.clone());
                }
            }
        }
        Ok(map)
    }

    fn locate(&self, address: &str) -> Result<KeyLocation> {
        self.key_map()?
            .remove(address)
            .ok_or_else(|| WalletError::validation(format!("{} is not an address of this wallet", address)))
    }

    fn parse(&self, tx: &Value) -> Result<BtcTransaction> {
        let tx = BtcTransaction::from_json(tx)?;
        if tx.chain_id != ChainId::Btc.as_str() {
            return Err(WalletError::validation(format!("transaction belongs to {}, not BTC", tx.chain_id)));
        }
        Ok(tx)
    }
}

impl SubWallet for BtcSubWallet {
    fn chain_id(&self) -> ChainId {
        ChainId::Btc
    }

    fn master_wallet(&self) -> &Arc<MasterWallet> {
        &self.wallet
    }

    fn address_at(&self, index: u32, internal: bool) -> Result<String> {
        self.address_of(index, internal, AddressType::SegWit)
    }

    fn public_key_at(&self, index: u32, internal: bool) -> Result<String> {
        Ok(hex::encode(self.key_at(index, internal)?))
    }

    fn is_address_valid(&self, address: &str) -> bool {
        address::validate(address, self.network())
    }

    fn sign_transaction(&self, tx: &Value, pay_password: &str) -> Result<Value> {
        let mut tx = self.parse(tx)?;
        let keys = self.key_map()?;
        self.wallet.verify_pay_password(pay_password)?;
        tx.sign(self.network(), |address| {
            let location = keys
                .get(address)
                .ok_or_else(|| WalletError::validation(format!("{} is not an address of this wallet", address)))?;
            self.wallet.secret_at(location, pay_password)
        })?;
        info!(wallet = %self.wallet.id(), chain = "BTC", id = ?tx.id, "signed transaction");
        Ok(serde_json::to_value(tx)?)
    }

    fn convert_to_raw_transaction(&self, tx: &Value) -> Result<String> {
        self.parse(tx)?
            .signed
            .ok_or_else(|| WalletError::IncompleteSignatureError("transaction is not signed".to_string()))
    }

    fn sign_digest(&self, address: &str, digest: &str, pay_password: &str) -> Result<String> {
        let digest = parse_digest(digest)?;
        let location = self.locate(address)?;
        Ok(hex::encode(self.wallet.sign_prehash(&location, &digest, pay_password)?))
    }

    fn as_btc(&self) -> Result<&BtcSubWallet> {
        Ok(self)
    }
}

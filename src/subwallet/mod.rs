//! Per-chain wallet façades
//!
//! A sub wallet owns no key material. It borrows its master wallet's public
//! key ring for addresses and goes back to the master wallet's vault for
//! every signature.
//!
//! - `address_book` - incremental address issuance with usage tracking
//! - `utxo` - operations shared by the main chain and the ID chain
//! - `mainchain` - deposits, votes and governance payloads
//! - `idchain` - DIDs, withdrawals and DID transactions
//! - `ethsc` - EVM side chain transfers
//! - `btc` - Bitcoin transactions

pub mod address_book;
#[cfg(feature = "bitcoin")]
pub mod btc;
pub mod ethsc;
pub mod idchain;
pub mod mainchain;
pub mod utxo;

#[cfg(feature = "bitcoin")]
pub use btc::BtcSubWallet;
pub use ethsc::EthSidechainSubWallet;
pub use idchain::IdChainSubWallet;
pub use mainchain::MainchainSubWallet;

use crate::core::chain::{ChainFamily, ChainId};
use crate::core::derivation::address_range;
use crate::core::errors::{Result, WalletError};
use crate::core::master_wallet::MasterWallet;
use serde_json::{json, Value};
use std::sync::Arc;

/// Builds the façade for `chain` over `wallet`.
pub fn open(wallet: Arc<MasterWallet>, chain: ChainId) -> Result<Arc<dyn SubWallet>> {
    Ok(match chain {
        ChainId::Ela => Arc::new(MainchainSubWallet::new(wallet)),
        ChainId::IdChain => Arc::new(IdChainSubWallet::new(wallet)),
        ChainId::EthSc | ChainId::EthDid | ChainId::EthEco => Arc::new(EthSidechainSubWallet::new(wallet, chain)),
        #[cfg(feature = "bitcoin")]
        ChainId::Btc => Arc::new(BtcSubWallet::new(wallet)),
        #[cfg(not(feature = "bitcoin"))]
        ChainId::Btc => return Err(WalletError::capability("built without bitcoin support")),
    })
}

fn unsupported<T>(chain: ChainId, operation: &str) -> Result<T> {
    Err(WalletError::capability(format!("{} is not supported on {}", operation, chain)))
}

impl std::fmt::Debug for dyn SubWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubWallet").field("chain_id", &self.chain_id()).finish()
    }
}

/// Operations every chain offers, plus downcasts to the chain-specific sets.
pub trait SubWallet: Send + Sync {
    fn chain_id(&self) -> ChainId;

    fn master_wallet(&self) -> &Arc<MasterWallet>;

    /// Address at `(internal, index)`.
    fn address_at(&self, index: u32, internal: bool) -> Result<String>;

    /// Public key hex at `(internal, index)`.
    fn public_key_at(&self, index: u32, internal: bool) -> Result<String>;

    fn is_address_valid(&self, address: &str) -> bool;

    fn basic_info(&self) -> Value {
        json!({
            "Info": {
                "ChainID": self.chain_id().as_str(),
                "Family": format!("{:?}", self.chain_id().family()),
            },
            "ChainID": self.chain_id().as_str(),
        })
    }

    fn single_address(&self) -> bool {
        self.master_wallet().info().single_address
    }

    fn get_addresses(&self, index: u32, count: u32, internal: bool) -> Result<Vec<String>> {
        let (start, count, internal) = address_range(self.single_address(), index, count, internal);
        (start..start.saturating_add(count)).map(|i| self.address_at(i, internal)).collect()
    }

    fn get_public_keys(&self, index: u32, count: u32, internal: bool) -> Result<Vec<String>> {
        let (start, count, internal) = address_range(self.single_address(), index, count, internal);
        (start..start.saturating_add(count)).map(|i| self.public_key_at(i, internal)).collect()
    }

    /// First external address not yet marked used.
    fn create_address(&self) -> Result<String> {
        let index = self.master_wallet().with_address_book(self.chain_id(), |book| Ok(book.create_address()))?;
        self.address_at(index, false)
    }

    /// `{"Addresses":[...],"MaxCount":n}` over the issued addresses.
    fn get_all_address(&self, start: u32, count: u32, internal: bool) -> Result<Value> {
        let (indexes, max) = self.master_wallet().with_address_book(self.chain_id(), |book| {
            Ok((book.range(start, count, internal), book.issued(internal)))
        })?;
        let addresses = indexes.into_iter().map(|i| self.address_at(i, internal)).collect::<Result<Vec<_>>>()?;
        Ok(json!({"Addresses": addresses, "MaxCount": max}))
    }

    fn get_last_addresses(&self, internal: bool) -> Result<Vec<String>> {
        let indexes = self
            .master_wallet()
            .with_address_book(self.chain_id(), |book| Ok(book.last_window(internal)))?;
        indexes.into_iter().map(|i| self.address_at(i, internal)).collect()
    }

    /// Marks issued addresses as used. Unknown addresses are ignored.
    fn update_used_address(&self, addresses: &[String]) -> Result<()> {
        let issued = self
            .master_wallet()
            .with_address_book(self.chain_id(), |book| Ok([book.issued(false), book.issued(true)]))?;
        let mut found = Vec::new();
        for (internal, count) in [(false, issued[0]), (true, issued[1])] {
            for i in 0..count {
                if addresses.contains(&self.address_at(i, internal)?) {
                    found.push((i, internal));
                }
            }
        }
        self.master_wallet().with_address_book(self.chain_id(), |book| {
            for (i, internal) in found {
                book.mark_used(i, internal);
            }
            Ok(())
        })
    }

    fn create_transaction(&self, _inputs: &Value, _outputs: &Value, _fee: &str, _memo: &str) -> Result<Value> {
        unsupported(self.chain_id(), "createTransaction")
    }

    fn sign_transaction(&self, tx: &Value, pay_password: &str) -> Result<Value>;

    fn get_transaction_signed_info(&self, _tx: &Value) -> Result<Value> {
        unsupported(self.chain_id(), "getTransactionSignedInfo")
    }

    /// Hex ready for broadcast. Fails unless the transaction is fully signed.
    fn convert_to_raw_transaction(&self, tx: &Value) -> Result<String>;

    /// Signs a 32-byte hex digest with the key behind one of this wallet's
    /// addresses. Returns the 64-byte r‖s signature as hex.
    fn sign_digest(&self, address: &str, digest: &str, pay_password: &str) -> Result<String>;

    fn verify_digest(&self, public_key: &str, digest: &str, signature: &str) -> Result<bool> {
        let curve = crate::core::derivation::KeyPurpose::for_chain(self.chain_id()).curve();
        let public_key = hex::decode(public_key)?;
        let signature = hex::decode(signature)?;
        Ok(curve.verify_prehash(&public_key, &parse_digest(digest)?, &signature))
    }

    fn as_mainchain(&self) -> Result<&MainchainSubWallet> {
        unsupported(self.chain_id(), "main chain operations")
    }

    fn as_idchain(&self) -> Result<&IdChainSubWallet> {
        unsupported(self.chain_id(), "ID chain operations")
    }

    fn as_evm(&self) -> Result<&EthSidechainSubWallet> {
        unsupported(self.chain_id(), "EVM operations")
    }

    #[cfg(feature = "bitcoin")]
    fn as_btc(&self) -> Result<&BtcSubWallet> {
        unsupported(self.chain_id(), "Bitcoin operations")
    }
}

/// Parses a 32-byte digest given as hex.
pub fn parse_digest(digest: &str) -> Result<[u8; 32]> {
    hex::decode(digest.strip_prefix("0x").unwrap_or(digest))?
        .try_into()
        .map_err(|_| WalletError::validation("digest must be 32 bytes"))
}

/// Whether `address` is valid on any chain of `family` under `network`.
pub fn is_valid_for_family(family: ChainFamily, address: &str, network: crate::core::chain::NetworkType) -> bool {
    match family {
        ChainFamily::Utxo => crate::blockchain::elastos::address::is_valid(address),
        ChainFamily::Evm => crate::blockchain::ethereum::is_valid_address(address),
        #[cfg(feature = "bitcoin")]
        ChainFamily::BitcoinCompatible => {
            crate::blockchain::bitcoin::address::validate(address, network.bitcoin_network())
        }
        #[cfg(not(feature = "bitcoin"))]
        ChainFamily::BitcoinCompatible => {
            let _ = network;
            false
        }
    }
}

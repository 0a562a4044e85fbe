// src/core/wallet_info.rs
use crate::core::chain::{ChainFamily, ChainId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Where a master wallet's key material came from. Decides which chains it
/// can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletKind {
    /// BIP39 mnemonic, or a raw seed, held locally.
    Seed,
    /// Root xprv of a multi-sign participant.
    RootXprv,
    /// Single secp256k1 key; EVM chains only.
    PrivateKey,
    /// Co-signer public keys only.
    Readonly,
}

/// Public description of a master wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
    pub id: String,
    pub kind: WalletKind,
    pub created_at: DateTime<Utc>,
    pub single_address: bool,
    pub has_passphrase: bool,
    pub m: u8,
    pub n: u8,
}

impl WalletInfo {
    pub fn new(id: &str, kind: WalletKind, single_address: bool, has_passphrase: bool, m: u8, n: u8) -> Self {
        Self {
            id: id.to_string(),
            kind,
            created_at: Utc::now(),
            single_address,
            has_passphrase,
            m,
            n,
        }
    }

    /// Replaces the creation time, e.g. with the birthday of an imported
    /// wallet. History scans start there.
    pub fn with_created_at(mut self, timestamp: i64) -> Self {
        if let Some(at) = DateTime::from_timestamp(timestamp, 0) {
            self.created_at = at;
        }
        self
    }

    pub fn is_multisig(&self) -> bool {
        self.n > 1
    }

    pub fn readonly(&self) -> bool {
        self.kind == WalletKind::Readonly
    }

    /// Chains this wallet can open a sub wallet on.
    pub fn supports(&self, chain: ChainId) -> bool {
        match self.kind {
            WalletKind::PrivateKey => chain.family() == ChainFamily::Evm,
            WalletKind::RootXprv | WalletKind::Readonly => chain.family() == ChainFamily::Utxo,
            WalletKind::Seed if self.is_multisig() => chain.family() == ChainFamily::Utxo,
            WalletKind::Seed => true,
        }
    }

    pub fn supported_chains(&self) -> Vec<ChainId> {
        ChainId::ALL.iter().copied().filter(|c| self.supports(*c)).collect()
    }

    pub fn basic_info(&self) -> serde_json::Value {
        json!({
            "M": self.m,
            "N": self.n,
            "Readonly": self.readonly(),
            "SingleAddress": self.single_address,
            "Type": if self.is_multisig() { "MultiSign" } else { "Standard" },
            "HasPassPhrase": self.has_passphrase,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_info_shape() {
        let info = WalletInfo::new("w", WalletKind::Readonly, false, false, 2, 3);
        assert_eq!(
            info.basic_info(),
            json!({"M": 2, "N": 3, "Readonly": true, "SingleAddress": false, "Type": "MultiSign", "HasPassPhrase": false})
        );
    }

    #[test]
    fn test_chain_support() {
        let standard = WalletInfo::new("a", WalletKind::Seed, false, false, 1, 1);
        assert_eq!(standard.supported_chains().len(), ChainId::ALL.len());

        let multisig = WalletInfo::new("b", WalletKind::Seed, false, false, 2, 3);
        assert!(multisig.supports(ChainId::IdChain));
        assert!(!multisig.supports(ChainId::EthSc));

        let key = WalletInfo::new("c", WalletKind::PrivateKey, true, false, 1, 1);
        assert_eq!(key.supported_chains(), vec![ChainId::EthSc, ChainId::EthDid, ChainId::EthEco]);
    }

    #[test]
    fn test_created_at_override() {
        let info = WalletInfo::new("d", WalletKind::Seed, false, false, 1, 1).with_created_at(1_600_000_000);
        assert_eq!(info.created_at.timestamp(), 1_600_000_000);
    }
}

//! Chain identifiers, chain families and network types.

use crate::core::errors::{Result, WalletError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network a manager instance operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NetworkType {
    #[default]
    MainNet,
    TestNet,
    RegTest,
    PrvNet,
}

impl NetworkType {
    pub fn is_mainnet(self) -> bool {
        matches!(self, NetworkType::MainNet)
    }

    #[cfg(feature = "bitcoin")]
    pub fn bitcoin_network(self) -> bitcoin::Network {
        match self {
            NetworkType::MainNet => bitcoin::Network::Bitcoin,
            NetworkType::TestNet => bitcoin::Network::Testnet,
            NetworkType::RegTest | NetworkType::PrvNet => bitcoin::Network::Regtest,
        }
    }
}

impl FromStr for NetworkType {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "MainNet" => Ok(NetworkType::MainNet),
            "TestNet" => Ok(NetworkType::TestNet),
            "RegTest" => Ok(NetworkType::RegTest),
            "PrvNet" => Ok(NetworkType::PrvNet),
            other => Err(WalletError::validation(format!("unknown network type: {}", other))),
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkType::MainNet => "MainNet",
            NetworkType::TestNet => "TestNet",
            NetworkType::RegTest => "RegTest",
            NetworkType::PrvNet => "PrvNet",
        };
        f.write_str(s)
    }
}

/// Capability set a sub wallet dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainFamily {
    Utxo,
    Evm,
    BitcoinCompatible,
}

/// Every chain a master wallet can open a sub wallet for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainId {
    Ela,
    IdChain,
    EthSc,
    EthDid,
    EthEco,
    Btc,
}

impl ChainId {
    pub const ALL: [ChainId; 6] = [
        ChainId::Ela,
        ChainId::IdChain,
        ChainId::EthSc,
        ChainId::EthDid,
        ChainId::EthEco,
        ChainId::Btc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChainId::Ela => "ELA",
            ChainId::IdChain => "IDChain",
            ChainId::EthSc => "ETHSC",
            ChainId::EthDid => "ETHDID",
            ChainId::EthEco => "ETHECO",
            ChainId::Btc => "BTC",
        }
    }

    pub fn family(self) -> ChainFamily {
        match self {
            ChainId::Ela | ChainId::IdChain => ChainFamily::Utxo,
            ChainId::EthSc | ChainId::EthDid | ChainId::EthEco => ChainFamily::Evm,
            ChainId::Btc => ChainFamily::BitcoinCompatible,
        }
    }
}

impl FromStr for ChainId {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        ChainId::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| WalletError::validation(format!("invalid chain ID: {}", s)))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_round_trip_and_family() {
        for chain in ChainId::ALL {
            assert_eq!(chain.as_str().parse::<ChainId>().unwrap(), chain);
        }
        assert_eq!(ChainId::IdChain.family(), ChainFamily::Utxo);
        assert_eq!(ChainId::EthDid.family(), ChainFamily::Evm);
        assert_eq!(ChainId::Btc.family(), ChainFamily::BitcoinCompatible);
    }

    #[test]
    fn test_unknown_chain_is_validation_error() {
        let err = "DOGE".parse::<ChainId>().unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn test_network_type_parse() {
        assert_eq!("TestNet".parse::<NetworkType>().unwrap(), NetworkType::TestNet);
        assert!("testnet".parse::<NetworkType>().is_err());
    }
}

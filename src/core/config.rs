use crate::core::chain::{ChainId, NetworkType};
use crate::core::errors::{Result, WalletError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// PBKDF2 iteration count used to seal vault secrets
    #[serde(default = "SecurityConfig::default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,

    /// scrypt cost (log2 N) for keystore export
    #[serde(default = "SecurityConfig::default_keystore_scrypt_log_n")]
    pub keystore_scrypt_log_n: u8,

    #[serde(default = "SecurityConfig::default_keystore_scrypt_r")]
    pub keystore_scrypt_r: u32,

    #[serde(default = "SecurityConfig::default_keystore_scrypt_p")]
    pub keystore_scrypt_p: u32,
}

impl SecurityConfig {
    fn default_pbkdf2_iterations() -> u32 { 100_000 }
    fn default_keystore_scrypt_log_n() -> u8 { 14 }
    fn default_keystore_scrypt_r() -> u32 { 8 }
    fn default_keystore_scrypt_p() -> u32 { 1 }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: Self::default_pbkdf2_iterations(),
            keystore_scrypt_log_n: Self::default_keystore_scrypt_log_n(),
            keystore_scrypt_r: Self::default_keystore_scrypt_r(),
            keystore_scrypt_p: Self::default_keystore_scrypt_p(),
        }
    }
}

/// EVM chain ids for one side chain, per network.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvmChainIds {
    pub mainnet: u64,
    pub testnet: u64,
}

/// Chain-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainsConfig {
    /// Keyed by chain ID string (`ETHSC`, `ETHDID`, `ETHECO`).
    #[serde(default = "ChainsConfig::default_evm")]
    pub evm: HashMap<String, EvmChainIds>,

    /// How many external and internal indexes a signer searches to find the
    /// key owning an input address.
    #[serde(default = "ChainsConfig::default_address_lookup_limit")]
    pub address_lookup_limit: u32,

    /// Window kept ahead of the last used address by the incremental strategy.
    #[serde(default = "ChainsConfig::default_gap_limit")]
    pub gap_limit: u32,
}

impl ChainsConfig {
    fn default_evm() -> HashMap<String, EvmChainIds> {
        let mut evm = HashMap::with_capacity(3);
        evm.insert("ETHSC".to_string(), EvmChainIds { mainnet: 20, testnet: 21 });
        evm.insert("ETHDID".to_string(), EvmChainIds { mainnet: 22, testnet: 23 });
        evm.insert("ETHECO".to_string(), EvmChainIds { mainnet: 860, testnet: 861 });
        evm
    }
    fn default_address_lookup_limit() -> u32 { 100 }
    fn default_gap_limit() -> u32 { 10 }
}

impl Default for ChainsConfig {
    fn default() -> Self {
        Self {
            evm: Self::default_evm(),
            address_lookup_limit: Self::default_address_lookup_limit(),
            gap_limit: Self::default_gap_limit(),
        }
    }
}

/// Wallet engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WalletConfig {
    #[serde(default)]
    pub network: NetworkType,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub chains: ChainsConfig,
}

impl WalletConfig {
    pub fn for_network(network: NetworkType) -> Self {
        Self { network, ..Self::default() }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: WalletConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            WalletError::ConfigError(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.pbkdf2_iterations == 0 {
            return Err(WalletError::ConfigError("pbkdf2_iterations must be positive".into()));
        }
        if self.security.keystore_scrypt_log_n == 0 || self.security.keystore_scrypt_log_n > 20 {
            return Err(WalletError::ConfigError("keystore_scrypt_log_n must be in 1..=20".into()));
        }
        if self.chains.address_lookup_limit == 0 {
            return Err(WalletError::ConfigError("address_lookup_limit must be positive".into()));
        }
        Ok(())
    }

    /// EIP-155 chain id of an EVM side chain on the configured network.
    pub fn evm_chain_id(&self, chain: ChainId) -> Result<u64> {
        let ids = self.chains.evm.get(chain.as_str()).ok_or_else(|| {
            WalletError::ConfigError(format!("no EVM chain id configured for {}", chain))
        })?;
        Ok(if self.network.is_mainnet() { ids.mainnet } else { ids.testnet })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WalletConfig::default();
        assert_eq!(config.network, NetworkType::MainNet);
        assert_eq!(config.security.pbkdf2_iterations, 100_000);
        assert_eq!(config.evm_chain_id(ChainId::EthSc).unwrap(), 20);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = WalletConfig::from_toml_str(
            r#"
            network = "TestNet"
            [security]
            pbkdf2_iterations = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.network, NetworkType::TestNet);
        assert_eq!(config.security.pbkdf2_iterations, 1000);
        assert_eq!(config.security.keystore_scrypt_r, 8);
        assert_eq!(config.evm_chain_id(ChainId::EthSc).unwrap(), 21);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = WalletConfig::from_toml_str("[security]\npbkdf2_iterations = 0\n").unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
    }
}

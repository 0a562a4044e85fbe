//! Hierarchical key derivation
//!
//! One BIP39 seed roots every chain. Elastos chains derive on secp256r1,
//! EVM and Bitcoin on secp256k1; each chain has its own hardened account so
//! an account key never exposes another chain or the root.
//!
//! ## Paths
//! - ELA: m/44'/0'/0'
//! - IDChain: m/44'/0'/2'
//! - producer owner key: m/44'/0'/1'/0/0
//! - multi-sign (xPubKeyHDPM): m/45'
//! - EVM: m/44'/60'/0'/0/0
//! - BTC: m/84'/0'/0' (coin type 1' off main net)

use crate::core::bip44::{DerivationPath, ExtendedPrivateKey, ExtendedPublicKey, HARDENED};
use crate::core::chain::{ChainId, NetworkType};
use crate::core::errors::{Result, WalletError};
use crate::crypto::signature_utils::CurveKind;
use crate::security::password_validator::validate_passphrase;
use crate::security::{RootMaterial, SecretString, SecretVec};
use bip39::{Language, Mnemonic};
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

/// Entropy of generated mnemonics; 16 bytes gives 12 words.
const MNEMONIC_ENTROPY_LEN: usize = 16;

/// Role a key plays, each with its own derivation path and curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPurpose {
    Ela,
    IdChain,
    Owner,
    MultiSign,
    Evm,
    Btc,
}

impl KeyPurpose {
    pub fn for_chain(chain: ChainId) -> Self {
        match chain {
            ChainId::Ela => KeyPurpose::Ela,
            ChainId::IdChain => KeyPurpose::IdChain,
            ChainId::EthSc | ChainId::EthDid | ChainId::EthEco => KeyPurpose::Evm,
            ChainId::Btc => KeyPurpose::Btc,
        }
    }

    pub fn curve(self) -> CurveKind {
        match self {
            KeyPurpose::Ela | KeyPurpose::IdChain | KeyPurpose::Owner | KeyPurpose::MultiSign => {
                CurveKind::Secp256r1
            }
            KeyPurpose::Evm | KeyPurpose::Btc => CurveKind::Secp256k1,
        }
    }

    /// Full path from the root to the account (or, for the owner and EVM
    /// keys, to the single key).
    pub fn path(self, network: NetworkType) -> DerivationPath {
        let h = |i: u32| i | HARDENED;
        let indexes = match self {
            KeyPurpose::Ela => vec![h(44), h(0), h(0)],
            KeyPurpose::IdChain => vec![h(44), h(0), h(2)],
            KeyPurpose::Owner => vec![h(44), h(0), h(1), 0, 0],
            KeyPurpose::MultiSign => vec![h(45)],
            KeyPurpose::Evm => vec![h(44), h(60), h(0), 0, 0],
            KeyPurpose::Btc => {
                let coin = if network.is_mainnet() { 0 } else { 1 };
                vec![h(84), h(coin), h(0)]
            }
        };
        DerivationPath::from(indexes)
    }

    /// Whether addresses hang below the account as `/change/index`.
    pub fn has_address_chain(self) -> bool {
        !matches!(self, KeyPurpose::Owner | KeyPurpose::Evm)
    }
}

/// Derivation over the key tree of one network.
#[derive(Debug, Clone, Copy)]
pub struct DerivationEngine {
    network: NetworkType,
}

impl DerivationEngine {
    pub fn new(network: NetworkType) -> Self {
        Self { network }
    }

    pub fn network(&self) -> NetworkType {
        self.network
    }

    /// Generates a fresh 12 word mnemonic. Only the English word list is
    /// supported.
    pub fn generate_mnemonic(language: &str) -> Result<SecretString> {
        if !language.eq_ignore_ascii_case("english") {
            return Err(WalletError::validation(format!("unsupported mnemonic language: {}", language)));
        }
        let mut entropy = Zeroizing::new([0u8; MNEMONIC_ENTROPY_LEN]);
        rand::rngs::OsRng.fill_bytes(&mut entropy[..]);
        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy[..])
            .map_err(|e| WalletError::crypto(format!("failed to generate mnemonic: {}", e)))?;
        Ok(Zeroizing::new(mnemonic.to_string()))
    }

    /// Parses a phrase after collapsing whitespace and case.
    pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic> {
        let normalized = Zeroizing::new(
            phrase
                .split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join(" "),
        );
        Mnemonic::parse_in_normalized(Language::English, &normalized)
            .map_err(|e| WalletError::validation(format!("invalid mnemonic: {}", e)))
    }

    /// Normalized phrase and its BIP39 seed.
    pub fn derive_seed(phrase: &str, passphrase: &str) -> Result<(SecretString, SecretVec)> {
        validate_passphrase(passphrase)?;
        let mnemonic = Self::parse_mnemonic(phrase)?;
        let seed = Zeroizing::new(mnemonic.to_seed(passphrase).to_vec());
        Ok((Zeroizing::new(mnemonic.to_string()), seed))
    }

    /// Root key and chain code of the tree on `curve`. Same inputs, same
    /// root.
    pub fn derive_root(phrase: &str, passphrase: &str, curve: CurveKind) -> Result<ExtendedPrivateKey> {
        let (_, seed) = Self::derive_seed(phrase, passphrase)?;
        ExtendedPrivateKey::from_seed(curve, &seed)
    }

    /// Account key of `purpose`, derived from whatever root material the
    /// wallet holds.
    pub fn derive_account_key(&self, root: &RootMaterial, purpose: KeyPurpose) -> Result<ExtendedPrivateKey> {
        let path = purpose.path(self.network);
        let key = match root {
            RootMaterial::Seed { seed, .. } => ExtendedPrivateKey::from_seed(purpose.curve(), seed)?,
            RootMaterial::RootXprv(xprv) if purpose.curve() == CurveKind::Secp256r1 => {
                ExtendedPrivateKey::from_base58(CurveKind::Secp256r1, xprv)?
            }
            RootMaterial::RootXprv(_) => {
                return Err(WalletError::capability(format!(
                    "an xprv wallet cannot derive {:?} keys",
                    purpose
                )))
            }
            RootMaterial::SinglePrivateKey(_) => {
                return Err(WalletError::capability("a private key wallet has no key tree"))
            }
        };
        debug!(purpose = ?purpose, path = %path, "deriving account key");
        key.derive_path(&path)
    }

    /// Address key `account/(internal ? 1 : 0)/index`.
    pub fn derive_address_key(account: &ExtendedPublicKey, index: u32, internal: bool) -> Result<ExtendedPublicKey> {
        account.derive_path(&[u32::from(internal), index])
    }

    /// Private key at `tail` below the account of `purpose`. A private key
    /// wallet answers for its EVM key only.
    pub fn signing_secret(&self, root: &RootMaterial, purpose: KeyPurpose, tail: &[u32]) -> Result<Zeroizing<[u8; 32]>> {
        if let RootMaterial::SinglePrivateKey(key) = root {
            if purpose == KeyPurpose::Evm && tail.is_empty() {
                return Ok(key.clone());
            }
            return Err(WalletError::capability(format!("a private key wallet has no {:?} key", purpose)));
        }
        let account = self.derive_account_key(root, purpose)?;
        let key = tail.iter().try_fold(account, |key, i| key.derive_child(*i))?;
        Ok(Zeroizing::new(*key.secret_bytes()))
    }
}

/// Address range actually served: single-address wallets always answer
/// index 0 on the external chain, once.
pub fn address_range(single_address: bool, index: u32, count: u32, internal: bool) -> (u32, u32, bool) {
    if single_address {
        (0, 1, false)
    } else {
        (index, count, internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn seed_root() -> RootMaterial {
        let (mnemonic, seed) = DerivationEngine::derive_seed(MNEMONIC, "").unwrap();
        RootMaterial::Seed { seed, mnemonic: Some(mnemonic) }
    }

    #[test]
    fn test_bip39_seed_vector() {
        let (_, seed) = DerivationEngine::derive_seed(MNEMONIC, "").unwrap();
        assert_eq!(
            hex::encode(&seed[..]),
            "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc19a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4"
        );
    }

    #[test]
    fn test_mnemonic_normalization() {
        let messy = format!("  {}  ", MNEMONIC.to_uppercase().replace(' ', "   "));
        let (normalized, _) = DerivationEngine::derive_seed(&messy, "").unwrap();
        assert_eq!(normalized.as_str(), MNEMONIC);
        assert!(DerivationEngine::parse_mnemonic("abandon abandon").is_err());
    }

    #[test]
    fn test_generate_mnemonic() {
        let words = DerivationEngine::generate_mnemonic("english").unwrap();
        assert_eq!(words.split(' ').count(), 12);
        assert!(DerivationEngine::parse_mnemonic(&words).is_ok());
        let err = DerivationEngine::generate_mnemonic("chinese").unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn test_short_passphrase_rejected() {
        assert!(DerivationEngine::derive_seed(MNEMONIC, "short").is_err());
    }

    #[test]
    fn test_root_is_deterministic() {
        let a = DerivationEngine::derive_root(MNEMONIC, "", CurveKind::Secp256r1).unwrap();
        let b = DerivationEngine::derive_root(MNEMONIC, "", CurveKind::Secp256r1).unwrap();
        assert_eq!(a.chain_code(), b.chain_code());
        assert_eq!(a.public_key().unwrap(), b.public_key().unwrap());
    }

    #[test_case(KeyPurpose::Ela, "m/44'/0'/0'")]
    #[test_case(KeyPurpose::IdChain, "m/44'/0'/2'")]
    #[test_case(KeyPurpose::Owner, "m/44'/0'/1'/0/0")]
    #[test_case(KeyPurpose::MultiSign, "m/45'")]
    #[test_case(KeyPurpose::Evm, "m/44'/60'/0'/0/0")]
    #[test_case(KeyPurpose::Btc, "m/84'/0'/0'")]
    fn test_paths(purpose: KeyPurpose, expected: &str) {
        assert_eq!(purpose.path(NetworkType::MainNet).to_string(), expected);
    }

    #[test]
    fn test_btc_testnet_coin_type() {
        assert_eq!(KeyPurpose::Btc.path(NetworkType::TestNet).to_string(), "m/84'/1'/0'");
    }

    #[test]
    fn test_accounts_are_distinct() {
        let engine = DerivationEngine::new(NetworkType::MainNet);
        let root = seed_root();
        let purposes = [
            KeyPurpose::Ela,
            KeyPurpose::IdChain,
            KeyPurpose::Owner,
            KeyPurpose::MultiSign,
            KeyPurpose::Evm,
            KeyPurpose::Btc,
        ];
        let keys: Vec<[u8; 33]> = purposes
            .iter()
            .map(|p| engine.derive_account_key(&root, *p).unwrap().public_key().unwrap())
            .collect();
        for i in 0..keys.len() {
            for j in i + 1..keys.len() {
                assert_ne!(keys[i], keys[j], "{:?} and {:?}", purposes[i], purposes[j]);
            }
        }
    }

    #[test]
    fn test_evm_key_matches_known_address() {
        let engine = DerivationEngine::new(NetworkType::MainNet);
        let secret = engine.signing_secret(&seed_root(), KeyPurpose::Evm, &[]).unwrap();
        let pk = CurveKind::Secp256k1.public_key(&secret[..]).unwrap();
        assert_eq!(
            crate::blockchain::ethereum::address_from_public_key(&pk).unwrap(),
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
        );
    }

    #[test]
    fn test_public_and_private_address_keys_agree() {
        let engine = DerivationEngine::new(NetworkType::MainNet);
        let root = seed_root();
        let account = engine.derive_account_key(&root, KeyPurpose::Ela).unwrap();
        let public = DerivationEngine::derive_address_key(&account.to_extended_public().unwrap(), 3, true).unwrap();
        let secret = engine.signing_secret(&root, KeyPurpose::Ela, &[1, 3]).unwrap();
        assert_eq!(&CurveKind::Secp256r1.public_key(&secret[..]).unwrap(), public.public_key());
    }

    #[test]
    fn test_private_key_wallet_has_no_tree() {
        let engine = DerivationEngine::new(NetworkType::MainNet);
        let root = RootMaterial::SinglePrivateKey(Zeroizing::new([7u8; 32]));
        assert_eq!(*engine.signing_secret(&root, KeyPurpose::Evm, &[]).unwrap(), [7u8; 32]);
        let err = engine.derive_account_key(&root, KeyPurpose::Ela).unwrap_err();
        assert_eq!(err.kind(), "CapabilityError");
    }

    #[test]
    fn test_single_address_range() {
        assert_eq!(address_range(true, 5, 10, true), (0, 1, false));
        assert_eq!(address_range(false, 5, 10, true), (5, 10, true));
    }
}

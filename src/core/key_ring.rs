//! Public half of a master wallet's key tree
//!
//! Account xpubs are derived once, when the wallet is created or imported,
//! so that addresses, public keys and redeem scripts never need the pay
//! password. Only signing goes back to the vault.

use crate::blockchain::elastos::address::{self, Prefix, ProgramHash};
use crate::core::bip44::ExtendedPublicKey;
use crate::core::chain::ChainId;
use crate::core::derivation::{DerivationEngine, KeyPurpose};
use crate::core::errors::{Result, WalletError};
use crate::crypto::multisig::ThresholdPolicy;
use crate::crypto::signature_utils::CurveKind;
use crate::security::RootMaterial;
use std::collections::HashMap;

/// Where a locally held key sits in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLocation {
    pub purpose: KeyPurpose,
    /// Indexes below the account, `[change, index]`, or empty.
    pub tail: Vec<u32>,
}

/// Lookup tables over the first `limit` external and internal addresses of
/// one UTXO chain.
#[derive(Debug, Clone, Default)]
pub struct UtxoIndex {
    /// Address to redeem script.
    pub codes: HashMap<String, Vec<u8>>,
    /// Local public key to its location.
    pub keys: HashMap<[u8; 33], KeyLocation>,
    /// Indexes covered on each branch.
    pub span: u32,
}

#[derive(Debug, Clone)]
pub struct PublicKeyRing {
    ela: Option<ExtendedPublicKey>,
    id_chain: Option<ExtendedPublicKey>,
    btc: Option<ExtendedPublicKey>,
    owner: Option<[u8; 33]>,
    evm: Option<[u8; 33]>,
    /// Local m/45' key, the wallet's xPubKeyHDPM.
    multisig: Option<ExtendedPublicKey>,
    cosigners: Vec<ExtendedPublicKey>,
    policy: ThresholdPolicy,
}

impl PublicKeyRing {
    /// Derives every public key `root` can produce. `cosigners` are the
    /// other participants' xPubKeyHDPM values; empty for standard wallets.
    pub fn from_root(engine: &DerivationEngine, root: &RootMaterial, cosigners: Vec<ExtendedPublicKey>, m: u8) -> Result<Self> {
        let account = |purpose| -> Result<ExtendedPublicKey> {
            engine.derive_account_key(root, purpose)?.to_extended_public()
        };
        let mut ring = Self::empty();
        match root {
            RootMaterial::Seed { .. } => {
                ring.ela = Some(account(KeyPurpose::Ela)?);
                ring.id_chain = Some(account(KeyPurpose::IdChain)?);
                ring.owner = Some(*account(KeyPurpose::Owner)?.public_key());
                ring.multisig = Some(account(KeyPurpose::MultiSign)?);
                ring.evm = Some(*account(KeyPurpose::Evm)?.public_key());
                ring.btc = Some(account(KeyPurpose::Btc)?);
            }
            RootMaterial::RootXprv(_) => {
                ring.ela = Some(account(KeyPurpose::Ela)?);
                ring.id_chain = Some(account(KeyPurpose::IdChain)?);
                ring.owner = Some(*account(KeyPurpose::Owner)?.public_key());
                ring.multisig = Some(account(KeyPurpose::MultiSign)?);
            }
            RootMaterial::SinglePrivateKey(key) => {
                ring.evm = Some(CurveKind::Secp256k1.public_key(&key[..])?);
            }
        }
        ring.set_cosigners(cosigners, m)?;
        Ok(ring)
    }

    /// Watch-only multi-sign ring built from co-signer keys alone.
    pub fn readonly(cosigners: Vec<ExtendedPublicKey>, m: u8) -> Result<Self> {
        if cosigners.len() < 2 {
            return Err(WalletError::validation("a readonly multi-sign wallet needs at least two co-signers"));
        }
        let mut ring = Self::empty();
        ring.set_cosigners(cosigners, m)?;
        Ok(ring)
    }

    fn empty() -> Self {
        Self {
            ela: None,
            id_chain: None,
            btc: None,
            owner: None,
            evm: None,
            multisig: None,
            cosigners: Vec::new(),
            policy: ThresholdPolicy::single(),
        }
    }

    fn set_cosigners(&mut self, cosigners: Vec<ExtendedPublicKey>, m: u8) -> Result<()> {
        if cosigners.is_empty() {
            if m > 1 {
                return Err(WalletError::validation("M exceeds the number of co-signers"));
            }
            return Ok(());
        }
        let mut seen: Vec<&[u8; 33]> = Vec::new();
        for key in self.multisig.iter().chain(cosigners.iter()) {
            if key.curve() != CurveKind::Secp256r1 {
                return Err(WalletError::validation("co-signer keys must be secp256r1 xpubs"));
            }
            if seen.contains(&key.public_key()) {
                return Err(WalletError::validation("duplicate co-signer public key"));
            }
            seen.push(key.public_key());
        }
        let n = u8::try_from(seen.len()).map_err(|_| WalletError::validation("too many co-signers"))?;
        self.policy = ThresholdPolicy::new(m, n)?;
        self.cosigners = cosigners;
        Ok(())
    }

    pub fn policy(&self) -> ThresholdPolicy {
        self.policy
    }

    pub fn is_multisig(&self) -> bool {
        !self.cosigners.is_empty()
    }

    pub fn has_local_multisig_key(&self) -> bool {
        self.multisig.is_some()
    }

    /// Account xpub of a chain with an address tree.
    pub fn account(&self, purpose: KeyPurpose) -> Result<&ExtendedPublicKey> {
        let key = match purpose {
            KeyPurpose::Ela => self.ela.as_ref(),
            KeyPurpose::IdChain => self.id_chain.as_ref(),
            KeyPurpose::Btc => self.btc.as_ref(),
            KeyPurpose::MultiSign => self.multisig.as_ref(),
            KeyPurpose::Owner | KeyPurpose::Evm => None,
        };
        key.ok_or_else(|| WalletError::capability(format!("this wallet holds no {:?} account", purpose)))
    }

    pub fn owner_public_key(&self) -> Result<[u8; 33]> {
        self.owner
            .ok_or_else(|| WalletError::capability("this wallet holds no owner key"))
    }

    pub fn evm_public_key(&self) -> Result<[u8; 33]> {
        self.evm
            .ok_or_else(|| WalletError::capability("this wallet holds no EVM key"))
    }

    /// CR key: main chain external index 0.
    pub fn cr_public_key(&self) -> Result<[u8; 33]> {
        let ela = self.account(KeyPurpose::Ela)?;
        Ok(*DerivationEngine::derive_address_key(ela, 0, false)?.public_key())
    }

    /// Every participant's xPubKeyHDPM, local one first.
    pub fn multisig_keys(&self) -> Vec<&ExtendedPublicKey> {
        self.multisig.iter().chain(self.cosigners.iter()).collect()
    }

    /// The other participants' keys, as given at creation.
    pub fn cosigners(&self) -> &[ExtendedPublicKey] {
        &self.cosigners
    }

    /// Public data tying vault secrets to this wallet: the ELA account
    /// fingerprint and chain code when there is one.
    pub fn binding(&self) -> Vec<u8> {
        if let Some(ela) = &self.ela {
            let mut out = ela.fingerprint().to_vec();
            out.extend_from_slice(ela.chain_code());
            return out;
        }
        if let Some(evm) = &self.evm {
            return evm.to_vec();
        }
        Vec::new()
    }

    /// Public key at `(internal, index)` of a UTXO or BTC chain. Multi-sign
    /// wallets answer with their local multi-sign key.
    pub fn address_public_key(&self, chain: ChainId, index: u32, internal: bool) -> Result<[u8; 33]> {
        let account = if self.is_multisig() {
            self.account(KeyPurpose::MultiSign)?
        } else {
            self.account(KeyPurpose::for_chain(chain))?
        };
        Ok(*DerivationEngine::derive_address_key(account, index, internal)?.public_key())
    }

    /// Redeem script behind the Elastos address at `(internal, index)`.
    pub fn utxo_code(&self, chain: ChainId, index: u32, internal: bool) -> Result<Vec<u8>> {
        if self.is_multisig() {
            let keys = self
                .multisig_keys()
                .into_iter()
                .map(|xpub| Ok(*DerivationEngine::derive_address_key(xpub, index, internal)?.public_key()))
                .collect::<Result<Vec<_>>>()?;
            return address::multisig_code(self.policy.required, &keys);
        }
        Ok(address::standard_code(&self.address_public_key(chain, index, internal)?))
    }

    pub fn utxo_address(&self, chain: ChainId, index: u32, internal: bool) -> Result<String> {
        let code = self.utxo_code(chain, index, internal)?;
        let prefix = if self.is_multisig() { Prefix::MultiSign } else { Prefix::Standard };
        Ok(ProgramHash::from_code(prefix, &code).to_address())
    }

    /// Address and key tables of a UTXO chain, over `limit` indexes on each
    /// branch, plus the owner, deposit and CR keys on the main chain.
    pub fn utxo_index(&self, chain: ChainId, limit: u32) -> Result<UtxoIndex> {
        let mut index = UtxoIndex { span: limit, ..UtxoIndex::default() };
        let local_purpose = if self.is_multisig() { KeyPurpose::MultiSign } else { KeyPurpose::for_chain(chain) };
        let local = self.account(local_purpose).ok();
        for internal in [false, true] {
            for i in 0..limit {
                let code = self.utxo_code(chain, i, internal)?;
                let prefix = if self.is_multisig() { Prefix::MultiSign } else { Prefix::Standard };
                index.codes.insert(ProgramHash::from_code(prefix, &code).to_address(), code);
                if let Some(account) = local {
                    let pk = *DerivationEngine::derive_address_key(account, i, internal)?.public_key();
                    let tail = vec![u32::from(internal), i];
                    index.keys.insert(pk, KeyLocation { purpose: local_purpose, tail });
                }
            }
        }
        if chain == ChainId::Ela && !self.is_multisig() {
            if let Some(owner) = self.owner {
                let code = address::standard_code(&owner);
                index.codes.insert(address::standard_address(&owner), code.clone());
                index.codes.insert(address::deposit_address(&owner), code);
                index.keys.insert(owner, KeyLocation { purpose: KeyPurpose::Owner, tail: Vec::new() });
            }
            if let Ok(cr) = self.cr_public_key() {
                index.codes.insert(address::deposit_address(&cr), address::standard_code(&cr));
            }
        }
        Ok(index)
    }

    /// `getPubKeyInfo` document.
    pub fn pub_key_info(&self, single_address: bool, readonly: bool) -> serde_json::Value {
        let hex_opt = |k: Option<[u8; 33]>| k.map(hex::encode);
        serde_json::json!({
            "derivationStrategy": if self.is_multisig() { "BIP45" } else { "BIP44" },
            "m": self.policy.required,
            "n": self.policy.total,
            "publicKeyRing": self.multisig_keys().iter().map(|k| k.to_base58()).collect::<Vec<_>>(),
            "xPubKey": self.ela.as_ref().map(|k| k.to_base58()),
            "xPubKeyHDPM": self.multisig.as_ref().map(|k| k.to_base58()),
            "ownerPubKey": hex_opt(self.owner),
            "readonly": readonly,
            "singleAddress": single_address,
        })
    }
}

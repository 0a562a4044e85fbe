//! BIP32 hierarchical deterministic keys over secp256r1 and secp256k1
//!
//! Both curves share the BIP32 layout: HMAC-SHA512 master generation with
//! the "Bitcoin seed" key, hardened indexes at and above 2^31, and the
//! 78-byte base58check serialization with the xprv/xpub version bytes.

use crate::core::errors::{Result, WalletError};
use crate::crypto::base58;
use crate::crypto::hash::hash160;
use crate::crypto::signature_utils::CurveKind;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

type HmacSha512 = Hmac<Sha512>;

pub const HARDENED: u32 = 0x8000_0000;
const XPRV_VERSION: [u8; 4] = [0x04, 0x88, 0xAD, 0xE4];
const XPUB_VERSION: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];

/// Parsed derivation path such as `m/44'/0'/0'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    pub fn indexes(&self) -> &[u32] {
        &self.0
    }

    pub fn child(&self, index: u32) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }
}

impl From<Vec<u32>> for DerivationPath {
    fn from(indexes: Vec<u32>) -> Self {
        Self(indexes)
    }
}

impl FromStr for DerivationPath {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('/');
        if parts.next() != Some("m") {
            return Err(WalletError::validation(format!("derivation path must start with m: {}", s)));
        }
        let indexes = parts
            .map(|part| {
                let (digits, hardened) = match part.strip_suffix('\'').or_else(|| part.strip_suffix('h')) {
                    Some(d) => (d, true),
                    None => (part, false),
                };
                let index: u32 = digits
                    .parse()
                    .map_err(|_| WalletError::validation(format!("invalid path component: {}", part)))?;
                if index >= HARDENED {
                    return Err(WalletError::validation(format!("path index out of range: {}", part)));
                }
                Ok(if hardened { index | HARDENED } else { index })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(indexes))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for index in &self.0 {
            if index & HARDENED != 0 {
                write!(f, "/{}'", index & !HARDENED)?;
            } else {
                write!(f, "/{}", index)?;
            }
        }
        Ok(())
    }
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<Zeroizing<[u8; 64]>> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| WalletError::crypto(format!("HMAC initialization failed: {}", e)))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn split_il_ir(i: &[u8; 64]) -> (Zeroizing<[u8; 32]>, [u8; 32]) {
    let mut il = Zeroizing::new([0u8; 32]);
    il.copy_from_slice(&i[..32]);
    let mut ir = [0u8; 32];
    ir.copy_from_slice(&i[32..]);
    (il, ir)
}

/// Extended private key. The secret is zeroed on drop.
#[derive(Clone)]
pub struct ExtendedPrivateKey {
    curve: CurveKind,
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
    chain_code: [u8; 32],
    secret: Zeroizing<[u8; 32]>,
}

impl fmt::Debug for ExtendedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedPrivateKey")
            .field("curve", &self.curve)
            .field("depth", &self.depth)
            .field("child_number", &self.child_number)
            .finish_non_exhaustive()
    }
}

impl ExtendedPrivateKey {
    /// Master key from a BIP39 seed.
    pub fn from_seed(curve: CurveKind, seed: &[u8]) -> Result<Self> {
        if seed.len() < 16 || seed.len() > 64 {
            return Err(WalletError::validation("seed length must be between 16 and 64 bytes"));
        }
        let i = hmac_sha512(b"Bitcoin seed", &[seed])?;
        let (il, chain_code) = split_il_ir(&i);
        curve.validate_secret(&il[..])?;
        Ok(Self {
            curve,
            depth: 0,
            parent_fingerprint: [0; 4],
            child_number: 0,
            chain_code,
            secret: il,
        })
    }

    pub fn curve(&self) -> CurveKind {
        self.curve
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret
    }

    pub fn public_key(&self) -> Result<[u8; 33]> {
        self.curve.public_key(&self.secret[..])
    }

    pub fn derive_child(&self, index: u32) -> Result<Self> {
        let public = self.public_key()?;
        let index_bytes = index.to_be_bytes();
        let i = if index & HARDENED != 0 {
            hmac_sha512(&self.chain_code, &[&[0u8], &self.secret[..], &index_bytes])?
        } else {
            hmac_sha512(&self.chain_code, &[&public, &index_bytes])?
        };
        let (il, chain_code) = split_il_ir(&i);
        let secret = self.curve.tweak_add_secret(&self.secret[..], &il)?;
        let mut parent_fingerprint = [0u8; 4];
        parent_fingerprint.copy_from_slice(&hash160(&public)[..4]);
        Ok(Self {
            curve: self.curve,
            depth: self.depth.saturating_add(1),
            parent_fingerprint,
            child_number: index,
            chain_code,
            secret,
        })
    }

    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self> {
        path.indexes()
            .iter()
            .try_fold(self.clone(), |key, index| key.derive_child(*index))
    }

    pub fn to_extended_public(&self) -> Result<ExtendedPublicKey> {
        Ok(ExtendedPublicKey {
            curve: self.curve,
            depth: self.depth,
            parent_fingerprint: self.parent_fingerprint,
            child_number: self.child_number,
            chain_code: self.chain_code,
            public: self.public_key()?,
        })
    }

    pub fn to_base58(&self) -> Zeroizing<String> {
        let mut data = Zeroizing::new(Vec::with_capacity(78));
        data.extend_from_slice(&XPRV_VERSION);
        data.push(self.depth);
        data.extend_from_slice(&self.parent_fingerprint);
        data.extend_from_slice(&self.child_number.to_be_bytes());
        data.extend_from_slice(&self.chain_code);
        data.push(0);
        data.extend_from_slice(&self.secret[..]);
        Zeroizing::new(base58::encode_check(&data))
    }

    pub fn from_base58(curve: CurveKind, s: &str) -> Result<Self> {
        let data = Zeroizing::new(base58::decode_check(s)?);
        if data.len() != 78 || data[..4] != XPRV_VERSION || data[45] != 0 {
            return Err(WalletError::validation("invalid extended private key"));
        }
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&data[46..78]);
        curve.validate_secret(&secret[..])?;
        let (depth, parent_fingerprint, child_number, chain_code) = parse_header(&data);
        Ok(Self { curve, depth, parent_fingerprint, child_number, chain_code, secret })
    }
}

fn parse_header(data: &[u8]) -> (u8, [u8; 4], u32, [u8; 32]) {
    let mut parent_fingerprint = [0u8; 4];
    parent_fingerprint.copy_from_slice(&data[5..9]);
    let mut child = [0u8; 4];
    child.copy_from_slice(&data[9..13]);
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&data[13..45]);
    (data[4], parent_fingerprint, u32::from_be_bytes(child), chain_code)
}

/// Extended public key, used for watch-only and co-signer derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedPublicKey {
    curve: CurveKind,
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
    chain_code: [u8; 32],
    public: [u8; 33],
}

impl ExtendedPublicKey {
    pub fn curve(&self) -> CurveKind {
        self.curve
    }

    pub fn public_key(&self) -> &[u8; 33] {
        &self.public
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    /// First four bytes of HASH160 of the public key.
    pub fn fingerprint(&self) -> [u8; 4] {
        let mut fp = [0u8; 4];
        fp.copy_from_slice(&hash160(&self.public)[..4]);
        fp
    }

    /// Non-hardened child derivation; hardened indexes need the private key.
    pub fn derive_child(&self, index: u32) -> Result<Self> {
        if index & HARDENED != 0 {
            return Err(WalletError::validation("cannot derive a hardened child from a public key"));
        }
        let i = hmac_sha512(&self.chain_code, &[&self.public, &index.to_be_bytes()])?;
        let (il, chain_code) = split_il_ir(&i);
        let public = self.curve.tweak_add_public(&self.public, &il)?;
        Ok(Self {
            curve: self.curve,
            depth: self.depth.saturating_add(1),
            parent_fingerprint: self.fingerprint(),
            child_number: index,
            chain_code,
            public,
        })
    }

    pub fn derive_path(&self, path: &[u32]) -> Result<Self> {
        path.iter().try_fold(self.clone(), |key, index| key.derive_child(*index))
    }

    pub fn to_base58(&self) -> String {
        let mut data = Vec::with_capacity(78);
        data.extend_from_slice(&XPUB_VERSION);
        data.push(self.depth);
        data.extend_from_slice(&self.parent_fingerprint);
        data.extend_from_slice(&self.child_number.to_be_bytes());
        data.extend_from_slice(&self.chain_code);
        data.extend_from_slice(&self.public);
        base58::encode_check(&data)
    }

    pub fn from_base58(curve: CurveKind, s: &str) -> Result<Self> {
        let data = base58::decode_check(s)?;
        if data.len() != 78 || data[..4] != XPUB_VERSION {
            return Err(WalletError::validation("invalid extended public key"));
        }
        let public = curve.normalize_public(&data[45..78])?;
        let (depth, parent_fingerprint, child_number, chain_code) = parse_header(&data);
        Ok(Self { curve, depth, parent_fingerprint, child_number, chain_code, public })
    }
}

//! Elastos addresses and redeem scripts
//!
//! An address is the base58check encoding of a 21-byte program hash:
//! one prefix byte followed by RIPEMD160(SHA256(code)).

use super::codec::ByteReader;
use crate::core::errors::{Result, WalletError};
use crate::crypto::base58;
use crate::crypto::hash::hash160;
use crate::crypto::signature_utils::CurveKind;

const PUSH_PUBKEY: u8 = 0x21;
const OP_CHECKSIG: u8 = 0xAC;
const OP_CHECKMULTISIG: u8 = 0xAE;
const OP_CHECKDID: u8 = 0xAD;
const OP_CROSSCHAIN: u8 = 0xAF;
const OP_1: u8 = 0x51;

/// First byte of a program hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Prefix {
    Standard = 0x21,
    MultiSign = 0x12,
    CrossChain = 0x4B,
    IdChain = 0x67,
    Deposit = 0x1F,
}

impl Prefix {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x21 => Some(Prefix::Standard),
            0x12 => Some(Prefix::MultiSign),
            0x4B => Some(Prefix::CrossChain),
            0x67 => Some(Prefix::IdChain),
            0x1F => Some(Prefix::Deposit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHash([u8; 21]);

impl ProgramHash {
    pub fn from_code(prefix: Prefix, code: &[u8]) -> Self {
        let mut out = [0u8; 21];
        out[0] = prefix as u8;
        out[1..].copy_from_slice(&hash160(code));
        Self(out)
    }

    /// All-zero hash, the destination of side chain withdraw burns.
    pub fn zero() -> Self {
        Self([0u8; 21])
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 21] = bytes
            .try_into()
            .map_err(|_| WalletError::validation("program hash must be 21 bytes"))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 21] {
        &self.0
    }

    pub fn prefix(&self) -> Option<Prefix> {
        Prefix::from_byte(self.0[0])
    }

    pub fn to_address(&self) -> String {
        base58::encode_check(&self.0)
    }

    /// Parses an address string. Unknown prefixes are rejected.
    pub fn from_address(address: &str) -> Result<Self> {
        let data = base58::decode_check(address)?;
        let hash = Self::from_bytes(&data)?;
        if hash.prefix().is_none() {
            return Err(WalletError::validation(format!("unknown address prefix: {}", address)));
        }
        Ok(hash)
    }
}

/// `0x21 <pubkey> CHECKSIG`
pub fn standard_code(public_key: &[u8; 33]) -> Vec<u8> {
    let mut code = Vec::with_capacity(35);
    code.push(PUSH_PUBKEY);
    code.extend_from_slice(public_key);
    code.push(OP_CHECKSIG);
    code
}

/// `0x21 <pubkey> CHECKDID`
pub fn did_code(public_key: &[u8; 33]) -> Vec<u8> {
    let mut code = standard_code(public_key);
    code[34] = OP_CHECKDID;
    code
}

/// `0x20 <genesis hash> CROSSCHAIN`
pub fn cross_chain_code(genesis_hash: &[u8; 32]) -> Vec<u8> {
    let mut code = Vec::with_capacity(34);
    code.push(0x20);
    code.extend_from_slice(genesis_hash);
    code.push(OP_CROSSCHAIN);
    code
}

/// Sorts compressed public keys by X coordinate.
pub fn sort_public_keys(keys: &mut [[u8; 33]]) {
    keys.sort_by(|a, b| a[1..].cmp(&b[1..]).then(a[0].cmp(&b[0])));
}

/// `OP_M <0x21 pk>... OP_N CHECKMULTISIG` over the sorted keys.
pub fn multisig_code(m: u8, public_keys: &[[u8; 33]]) -> Result<Vec<u8>> {
    let n = public_keys.len();
    if m == 0 || m as usize > n || n > 16 {
        return Err(WalletError::validation(format!("invalid M of N: {} of {}", m, n)));
    }
    let mut sorted = public_keys.to_vec();
    sort_public_keys(&mut sorted);
    let mut code = Vec::with_capacity(3 + 34 * n);
    code.push(OP_1 - 1 + m);
    for pk in &sorted {
        code.push(PUSH_PUBKEY);
        code.extend_from_slice(pk);
    }
    code.push(OP_1 - 1 + n as u8);
    code.push(OP_CHECKMULTISIG);
    Ok(code)
}

/// Structure of a redeem script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    Standard([u8; 33]),
    Did([u8; 33]),
    MultiSign { m: u8, public_keys: Vec<[u8; 33]> },
}

impl Code {
    pub fn parse(code: &[u8]) -> Result<Self> {
        let bad = || WalletError::validation(format!("unsupported redeem script: {}", hex::encode(code)));
        if code.len() == 35 && code[0] == PUSH_PUBKEY {
            let mut pk = [0u8; 33];
            pk.copy_from_slice(&code[1..34]);
            return match code[34] {
                OP_CHECKSIG => Ok(Code::Standard(pk)),
                OP_CHECKDID => Ok(Code::Did(pk)),
                _ => Err(bad()),
            };
        }
        if code.len() < 3 || code[code.len() - 1] != OP_CHECKMULTISIG {
            return Err(bad());
        }
        let m = code[0].checked_sub(OP_1 - 1).filter(|m| (1..=16).contains(m)).ok_or_else(bad)?;
        let n = code[code.len() - 2]
            .checked_sub(OP_1 - 1)
            .filter(|n| (1..=16).contains(n))
            .ok_or_else(bad)?;
        let mut reader = ByteReader::new(&code[1..code.len() - 2]);
        let mut public_keys = Vec::with_capacity(n as usize);
        while reader.remaining() > 0 {
            if reader.u8()? != PUSH_PUBKEY {
                return Err(bad());
            }
            let mut pk = [0u8; 33];
            pk.copy_from_slice(reader.take(33)?);
            public_keys.push(pk);
        }
        if public_keys.len() != n as usize || m > n {
            return Err(bad());
        }
        Ok(Code::MultiSign { m, public_keys })
    }

    pub fn threshold(&self) -> (u8, u8) {
        match self {
            Code::MultiSign { m, public_keys } => (*m, public_keys.len() as u8),
            _ => (1, 1),
        }
    }

    pub fn public_keys(&self) -> Vec<[u8; 33]> {
        match self {
            Code::Standard(pk) | Code::Did(pk) => vec![*pk],
            Code::MultiSign { public_keys, .. } => public_keys.clone(),
        }
    }
}

pub fn standard_address(public_key: &[u8; 33]) -> String {
    ProgramHash::from_code(Prefix::Standard, &standard_code(public_key)).to_address()
}

pub fn multisig_address(m: u8, public_keys: &[[u8; 33]]) -> Result<String> {
    Ok(ProgramHash::from_code(Prefix::MultiSign, &multisig_code(m, public_keys)?).to_address())
}

pub fn deposit_address(public_key: &[u8; 33]) -> String {
    ProgramHash::from_code(Prefix::Deposit, &standard_code(public_key)).to_address()
}

/// Identity chain CID of a key.
pub fn cid(public_key: &[u8; 33]) -> String {
    ProgramHash::from_code(Prefix::IdChain, &standard_code(public_key)).to_address()
}

/// Identity chain DID of a key.
pub fn did(public_key: &[u8; 33]) -> String {
    ProgramHash::from_code(Prefix::IdChain, &did_code(public_key)).to_address()
}

pub fn cross_chain_address(genesis_hash: &[u8; 32]) -> String {
    ProgramHash::from_code(Prefix::CrossChain, &cross_chain_code(genesis_hash)).to_address()
}

/// Parses a compressed or uncompressed secp256r1 key from hex.
pub fn parse_public_key(hex_key: &str) -> Result<[u8; 33]> {
    let bytes = hex::decode(hex_key)?;
    CurveKind::Secp256r1.normalize_public(&bytes)
}

/// True for any well-formed address with a known prefix.
pub fn is_valid(address: &str) -> bool {
    ProgramHash::from_address(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn key(seed: u8) -> [u8; 33] {
        CurveKind::Secp256r1.public_key(&[seed; 32]).unwrap()
    }

    #[test_case(Prefix::Standard, 'E' ; "standard")]
    #[test_case(Prefix::MultiSign, '8' ; "multisign")]
    #[test_case(Prefix::CrossChain, 'X' ; "cross chain")]
    #[test_case(Prefix::IdChain, 'i' ; "id chain")]
    #[test_case(Prefix::Deposit, 'D' ; "deposit")]
    fn test_prefix_leading_character(prefix: Prefix, expected: char) {
        let address = ProgramHash::from_code(prefix, &standard_code(&key(1))).to_address();
        assert_eq!(address.chars().next(), Some(expected));
        assert!(is_valid(&address));
    }

    #[test]
    fn test_address_round_trip() {
        let address = standard_address(&key(2));
        let hash = ProgramHash::from_address(&address).unwrap();
        assert_eq!(hash.prefix(), Some(Prefix::Standard));
        assert_eq!(hash.to_address(), address);
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(!is_valid(""));
        assert!(!is_valid("EPbdmxUVBzfNrVdqJzZEySyWGYeuKAeKqx"));
        assert!(!is_valid("0x1234"));
        // Valid base58check but 20-byte payload.
        assert!(!is_valid(&base58::encode_check(&[0x21; 20])));
    }

    #[test]
    fn test_did_and_cid_differ() {
        let pk = key(3);
        assert_ne!(did(&pk), cid(&pk));
        assert!(did(&pk).starts_with('i'));
    }

    #[test]
    fn test_multisig_code_is_order_independent() {
        let keys = [key(1), key(2), key(3)];
        let reversed = [key(3), key(2), key(1)];
        assert_eq!(multisig_code(2, &keys).unwrap(), multisig_code(2, &reversed).unwrap());
        let code = multisig_code(2, &keys).unwrap();
        assert_eq!(code[0], 0x52);
        assert_eq!(code[code.len() - 2], 0x53);
        assert_eq!(*code.last().unwrap(), 0xAE);
    }

    #[test]
    fn test_parse_code() {
        let pk = key(4);
        assert_eq!(Code::parse(&standard_code(&pk)).unwrap(), Code::Standard(pk));
        assert_eq!(Code::parse(&did_code(&pk)).unwrap(), Code::Did(pk));

        let code = multisig_code(2, &[key(1), key(2), key(3)]).unwrap();
        let parsed = Code::parse(&code).unwrap();
        assert_eq!(parsed.threshold(), (2, 3));
        assert!(Code::parse(&[0x00, 0x01]).is_err());
    }

    #[test]
    fn test_multisig_rejects_bad_threshold() {
        assert!(multisig_code(0, &[key(1)]).is_err());
        assert!(multisig_code(3, &[key(1), key(2)]).is_err());
    }
}

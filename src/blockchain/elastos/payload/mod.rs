//! Transaction payloads and their canonical byte layouts
//!
//! Governance payloads are built in three steps: serialize the unsigned
//! fields and hash them, collect signatures over that digest, then serialize
//! again with the signatures appended. The unsigned prefix is identical in
//! both passes so a partially signed payload can be resumed at any step.

pub mod cr;
pub mod cross_chain;
pub mod did;
pub mod producer;
pub mod proposal;
pub mod review;
pub mod tracking;
pub mod vote;
pub mod withdraw;

use super::address::{parse_public_key, ProgramHash};
use crate::core::errors::{Result, WalletError};
use crate::crypto::hash::sha256;

/// Transaction type bytes.
pub mod tx_type {
    pub const TRANSFER_ASSET: u8 = 0x02;
    pub const TRANSFER_CROSS_CHAIN_ASSET: u8 = 0x08;
    pub const REGISTER_PRODUCER: u8 = 0x09;
    pub const CANCEL_PRODUCER: u8 = 0x0a;
    pub const UPDATE_PRODUCER: u8 = 0x0b;
    pub const RETURN_DEPOSIT_COIN: u8 = 0x0c;
    pub const REGISTER_CR: u8 = 0x21;
    pub const UNREGISTER_CR: u8 = 0x22;
    pub const UPDATE_CR: u8 = 0x23;
    pub const RETURN_CR_DEPOSIT_COIN: u8 = 0x24;
    pub const CRC_PROPOSAL: u8 = 0x25;
    pub const CRC_PROPOSAL_REVIEW: u8 = 0x26;
    pub const CRC_PROPOSAL_TRACKING: u8 = 0x27;
    pub const CRC_PROPOSAL_WITHDRAW: u8 = 0x29;
    pub const CR_COUNCIL_MEMBER_CLAIM_NODE: u8 = 0x31;
    /// ID chain only; shares its byte with `CANCEL_PRODUCER`.
    pub const DID_OPERATION: u8 = 0x0a;
}

/// Output payload types (transaction version 0x09 and later).
pub mod output_type {
    pub const NONE: u8 = 0x00;
    pub const VOTE: u8 = 0x01;
    pub const CROSS_CHAIN: u8 = 0x03;
}

pub const MAX_CATEGORY_DATA: usize = 4096;
pub const MAX_DRAFT_DATA: usize = 1024 * 1024;

/// Serialized payload ready to be placed in a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadBytes {
    pub tx_type: u8,
    pub version: u8,
    pub bytes: Vec<u8>,
}

impl PayloadBytes {
    pub fn new(tx_type: u8, version: u8, bytes: Vec<u8>) -> Self {
        Self { tx_type, version, bytes }
    }

    pub fn empty(tx_type: u8) -> Self {
        Self::new(tx_type, 0, Vec::new())
    }
}

/// Hex of a SHA256 digest, in hash byte order.
pub fn digest_hex(preimage: &[u8]) -> String {
    hex::encode(sha256(preimage))
}

/// Parses a 32-byte hash shown in reversed (display) byte order.
pub fn parse_hash(field: &str, value: &str) -> Result<[u8; 32]> {
    let mut bytes: [u8; 32] = hex::decode(value)
        .map_err(|e| WalletError::validation(format!("{}: {}", field, e)))?
        .try_into()
        .map_err(|_| WalletError::validation(format!("{} must be 32 bytes", field)))?;
    bytes.reverse();
    Ok(bytes)
}

/// Display form of a hash: reversed hex.
pub fn hash_to_hex(hash: &[u8; 32]) -> String {
    let mut bytes = *hash;
    bytes.reverse();
    hex::encode(bytes)
}

pub fn parse_public_key_field(field: &str, value: &str) -> Result<[u8; 33]> {
    parse_public_key(value).map_err(|_| WalletError::validation(format!("{}: invalid public key", field)))
}

/// Public key field that may be left empty.
pub fn parse_optional_public_key(field: &str, value: &str) -> Result<Vec<u8>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    Ok(parse_public_key_field(field, value)?.to_vec())
}

pub fn parse_address(field: &str, value: &str) -> Result<ProgramHash> {
    ProgramHash::from_address(value)
        .map_err(|_| WalletError::validation(format!("{}: invalid address {}", field, value)))
}

pub fn parse_signature(field: &str, value: &str) -> Result<Vec<u8>> {
    let sig = hex::decode(value).map_err(|e| WalletError::validation(format!("{}: {}", field, e)))?;
    if sig.len() != 64 {
        return Err(WalletError::validation(format!("{} must be a 64-byte signature", field)));
    }
    Ok(sig)
}

pub fn parse_amount(field: &str, value: &str) -> Result<i64> {
    value
        .parse::<i64>()
        .ok()
        .filter(|v| *v >= 0)
        .ok_or_else(|| WalletError::validation(format!("{}: invalid amount {}", field, value)))
}

/// Decodes an optional hex data field and checks its size and, when
/// `expected_hash` is given, that SHA256d of the data matches it.
pub fn parse_attached_data(field: &str, value: &str, expected_hash: Option<&[u8; 32]>) -> Result<Vec<u8>> {
    let data = hex::decode(value).map_err(|e| WalletError::validation(format!("{}: {}", field, e)))?;
    if data.len() > MAX_DRAFT_DATA {
        return Err(WalletError::validation(format!(
            "{} exceeds {} bytes",
            field, MAX_DRAFT_DATA
        )));
    }
    if let Some(expected) = expected_hash {
        if &crate::crypto::hash::sha256d(&data) != expected {
            return Err(WalletError::validation(format!("{} does not match its hash", field)));
        }
    }
    Ok(data)
}

//! Base58Check with a double SHA-256 checksum.

use crate::core::errors::{Result, WalletError};
use crate::crypto::hash::sha256d;

pub fn encode_check(payload: &[u8]) -> String {
    let mut data = payload.to_vec();
    data.extend_from_slice(&sha256d(payload)[..4]);
    bs58::encode(data).into_string()
}

pub fn decode_check(s: &str) -> Result<Vec<u8>> {
    let data = bs58::decode(s)
        .into_vec()
        .map_err(|e| WalletError::validation(format!("invalid base58: {}", e)))?;
    if data.len() < 4 {
        return Err(WalletError::validation("base58 payload too short"));
    }
    let (payload, checksum) = data.split_at(data.len() - 4);
    if sha256d(payload)[..4] != *checksum {
        return Err(WalletError::validation("base58 checksum mismatch"));
    }
    Ok(payload.to_vec())
}

//! Bitcoin addresses of wallet keys
//!
//! Receiving addresses are native SegWit (P2WPKH). The legacy form is the
//! P2PKH address of the same key, offered for compatibility with older
//! senders.

use crate::core::errors::{Result, WalletError};
use bitcoin::address::Address;
use bitcoin::{Network, PublicKey, ScriptBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    /// P2PKH, `1...` on main net.
    Legacy,
    /// P2WPKH, `bc1q...` on main net.
    SegWit,
}

fn public_key(bytes: &[u8]) -> Result<PublicKey> {
    let pk = PublicKey::from_slice(bytes).map_err(|e| WalletError::validation(format!("invalid public key: {}", e)))?;
    if !pk.compressed {
        return Err(WalletError::validation("bitcoin keys must be compressed"));
    }
    Ok(pk)
}

pub fn from_public_key(bytes: &[u8], kind: AddressType, network: Network) -> Result<String> {
    let pk = public_key(bytes)?;
    let address = match kind {
        AddressType::Legacy => Address::p2pkh(&pk, network),
        AddressType::SegWit => Address::p2wpkh(&pk, network)
            .map_err(|e| WalletError::validation(format!("p2wpkh address: {}", e)))?,
    };
    Ok(address.to_string())
}

/// True when `address` parses and belongs to `network`.
pub fn validate(address: &str, network: Network) -> bool {
    Address::from_str(address)
        .map(|a| a.is_valid_for_network(network))
        .unwrap_or(false)
}

pub fn parse(address: &str, network: Network) -> Result<Address> {
    Address::from_str(address)
        .map_err(|e| WalletError::validation(format!("invalid bitcoin address {}: {}", address, e)))?
        .require_network(network)
        .map_err(|e| WalletError::validation(format!("{} is for another network: {}", address, e)))
}

pub fn script_pubkey(address: &str, network: Network) -> Result<ScriptBuf> {
    Ok(parse(address, network)?.script_pubkey())
}

/// Kind of a wallet address. Script hash and taproot outputs are not
/// spendable by this wallet.
pub fn detect_type(address: &str, network: Network) -> Result<AddressType> {
    match parse(address, network)?.address_type() {
        Some(bitcoin::AddressType::P2pkh) => Ok(AddressType::Legacy),
        Some(bitcoin::AddressType::P2wpkh) => Ok(AddressType::SegWit),
        other => Err(WalletError::capability(format!("unsupported address type {:?}", other))),
    }
}

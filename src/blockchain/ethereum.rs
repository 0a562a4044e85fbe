//! EVM side chains (ESC, EID, ECO)
//!
//! These chains expose a single account per wallet. Transfers are legacy
//! EIP-155 transactions built with ethers' `TransactionRequest` and signed
//! offline with a `LocalWallet`. Nonce, gas price and gas limit are always
//! supplied by the caller.

use crate::core::errors::{Result, WalletError};
use crate::crypto::hash::keccak256;
use crate::crypto::signature_utils::CurveKind;
use ethers::{
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, NameOrAddress, Signature, Transaction,
        TransactionRequest, U256,
    },
    utils::{parse_units, rlp, to_checksum},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Unit of an amount argument. The value in wei is `amount * 10^(3 * unit)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountUnit {
    EtherWei = 0,
    Gwei = 3,
    Ether = 6,
}

impl AmountUnit {
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(AmountUnit::EtherWei),
            3 => Ok(AmountUnit::Gwei),
            6 => Ok(AmountUnit::Ether),
            other => Err(WalletError::validation(format!("invalid amount unit {}", other))),
        }
    }

    fn decimals(self) -> u32 {
        3 * self as u32
    }
}

/// Converts a decimal amount string to wei.
pub fn to_wei(amount: &str, unit: AmountUnit) -> Result<U256> {
    if amount.trim_start().starts_with('-') {
        return Err(WalletError::validation(format!("negative amount {}", amount)));
    }
    let parsed = parse_units(amount, unit.decimals())
        .map_err(|e| WalletError::validation(format!("invalid amount {}: {}", amount, e)))?;
    Ok(parsed.into())
}

/// EIP-55 address of a secp256k1 public key.
pub fn address_from_public_key(public_key: &[u8]) -> Result<String> {
    let uncompressed = CurveKind::Secp256k1.uncompressed_public(public_key)?;
    let hash = keccak256(&uncompressed[1..]);
    let address = Address::from_slice(&hash[12..]);
    Ok(to_checksum(&address, None))
}

/// Accepts `0x` plus 40 hex digits. Mixed case must match the EIP-55 checksum.
pub fn is_valid_address(address: &str) -> bool {
    let Some(body) = address.strip_prefix("0x") else {
        return false;
    };
    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }
    let Ok(parsed) = Address::from_str(address) else {
        return false;
    };
    let lower = body.chars().all(|c| !c.is_ascii_uppercase());
    let upper = body.chars().all(|c| !c.is_ascii_lowercase());
    lower || upper || to_checksum(&parsed, None) == address
}

fn parse_address(address: &str) -> Result<Address> {
    if !is_valid_address(address) {
        return Err(WalletError::validation(format!("invalid EVM address {}", address)));
    }
    Address::from_str(address).map_err(|e| WalletError::validation(format!("{}: {}", address, e)))
}

/// Parameters of a transfer, as given by the caller.
#[derive(Debug, Clone)]
pub struct TransferRequest<'a> {
    pub to: &'a str,
    pub amount: &'a str,
    pub amount_unit: AmountUnit,
    pub gas_price: &'a str,
    pub gas_price_unit: AmountUnit,
    pub gas_limit: &'a str,
    pub data: &'a str,
    pub nonce: u64,
}

/// Transfer as handed back to the caller; `Signed` and `Hash` appear once
/// the transaction is signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EvmTransaction {
    #[serde(rename = "ChainID")]
    pub chain_id: String,
    pub nonce: u64,
    pub to: String,
    /// Wei, decimal.
    pub value: String,
    pub gas_price: String,
    pub gas_limit: String,
    pub data: String,
    pub evm_chain_id: u64,
    pub fee: String,
    pub unsigned: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl EvmTransaction {
    pub fn create(chain_id: &str, evm_chain_id: u64, req: &TransferRequest<'_>) -> Result<Self> {
        let to = parse_address(req.to)?;
        let value = to_wei(req.amount, req.amount_unit)?;
        let gas_price = to_wei(req.gas_price, req.gas_price_unit)?;
        let gas_limit = U256::from_dec_str(req.gas_limit)
            .map_err(|e| WalletError::validation(format!("invalid gas limit {}: {}", req.gas_limit, e)))?;
        let data = decode_data(req.data)?;
        let fee = gas_price
            .checked_mul(gas_limit)
            .ok_or_else(|| WalletError::validation("fee overflows"))?;

        let tx = Self {
            chain_id: chain_id.to_string(),
            nonce: req.nonce,
            to: to_checksum(&to, None),
            value: value.to_string(),
            gas_price: gas_price.to_string(),
            gas_limit: gas_limit.to_string(),
            data: format!("0x{}", hex::encode(&data)),
            evm_chain_id,
            fee: fee.to_string(),
            unsigned: String::new(),
            signed: None,
            hash: None,
        };
        let unsigned = format!("0x{}", hex::encode(tx.request()?.rlp()));
        debug!(chain = chain_id, nonce = req.nonce, "built EVM transfer");
        Ok(Self { unsigned, ..tx })
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    fn request(&self) -> Result<TypedTransaction> {
        let parse = |field: &str, v: &str| {
            U256::from_dec_str(v).map_err(|e| WalletError::validation(format!("{}: {}", field, e)))
        };
        let req = TransactionRequest::new()
            .to(NameOrAddress::Address(parse_address(&self.to)?))
            .value(parse("Value", &self.value)?)
            .gas_price(parse("GasPrice", &self.gas_price)?)
            .gas(parse("GasLimit", &self.gas_limit)?)
            .nonce(self.nonce)
            .data(Bytes::from(decode_data(&self.data)?))
            .chain_id(self.evm_chain_id);
        Ok(TypedTransaction::Legacy(req))
    }

    /// Signs with the account key and fills `Signed` and `Hash`.
    pub fn sign(&mut self, secret: &[u8]) -> Result<()> {
        let wallet = LocalWallet::from_bytes(secret)
            .map_err(|e| WalletError::crypto(format!("invalid EVM key: {}", e)))?
            .with_chain_id(self.evm_chain_id);
        let tx = self.request()?;
        let signature = wallet
            .sign_transaction_sync(&tx)
            .map_err(|e| WalletError::crypto(format!("EVM signing failed: {}", e)))?;
        let raw = tx.rlp_signed(&signature);
        self.hash = Some(format!("0x{}", hex::encode(keccak256(&raw))));
        self.signed = Some(format!("0x{}", hex::encode(&raw)));
        debug!(hash = ?self.hash, "signed EVM transfer");
        Ok(())
    }

    /// The signed RLP, provided it still encodes the transaction's fields.
    pub fn signed_raw(&self) -> Result<String> {
        let signed = self
            .signed
            .as_ref()
            .ok_or_else(|| WalletError::IncompleteSignatureError("transaction is not signed".to_string()))?;
        let raw = decode_data(signed)?;
        let decoded: Transaction = rlp::decode(&raw)
            .map_err(|e| WalletError::validation(format!("malformed signed transaction: {}", e)))?;
        let signature = Signature { r: decoded.r, s: decoded.s, v: decoded.v.as_u64() };
        let request = self.request()?;
        let unsigned = format!("0x{}", hex::encode(request.rlp()));
        let hash = format!("0x{}", hex::encode(keccak256(&raw)));
        if request.rlp_signed(&signature).as_ref() != raw.as_slice()
            || unsigned != self.unsigned
            || self.hash.as_ref().is_some_and(|h| *h != hash)
        {
            return Err(WalletError::validation("transaction was modified after signing"));
        }
        Ok(signed.clone())
    }
}

fn decode_data(data: &str) -> Result<Vec<u8>> {
    let body = data.strip_prefix("0x").unwrap_or(data);
    Ok(hex::decode(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: [u8; 32] = [0x42; 32];

    fn request<'a>(to: &'a str) -> TransferRequest<'a> {
        TransferRequest {
            to,
            amount: "1.5",
            amount_unit: AmountUnit::Ether,
            gas_price: "1",
            gas_price_unit: AmountUnit::Gwei,
            gas_limit: "21000",
            data: "",
            nonce: 7,
        }
    }

    #[test]
    fn test_address_matches_local_wallet() {
        let pk = CurveKind::Secp256k1.public_key(&SECRET).unwrap();
        let address = address_from_public_key(&pk).unwrap();
        let wallet = LocalWallet::from_bytes(&SECRET).unwrap();
        assert_eq!(address, to_checksum(&wallet.address(), None));
        assert!(is_valid_address(&address));
        assert!(is_valid_address(&address.to_lowercase()));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(is_valid_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(!is_valid_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD"));
        assert!(!is_valid_address("742d35Cc6634C0532925a3b8D400e8B78fFe4860"));
        assert!(!is_valid_address("0x1234"));
        assert!(!is_valid_address("EHLhCEbwViWBPwh1VhpECzYEA7jQHZ4zLv"));
    }

    #[test]
    fn test_units() {
        assert_eq!(to_wei("1", AmountUnit::EtherWei).unwrap(), U256::from(1u64));
        assert_eq!(to_wei("2", AmountUnit::Gwei).unwrap(), U256::from(2_000_000_000u64));
        assert_eq!(to_wei("1.5", AmountUnit::Ether).unwrap(), U256::from(1_500_000_000_000_000_000u64));
        assert!(to_wei("-1", AmountUnit::Ether).is_err());
        assert!(AmountUnit::from_code(2).is_err());
    }

    #[test]
    fn test_create_and_sign() {
        let to = address_from_public_key(&CurveKind::Secp256k1.public_key(&[7u8; 32]).unwrap()).unwrap();
        let mut tx = EvmTransaction::create("ETHSC", 20, &request(&to)).unwrap();
        assert_eq!(tx.fee, "21000000000000");
        assert!(tx.unsigned.starts_with("0x"));
        assert!(tx.signed.is_none());

        tx.sign(&SECRET).unwrap();
        let raw = hex::decode(tx.signed.as_ref().unwrap().trim_start_matches("0x")).unwrap();
        assert_eq!(tx.hash.as_deref().unwrap(), format!("0x{}", hex::encode(keccak256(&raw))));
        let mut resigned = tx.clone();
        resigned.sign(&SECRET).unwrap();
        assert_eq!(resigned.signed, tx.signed);

        let again = EvmTransaction::from_json(&serde_json::to_value(&tx).unwrap()).unwrap();
        assert_eq!(again, tx);
    }

    #[test]
    fn test_signed_raw_rejects_edited_fields() {
        let to = address_from_public_key(&CurveKind::Secp256k1.public_key(&[7u8; 32]).unwrap()).unwrap();
        let mut tx = EvmTransaction::create("ETHSC", 20, &request(&to)).unwrap();
        assert_eq!(tx.signed_raw().unwrap_err().kind(), "IncompleteSignatureError");

        tx.sign(&SECRET).unwrap();
        assert_eq!(tx.signed_raw().unwrap(), tx.signed.clone().unwrap());

        let mut edited = tx.clone();
        edited.value = "1".to_string();
        assert_eq!(edited.signed_raw().unwrap_err().kind(), "ValidationError");

        let mut edited = tx.clone();
        edited.nonce += 1;
        assert_eq!(edited.signed_raw().unwrap_err().kind(), "ValidationError");

        let mut edited = tx;
        edited.signed = Some("0xdeadbeef".to_string());
        assert_eq!(edited.signed_raw().unwrap_err().kind(), "ValidationError");
    }

    #[test]
    fn test_same_request_same_unsigned() {
        let to = address_from_public_key(&CurveKind::Secp256k1.public_key(&[7u8; 32]).unwrap()).unwrap();
        let a = EvmTransaction::create("ETHSC", 20, &request(&to)).unwrap();
        let b = EvmTransaction::create("ETHSC", 20, &request(&to)).unwrap();
        assert_eq!(a.unsigned, b.unsigned);
    }
}

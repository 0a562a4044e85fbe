//! Caller supplied UTXOs and payment targets.
//!
//! UTXO discovery happens outside the wallet; every transaction is built from
//! inputs the caller already resolved.

use super::address::ProgramHash;
use super::payload::{parse_amount, parse_hash};
use crate::core::errors::{Result, WalletError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UtxoInput {
    pub tx_hash: String,
    pub index: u16,
    pub address: String,
    pub amount: String,
}

impl UtxoInput {
    pub fn txid(&self) -> Result<[u8; 32]> {
        parse_hash("TxHash", &self.tx_hash)
    }

    pub fn value(&self) -> Result<i64> {
        parse_amount("Amount", &self.amount)
    }

    pub fn program_hash(&self) -> Result<ProgramHash> {
        ProgramHash::from_address(&self.address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentOutput {
    pub address: String,
    pub amount: String,
}

pub fn parse_inputs(value: &serde_json::Value) -> Result<Vec<UtxoInput>> {
    let inputs: Vec<UtxoInput> = serde_json::from_value(value.clone())?;
    if inputs.is_empty() {
        return Err(WalletError::validation("inputs are empty"));
    }
    for (i, input) in inputs.iter().enumerate() {
        input.txid()?;
        input.value()?;
        input.program_hash()?;
        if inputs[..i]
            .iter()
            .any(|prev| prev.tx_hash.eq_ignore_ascii_case(&input.tx_hash) && prev.index == input.index)
        {
            return Err(WalletError::validation(format!(
                "input {}:{} listed twice",
                input.tx_hash, input.index
            )));
        }
    }
    Ok(inputs)
}

pub fn parse_outputs(value: &serde_json::Value) -> Result<Vec<PaymentOutput>> {
    let outputs: Vec<PaymentOutput> = serde_json::from_value(value.clone())?;
    if outputs.is_empty() {
        return Err(WalletError::validation("outputs are empty"));
    }
    for output in &outputs {
        ProgramHash::from_address(&output.address)?;
        parse_amount("Amount", &output.amount)?;
    }
    Ok(outputs)
}

pub fn total(inputs: &[UtxoInput]) -> Result<i64> {
    inputs.iter().try_fold(0i64, |acc, input| {
        acc.checked_add(input.value()?)
            .ok_or_else(|| WalletError::validation("input total overflows"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::elastos::address::standard_address;
    use crate::crypto::signature_utils::CurveKind;
    use serde_json::json;

    fn addr() -> String {
        standard_address(&CurveKind::Secp256r1.public_key(&[1u8; 32]).unwrap())
    }

    fn input(index: u16) -> serde_json::Value {
        json!({"TxHash": "11".repeat(32), "Index": index, "Address": addr(), "Amount": "1000"})
    }

    #[test]
    fn test_parse_and_total() {
        let inputs = parse_inputs(&json!([input(0), input(1)])).unwrap();
        assert_eq!(total(&inputs).unwrap(), 2000);
    }

    #[test]
    fn test_duplicate_and_empty_inputs() {
        assert!(parse_inputs(&json!([input(0), input(0)])).is_err());
        assert!(parse_inputs(&json!([])).is_err());
    }

    #[test]
    fn test_outputs_need_valid_address() {
        assert!(parse_outputs(&json!([{"Address": "nope", "Amount": "1"}])).is_err());
        assert!(parse_outputs(&json!([{"Address": addr(), "Amount": "1"}])).is_ok());
    }
}

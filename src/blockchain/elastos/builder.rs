//! Assembles unsigned Elastos transactions from caller supplied UTXOs.

use super::address::ProgramHash;
use super::payload::PayloadBytes;
use super::transaction::{Attribute, Program, Transaction, TxInput, TxOutput, UnsignedTx, DEFAULT_SEQUENCE};
use super::transaction::attribute_usage;
use super::utxo::{self, UtxoInput};
use crate::core::chain::ChainId;
use crate::core::errors::{Result, WalletError};
use tracing::debug;

/// Transaction under construction.
///
/// Whatever the inputs hold beyond outputs and fee returns to the change
/// address, which defaults to the first input's address.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    chain_id: ChainId,
    payload: PayloadBytes,
    inputs: Vec<UtxoInput>,
    outputs: Vec<TxOutput>,
    memo: String,
    fee: i64,
    change_address: Option<String>,
}

impl TxBuilder {
    pub fn new(chain_id: ChainId, payload: PayloadBytes) -> Self {
        Self {
            chain_id,
            payload,
            inputs: Vec::new(),
            outputs: Vec::new(),
            memo: String::new(),
            fee: 0,
            change_address: None,
        }
    }

    pub fn inputs(mut self, inputs: Vec<UtxoInput>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn output(mut self, output: TxOutput) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn pay_to(self, address: &str, amount: i64) -> Result<Self> {
        let hash = ProgramHash::from_address(address)?;
        Ok(self.output(TxOutput::ela(hash, amount)?))
    }

    pub fn memo(mut self, memo: &str) -> Self {
        self.memo = memo.to_string();
        self
    }

    pub fn fee(mut self, fee: i64) -> Self {
        self.fee = fee;
        self
    }

    pub fn change_to(mut self, address: &str) -> Self {
        self.change_address = Some(address.to_string());
        self
    }

    /// Sum of inputs minus fee, for transactions that spend everything into
    /// one output.
    pub fn spendable(&self) -> Result<i64> {
        let total = utxo::total(&self.inputs)?;
        total.checked_sub(self.fee).filter(|v| *v > 0).ok_or_else(|| {
            WalletError::InsufficientFundsError(format!("inputs {} do not cover fee {}", total, self.fee))
        })
    }

    /// Builds the unsigned transaction. `code_for` maps each distinct input
    /// address to the redeem script that unlocks it.
    pub fn build(mut self, code_for: impl Fn(&str) -> Result<Vec<u8>>) -> Result<Transaction> {
        if self.inputs.is_empty() {
            return Err(WalletError::validation("transaction has no inputs"));
        }
        if self.fee < 0 {
            return Err(WalletError::validation("fee must not be negative"));
        }
        let input_total = utxo::total(&self.inputs)?;
        let output_total = self
            .outputs
            .iter()
            .try_fold(self.fee, |acc, o| acc.checked_add(o.value))
            .ok_or_else(|| WalletError::validation("output total overflows"))?;
        if input_total < output_total {
            return Err(WalletError::InsufficientFundsError(format!(
                "inputs {} < outputs and fee {}",
                input_total, output_total
            )));
        }
        let change = input_total - output_total;
        if change > 0 {
            let address = match &self.change_address {
                Some(a) => a.clone(),
                None => self.inputs[0].address.clone(),
            };
            self.outputs.push(TxOutput::ela(ProgramHash::from_address(&address)?, change)?);
        }

        let mut unsigned = UnsignedTx::new(self.payload);
        if !self.memo.is_empty() {
            unsigned.attributes.push(Attribute {
                usage: attribute_usage::MEMO,
                data: self.memo.into_bytes(),
            });
        }
        for input in &self.inputs {
            unsigned.inputs.push(TxInput {
                txid: input.txid()?,
                index: input.index,
                sequence: DEFAULT_SEQUENCE,
            });
        }
        unsigned.outputs = self.outputs;

        let mut tx = Transaction::new(self.chain_id.as_str(), &unsigned, self.fee, self.inputs);
        let mut seen: Vec<&str> = Vec::new();
        for input in &tx.inputs {
            if seen.contains(&input.address.as_str()) {
                continue;
            }
            seen.push(&input.address);
            tx.programs.push(Program {
                code: hex::encode(code_for(&input.address)?),
                parameter: String::new(),
            });
        }
        debug!(
            chain = %self.chain_id,
            tx_type = unsigned.tx_type,
            id = %tx.id,
            inputs = tx.inputs.len(),
            outputs = unsigned.outputs.len(),
            "built transaction"
        );
        Ok(tx)
    }
}

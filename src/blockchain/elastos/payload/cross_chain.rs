//! Main chain to side chain deposits and side chain withdrawals (tx type 0x08).

use super::{parse_amount, tx_type, PayloadBytes};
use crate::blockchain::elastos::codec::ByteWriter;
use crate::core::errors::{Result, WalletError};
use serde::{Deserialize, Serialize};

/// Fixed fee each cross chain transfer leaves to the arbiters, in sela.
pub const CROSS_CHAIN_FEE: i64 = 10_000;

/// Version 0: targets listed in the transaction payload.
pub const DEPOSIT_VERSION_PAYLOAD: u8 = 0x00;
/// Version 1: empty payload, target carried by an output payload.
pub const DEPOSIT_VERSION_OUTPUT: u8 = 0x01;

/// One target of a version 0 cross chain payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CrossChainTarget {
    pub cross_chain_address: String,
    pub output_index: u64,
    pub cross_chain_amount: i64,
}

/// Payload of a version 0 cross chain transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCrossChainAsset {
    pub targets: Vec<CrossChainTarget>,
}

impl TransferCrossChainAsset {
    /// Single target at output 0, the shape wallets produce.
    pub fn single(target_address: &str, amount: i64) -> Self {
        Self {
            targets: vec![CrossChainTarget {
                cross_chain_address: target_address.to_string(),
                output_index: 0,
                cross_chain_amount: amount,
            }],
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.varint(self.targets.len() as u64);
        for target in &self.targets {
            w.var_str(&target.cross_chain_address)
                .varint(target.output_index)
                .i64(target.cross_chain_amount);
        }
        w.into_bytes()
    }

    pub fn to_payload(&self) -> PayloadBytes {
        PayloadBytes::new(
            tx_type::TRANSFER_CROSS_CHAIN_ASSET,
            DEPOSIT_VERSION_PAYLOAD,
            self.serialize(),
        )
    }
}

/// Output payload of a version 1 deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CrossChainOutput {
    pub target_address: String,
    pub target_amount: i64,
    #[serde(default)]
    pub target_data: Vec<u8>,
}

impl CrossChainOutput {
    pub fn serialize(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.u8(0)
            .var_str(&self.target_address)
            .i64(self.target_amount)
            .var_bytes(&self.target_data);
        w.into_bytes()
    }
}

/// Parses the amount moved across chains and adds the arbiter fee.
pub fn locked_amount(amount: &str) -> Result<(i64, i64)> {
    let amount = parse_amount("Amount", amount)?;
    if amount == 0 {
        return Err(WalletError::validation("cross chain amount must be positive"));
    }
    let locked = amount
        .checked_add(CROSS_CHAIN_FEE)
        .ok_or_else(|| WalletError::validation("cross chain amount overflows"))?;
    Ok((amount, locked))
}

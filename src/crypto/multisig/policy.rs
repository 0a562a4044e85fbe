//! M-of-N threshold policy

use crate::core::errors::{Result, WalletError};

/// Largest cosigner count a redeem script can express (`OP_16`).
pub const MAX_COSIGNERS: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdPolicy {
    /// Signatures required
    pub required: u8,
    /// Authorized signers
    pub total: u8,
}

impl ThresholdPolicy {
    pub fn new(required: u8, total: u8) -> Result<Self> {
        if required == 0 {
            return Err(WalletError::validation("required signatures must be at least 1"));
        }
        if required > total {
            return Err(WalletError::validation(format!(
                "invalid M of N: {} of {}",
                required, total
            )));
        }
        if total > MAX_COSIGNERS {
            return Err(WalletError::validation(format!(
                "at most {} cosigners are supported",
                MAX_COSIGNERS
            )));
        }
        Ok(Self { required, total })
    }

    /// M-of-N policy
    pub fn m_of_n(m: u8, n: u8) -> Result<Self> {
        Self::new(m, n)
    }

    pub fn single() -> Self {
        Self { required: 1, total: 1 }
    }

    pub fn is_multisig(&self) -> bool {
        self.total > 1
    }

    pub fn is_satisfied(&self, signature_count: usize) -> bool {
        signature_count >= self.required as usize
    }
}

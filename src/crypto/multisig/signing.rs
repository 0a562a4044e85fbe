//! Signature collection for one digest
//!
//! A [`SignatureSet`] only ever grows. Each contribution is verified against
//! the digest before it is accepted, and a signer may contribute once.

use super::policy::ThresholdPolicy;
use crate::core::errors::{Result, WalletError};
use crate::crypto::signature_utils::CurveKind;
use tracing::debug;

/// Progress of a multi-sign transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningState {
    Unsigned,
    PartiallySigned { signed: usize, required: usize },
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    /// Compressed public key of the signer.
    pub signer: Vec<u8>,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SignatureSet {
    curve: CurveKind,
    policy: ThresholdPolicy,
    digest: Vec<u8>,
    contributions: Vec<Contribution>,
}

impl SignatureSet {
    pub fn new(curve: CurveKind, policy: ThresholdPolicy, digest: impl Into<Vec<u8>>) -> Self {
        Self {
            curve,
            policy,
            digest: digest.into(),
            contributions: Vec::new(),
        }
    }

    pub fn policy(&self) -> ThresholdPolicy {
        self.policy
    }

    pub fn contains(&self, signer: &[u8]) -> bool {
        self.contributions.iter().any(|c| c.signer == signer)
    }

    /// Appends a verified signature and reports the resulting state.
    pub fn add(&mut self, signer: &[u8], signature: &[u8]) -> Result<SigningState> {
        if self.contains(signer) {
            return Err(WalletError::DuplicateSignerError(format!(
                "Duplicate signature from signer {}",
                hex::encode(signer)
            )));
        }
        if !self.curve.verify_prehash(signer, &self.digest, signature) {
            return Err(WalletError::crypto("signature does not verify against digest"));
        }
        if self.contributions.len() >= self.policy.total as usize {
            return Err(WalletError::validation("all cosigners have already signed"));
        }
        self.contributions.push(Contribution {
            signer: signer.to_vec(),
            signature: signature.to_vec(),
        });
        let state = self.state();
        debug!("Signature added: {:?}", state);
        Ok(state)
    }

    pub fn state(&self) -> SigningState {
        let signed = self.contributions.len();
        if signed == 0 {
            SigningState::Unsigned
        } else if self.policy.is_satisfied(signed) {
            SigningState::Complete
        } else {
            SigningState::PartiallySigned {
                signed,
                required: self.policy.required as usize,
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == SigningState::Complete
    }

    /// Contributions in signing order.
    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }

    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }
}

//! Council member review of a proposal (tx type 0x26).

use super::{
    digest_hex, parse_address, parse_attached_data, parse_hash, parse_signature, tx_type, PayloadBytes,
};
use crate::blockchain::elastos::codec::ByteWriter;
use crate::core::errors::{Result, WalletError};
use serde::{Deserialize, Serialize};

/// 0 approve, 1 reject, 2 abstain.
pub const MAX_VOTE_RESULT: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CRCProposalReview {
    pub proposal_hash: String,
    pub vote_result: u8,
    pub opinion_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opinion_data: Option<String>,
    #[serde(rename = "DID")]
    pub did: String,
    #[serde(default)]
    pub signature: String,
}

impl CRCProposalReview {
    pub fn version(&self) -> u8 {
        u8::from(self.opinion_data.is_some())
    }

    pub fn serialize_unsigned(&self) -> Result<Vec<u8>> {
        if self.vote_result > MAX_VOTE_RESULT {
            return Err(WalletError::validation(format!("invalid VoteResult {}", self.vote_result)));
        }
        let opinion_hash = parse_hash("OpinionHash", &self.opinion_hash)?;
        let mut w = ByteWriter::new();
        w.bytes(&parse_hash("ProposalHash", &self.proposal_hash)?)
            .u8(self.vote_result)
            .bytes(&opinion_hash);
        if let Some(data) = &self.opinion_data {
            w.var_bytes(&parse_attached_data("OpinionData", data, Some(&opinion_hash))?);
        }
        w.bytes(parse_address("DID", &self.did)?.as_bytes());
        Ok(w.into_bytes())
    }

    pub fn digest(&self) -> Result<String> {
        Ok(digest_hex(&self.serialize_unsigned()?))
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        w.bytes(&self.serialize_unsigned()?)
            .var_bytes(&parse_signature("Signature", &self.signature)?);
        Ok(w.into_bytes())
    }

    pub fn to_payload(&self) -> Result<PayloadBytes> {
        Ok(PayloadBytes::new(tx_type::CRC_PROPOSAL_REVIEW, self.version(), self.serialize()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::elastos::address;
    use crate::blockchain::elastos::payload::hash_to_hex;
    use crate::crypto::hash::sha256d;
    use crate::crypto::signature_utils::CurveKind;

    fn review() -> CRCProposalReview {
        let pk = CurveKind::Secp256r1.public_key(&[9u8; 32]).unwrap();
        CRCProposalReview {
            proposal_hash: hash_to_hex(&sha256d(b"proposal")),
            vote_result: 0,
            opinion_hash: hash_to_hex(&sha256d(b"opinion")),
            opinion_data: None,
            did: address::did(&pk),
            signature: String::new(),
        }
    }

    #[test]
    fn test_layout() {
        assert_eq!(review().serialize_unsigned().unwrap().len(), 32 + 1 + 32 + 21);
        assert_eq!(review().version(), 0);
    }

    #[test]
    fn test_opinion_data_must_match_hash() {
        let mut r = review();
        r.opinion_data = Some(hex::encode(b"opinion"));
        assert_eq!(r.version(), 1);
        assert!(r.digest().is_ok());
        r.opinion_data = Some(hex::encode(b"changed"));
        assert!(r.digest().is_err());
    }

    #[test]
    fn test_vote_result_range() {
        let mut r = review();
        r.vote_result = 3;
        assert!(r.digest().is_err());
    }
}

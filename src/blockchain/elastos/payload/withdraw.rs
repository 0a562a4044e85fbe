//! Proposal budget withdrawal (tx type 0x29).

use super::{
    digest_hex, parse_address, parse_amount, parse_hash, parse_public_key_field, parse_signature,
    tx_type, PayloadBytes,
};
use crate::blockchain::elastos::codec::ByteWriter;
use crate::core::errors::Result;
use serde::{Deserialize, Serialize};

/// Version 1 names the recipient and amount explicitly.
pub const WITHDRAW_VERSION: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CRCProposalWithdraw {
    pub proposal_hash: String,
    pub owner_public_key: String,
    pub recipient: String,
    pub amount: String,
    #[serde(default)]
    pub signature: String,
}

impl CRCProposalWithdraw {
    pub fn serialize_unsigned(&self) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        w.bytes(&parse_hash("ProposalHash", &self.proposal_hash)?)
            .var_bytes(&parse_public_key_field("OwnerPublicKey", &self.owner_public_key)?)
            .bytes(parse_address("Recipient", &self.recipient)?.as_bytes())
            .i64(parse_amount("Amount", &self.amount)?);
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
        Ok(PayloadBytes::new(tx_type::CRC_PROPOSAL_WITHDRAW, WITHDRAW_VERSION, self.serialize()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::elastos::address;
    use crate::blockchain::elastos::payload::hash_to_hex;
    use crate::crypto::hash::sha256d;
    use crate::crypto::signature_utils::CurveKind;

    #[test]
    fn test_layout_and_amount() {
        let pk = CurveKind::Secp256r1.public_key(&[4u8; 32]).unwrap();
        let mut w = CRCProposalWithdraw {
            proposal_hash: hash_to_hex(&sha256d(b"p")),
            owner_public_key: hex::encode(pk),
            recipient: address::standard_address(&pk),
            amount: "5000".into(),
            signature: String::new(),
        };
        let bytes = w.serialize_unsigned().unwrap();
        assert_eq!(bytes.len(), 32 + 34 + 21 + 8);
        assert_eq!(&bytes[bytes.len() - 8..], &5000i64.to_le_bytes());
        w.amount = "-1".into();
        assert!(w.digest().is_err());
    }
}

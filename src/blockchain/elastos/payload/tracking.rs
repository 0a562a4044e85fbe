//! Proposal tracking (tx type 0x27)
//!
//! Three parties sign in turn, each over a longer prefix of the payload:
//! the proposal owner, the new owner when ownership changes, and finally the
//! secretary general together with its opinion.

use super::{
    digest_hex, parse_attached_data, parse_hash, parse_optional_public_key, parse_public_key_field,
    parse_signature, tx_type, PayloadBytes,
};
use crate::blockchain::elastos::codec::ByteWriter;
use crate::core::errors::{Result, WalletError};
use serde::{Deserialize, Serialize};

/// Tracking type values.
pub mod tracking_type {
    pub const COMMON: u8 = 0x00;
    pub const PROGRESS: u8 = 0x01;
    pub const REJECTED: u8 = 0x02;
    pub const TERMINATED: u8 = 0x03;
    pub const CHANGE_OWNER: u8 = 0x04;
    pub const FINALIZED: u8 = 0x05;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CRCProposalTracking {
    pub proposal_hash: String,
    pub message_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_data: Option<String>,
    pub stage: u8,
    pub owner_public_key: String,
    #[serde(default)]
    pub new_owner_public_key: String,
    #[serde(default)]
    pub owner_signature: String,
    #[serde(default)]
    pub new_owner_signature: String,
    #[serde(rename = "Type", default)]
    pub tracking_type: u8,
    #[serde(default)]
    pub secretary_general_opinion_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secretary_general_opinion_data: Option<String>,
    #[serde(default)]
    pub secretary_general_signature: String,
}

impl CRCProposalTracking {
    pub fn version(&self) -> u8 {
        u8::from(self.message_data.is_some() || self.secretary_general_opinion_data.is_some())
    }

    fn write_owner_part(&self, w: &mut ByteWriter) -> Result<()> {
        let message_hash = parse_hash("MessageHash", &self.message_hash)?;
        w.bytes(&parse_hash("ProposalHash", &self.proposal_hash)?).bytes(&message_hash);
        if let Some(data) = &self.message_data {
            w.var_bytes(&parse_attached_data("MessageData", data, Some(&message_hash))?);
        }
        w.u8(self.stage)
            .var_bytes(&parse_public_key_field("OwnerPublicKey", &self.owner_public_key)?)
            .var_bytes(&parse_optional_public_key("NewOwnerPublicKey", &self.new_owner_public_key)?);
        Ok(())
    }

    fn write_new_owner_part(&self, w: &mut ByteWriter) -> Result<()> {
        self.write_owner_part(w)?;
        w.var_bytes(&parse_signature("OwnerSignature", &self.owner_signature)?);
        Ok(())
    }

    fn write_secretary_part(&self, w: &mut ByteWriter) -> Result<()> {
        self.write_new_owner_part(w)?;
        if self.tracking_type > tracking_type::FINALIZED {
            return Err(WalletError::validation(format!("invalid tracking type {}", self.tracking_type)));
        }
        let new_owner_signature = if self.new_owner_public_key.is_empty() {
            Vec::new()
        } else {
            parse_signature("NewOwnerSignature", &self.new_owner_signature)?
        };
        let opinion_hash = parse_hash("SecretaryGeneralOpinionHash", &self.secretary_general_opinion_hash)?;
        w.var_bytes(&new_owner_signature).u8(self.tracking_type).bytes(&opinion_hash);
        if let Some(data) = &self.secretary_general_opinion_data {
            w.var_bytes(&parse_attached_data("SecretaryGeneralOpinionData", data, Some(&opinion_hash))?);
        }
        Ok(())
    }

    pub fn owner_digest(&self) -> Result<String> {
        let mut w = ByteWriter::new();
        self.write_owner_part(&mut w)?;
        Ok(digest_hex(w.as_slice()))
    }

    pub fn new_owner_digest(&self) -> Result<String> {
        let mut w = ByteWriter::new();
        self.write_new_owner_part(&mut w)?;
        Ok(digest_hex(w.as_slice()))
    }

    pub fn secretary_general_digest(&self) -> Result<String> {
        let mut w = ByteWriter::new();
        self.write_secretary_part(&mut w)?;
        Ok(digest_hex(w.as_slice()))
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        self.write_secretary_part(&mut w)?;
        w.var_bytes(&parse_signature(
            "SecretaryGeneralSignature",
            &self.secretary_general_signature,
        )?);
        Ok(w.into_bytes())
    }

    pub fn to_payload(&self) -> Result<PayloadBytes> {
        Ok(PayloadBytes::new(tx_type::CRC_PROPOSAL_TRACKING, self.version(), self.serialize()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::elastos::payload::hash_to_hex;
    use crate::crypto::hash::sha256d;
    use crate::crypto::signature_utils::CurveKind;

    fn sign(secret: &[u8; 32], digest: &str) -> String {
        let digest: [u8; 32] = hex::decode(digest).unwrap().try_into().unwrap();
        hex::encode(CurveKind::Secp256r1.sign_prehash(secret, &digest).unwrap())
    }

    fn tracking() -> CRCProposalTracking {
        CRCProposalTracking {
            proposal_hash: hash_to_hex(&sha256d(b"proposal")),
            message_hash: hash_to_hex(&sha256d(b"message")),
            stage: 1,
            owner_public_key: hex::encode(CurveKind::Secp256r1.public_key(&[1u8; 32]).unwrap()),
            tracking_type: tracking_type::PROGRESS,
            secretary_general_opinion_hash: hash_to_hex(&sha256d(b"opinion")),
            ..Default::default()
        }
    }

    #[test]
    fn test_progressive_digests() {
        let mut t = tracking();
        let owner = t.owner_digest().unwrap();
        assert!(t.new_owner_digest().is_err());
        t.owner_signature = sign(&[1u8; 32], &owner);
        let new_owner = t.new_owner_digest().unwrap();
        // No new owner: the secretary signs right after the owner.
        let secretary = t.secretary_general_digest().unwrap();
        assert_ne!(owner, new_owner);
        assert_ne!(new_owner, secretary);
        assert!(t.serialize().is_err());
        t.secretary_general_signature = sign(&[2u8; 32], &secretary);
        assert_eq!(t.to_payload().unwrap().version, 0);
    }

    #[test]
    fn test_change_owner_requires_new_owner_signature() {
        let mut t = tracking();
        t.tracking_type = tracking_type::CHANGE_OWNER;
        t.new_owner_public_key = hex::encode(CurveKind::Secp256r1.public_key(&[3u8; 32]).unwrap());
        t.owner_signature = sign(&[1u8; 32], &t.owner_digest().unwrap());
        assert!(t.secretary_general_digest().is_err());
        t.new_owner_signature = sign(&[3u8; 32], &t.new_owner_digest().unwrap());
        assert!(t.secretary_general_digest().is_ok());
    }

    #[test]
    fn test_message_data_selects_version_one() {
        let mut t = tracking();
        t.message_data = Some(hex::encode(b"message"));
        assert_eq!(t.version(), 1);
        assert!(t.owner_digest().is_ok());
    }
}

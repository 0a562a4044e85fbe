//! CRC proposal payload (tx type 0x25)
//!
//! Every proposal kind shares the same three-step signing flow:
//!
//! 1. the owner (and, depending on the kind, the new owner or the secretary
//!    general) signs the owner digest, SHA256 of the unsigned fields;
//! 2. a council member signs the council digest, SHA256 of the unsigned
//!    fields, the owner side signatures and the council member DID;
//! 3. the transaction carries the full payload with all signatures.
//!
//! The proposal hash other payloads refer to is SHA256d of the full payload.

use super::{
    digest_hex, hash_to_hex, parse_address, parse_amount, parse_attached_data, parse_hash,
    parse_public_key_field, parse_signature, PayloadBytes, MAX_CATEGORY_DATA,
};
use crate::blockchain::elastos::codec::ByteWriter;
use crate::core::errors::{Result, WalletError};
use crate::crypto::hash::sha256d;
use serde::{Deserialize, Serialize};

/// Proposal type values.
pub mod proposal_type {
    pub const NORMAL: u16 = 0x0000;
    pub const ELIP: u16 = 0x0100;
    pub const SECRETARY_GENERAL: u16 = 0x0400;
    pub const CHANGE_OWNER: u16 = 0x0401;
    pub const CLOSE: u16 = 0x0402;
    pub const RESERVE_CUSTOM_ID: u16 = 0x0500;
    pub const RECEIVE_CUSTOM_ID: u16 = 0x0501;
    pub const CHANGE_CUSTOM_ID_FEE: u16 = 0x0502;
}

/// Payment stage of a normal proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Budget {
    /// 0x00 imprest, 0x01 normal payment, 0x02 final payment.
    #[serde(rename = "Type")]
    pub budget_type: u8,
    pub stage: u8,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomIdFeeRateInfo {
    pub rate_of_custom_id_fee: String,
    #[serde(rename = "EIDEffectiveHeight")]
    pub eid_effective_height: u32,
}

/// A proposal of any kind. Fields not used by `proposal_type` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CRCProposal {
    #[serde(rename = "Type")]
    pub proposal_type: u16,
    #[serde(default)]
    pub category_data: String,
    pub owner_public_key: String,
    pub draft_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_data: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub budgets: Vec<Budget>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub recipient: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secretary_general_public_key: String,
    #[serde(rename = "SecretaryGeneralDID", default, skip_serializing_if = "String::is_empty")]
    pub secretary_general_did: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_proposal_hash: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub new_recipient: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub new_owner_public_key: String,

    #[serde(rename = "ReservedCustomIDList", default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_custom_id_list: Vec<String>,
    #[serde(rename = "ReceivedCustomIDList", default, skip_serializing_if = "Vec::is_empty")]
    pub received_custom_id_list: Vec<String>,
    #[serde(rename = "ReceiverDID", default, skip_serializing_if = "String::is_empty")]
    pub receiver_did: String,
    #[serde(rename = "CustomIDFeeRateInfo", default, skip_serializing_if = "Option::is_none")]
    pub custom_id_fee_rate_info: Option<CustomIdFeeRateInfo>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub new_owner_signature: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secretary_general_signature: String,
    #[serde(rename = "CRCouncilMemberDID", default, skip_serializing_if = "String::is_empty")]
    pub cr_council_member_did: String,
    #[serde(rename = "CRCouncilMemberSignature", default, skip_serializing_if = "String::is_empty")]
    pub cr_council_member_signature: String,
}

impl CRCProposal {
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let proposal: Self = serde_json::from_value(value.clone())?;
        proposal.validate()?;
        Ok(proposal)
    }

    /// Payload version 1 carries the draft data inline.
    pub fn version(&self) -> u8 {
        if self.draft_data.is_some() {
            1
        } else {
            0
        }
    }

    /// Size limits and type checks, run before any digest is computed.
    pub fn validate(&self) -> Result<()> {
        if self.category_data.len() > MAX_CATEGORY_DATA {
            return Err(WalletError::validation(format!(
                "CategoryData exceeds {} bytes",
                MAX_CATEGORY_DATA
            )));
        }
        use proposal_type::*;
        match self.proposal_type {
            NORMAL | ELIP | SECRETARY_GENERAL | CHANGE_OWNER | CLOSE | RESERVE_CUSTOM_ID
            | RECEIVE_CUSTOM_ID | CHANGE_CUSTOM_ID_FEE => {}
            other => {
                return Err(WalletError::validation(format!("unsupported proposal type {:#06x}", other)))
            }
        }
        if let Some(data) = &self.draft_data {
            let draft_hash = parse_hash("DraftHash", &self.draft_hash)?;
            parse_attached_data("DraftData", data, Some(&draft_hash))?;
        }
        Ok(())
    }

    /// Fields covered by the owner digest.
    pub fn serialize_owner_unsigned(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let mut w = ByteWriter::new();
        w.u16(self.proposal_type)
            .var_str(&self.category_data)
            .var_bytes(&parse_public_key_field("OwnerPublicKey", &self.owner_public_key)?)
            .bytes(&parse_hash("DraftHash", &self.draft_hash)?);
        if let Some(data) = &self.draft_data {
            w.var_bytes(&parse_attached_data("DraftData", data, None)?);
        }

        use proposal_type::*;
        match self.proposal_type {
            NORMAL | ELIP => {
                w.varint(self.budgets.len() as u64);
                for budget in &self.budgets {
                    w.u8(budget.budget_type)
                        .u8(budget.stage)
                        .i64(parse_amount("Budgets.Amount", &budget.amount)?);
                }
                w.bytes(parse_address("Recipient", &self.recipient)?.as_bytes());
            }
            SECRETARY_GENERAL => {
                w.var_bytes(&parse_public_key_field(
                    "SecretaryGeneralPublicKey",
                    &self.secretary_general_public_key,
                )?)
                .bytes(parse_address("SecretaryGeneralDID", &self.secretary_general_did)?.as_bytes());
            }
            CHANGE_OWNER => {
                w.bytes(&parse_hash("TargetProposalHash", &self.target_proposal_hash)?)
                    .bytes(parse_address("NewRecipient", &self.new_recipient)?.as_bytes())
                    .var_bytes(&parse_public_key_field("NewOwnerPublicKey", &self.new_owner_public_key)?);
            }
            CLOSE => {
                w.bytes(&parse_hash("TargetProposalHash", &self.target_proposal_hash)?);
            }
            RESERVE_CUSTOM_ID => {
                write_id_list(&mut w, &self.reserved_custom_id_list);
            }
            RECEIVE_CUSTOM_ID => {
                write_id_list(&mut w, &self.received_custom_id_list);
                w.bytes(parse_address("ReceiverDID", &self.receiver_did)?.as_bytes());
            }
            CHANGE_CUSTOM_ID_FEE => {
                let info = self
                    .custom_id_fee_rate_info
                    .as_ref()
                    .ok_or_else(|| WalletError::validation("CustomIDFeeRateInfo is required"))?;
                w.i64(parse_amount("RateOfCustomIDFee", &info.rate_of_custom_id_fee)?)
                    .u32(info.eid_effective_height);
            }
            other => {
                return Err(WalletError::validation(format!("unsupported proposal type {:#06x}", other)))
            }
        }
        Ok(w.into_bytes())
    }

    pub fn owner_digest(&self) -> Result<String> {
        Ok(digest_hex(&self.serialize_owner_unsigned()?))
    }

    /// Owner side signatures and the council member DID appended to the
    /// owner fields.
    pub fn serialize_council_unsigned(&self) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        w.bytes(&self.serialize_owner_unsigned()?)
            .var_bytes(&parse_signature("Signature", &self.signature)?);
        match self.proposal_type {
            proposal_type::SECRETARY_GENERAL => {
                w.var_bytes(&parse_signature(
                    "SecretaryGeneralSignature",
                    &self.secretary_general_signature,
                )?);
            }
            proposal_type::CHANGE_OWNER => {
                w.var_bytes(&parse_signature("NewOwnerSignature", &self.new_owner_signature)?);
            }
            _ => {}
        }
        w.bytes(parse_address("CRCouncilMemberDID", &self.cr_council_member_did)?.as_bytes());
        Ok(w.into_bytes())
    }

    pub fn council_digest(&self) -> Result<String> {
        Ok(digest_hex(&self.serialize_council_unsigned()?))
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        w.bytes(&self.serialize_council_unsigned()?).var_bytes(&parse_signature(
            "CRCouncilMemberSignature",
            &self.cr_council_member_signature,
        )?);
        Ok(w.into_bytes())
    }

    /// Display-order hash identifying this proposal on chain.
    pub fn proposal_hash(&self) -> Result<String> {
        Ok(hash_to_hex(&sha256d(&self.serialize()?)))
    }

    pub fn to_payload(&self) -> Result<PayloadBytes> {
        Ok(PayloadBytes::new(super::tx_type::CRC_PROPOSAL, self.version(), self.serialize()?))
    }
}

fn write_id_list(w: &mut ByteWriter, ids: &[String]) {
    w.varint(ids.len() as u64);
    for id in ids {
        w.var_str(id);
    }
}

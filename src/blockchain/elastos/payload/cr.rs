//! Council (CR) member payloads.

use super::{digest_hex, parse_address, parse_public_key_field, parse_signature};
use crate::blockchain::elastos::address::{self, ProgramHash};
use crate::blockchain::elastos::codec::ByteWriter;
use crate::core::errors::{Result, WalletError};
use serde::{Deserialize, Serialize};

/// Payload version carrying the DID next to the CID.
pub const CR_INFO_DID_VERSION: u8 = 0x01;

/// Register and update CR payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CRInfo {
    /// Hex redeem script of the CR key.
    pub code: String,
    #[serde(rename = "CID")]
    pub cid: String,
    #[serde(rename = "DID")]
    pub did: String,
    pub nick_name: String,
    pub url: String,
    pub location: u64,
    #[serde(default)]
    pub signature: String,
}

impl CRInfo {
    /// Fills the identifiers from the CR public key.
    pub fn new(public_key: &[u8; 33], nick_name: &str, url: &str, location: u64) -> Self {
        Self {
            code: hex::encode(address::standard_code(public_key)),
            cid: address::cid(public_key),
            did: address::did(public_key),
            nick_name: nick_name.to_string(),
            url: url.to_string(),
            location,
            signature: String::new(),
        }
    }

    pub fn serialize_unsigned(&self) -> Result<Vec<u8>> {
        let code = hex::decode(&self.code)?;
        address::Code::parse(&code)?;
        let cid = parse_address("CID", &self.cid)?;
        let did = parse_address("DID", &self.did)?;
        let mut w = ByteWriter::new();
        w.var_bytes(&code)
            .bytes(cid.as_bytes())
            .bytes(did.as_bytes())
            .var_str(&self.nick_name)
            .var_str(&self.url)
            .u64(self.location);
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

    /// Public key inside the redeem script.
    pub fn public_key(&self) -> Result<[u8; 33]> {
        match address::Code::parse(&hex::decode(&self.code)?)? {
            address::Code::Standard(pk) => Ok(pk),
            _ => Err(WalletError::validation("CR code must be a standard script")),
        }
    }
}

/// Unregister CR payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnregisterCR {
    #[serde(rename = "CID")]
    pub cid: String,
    #[serde(default)]
    pub signature: String,
}

impl UnregisterCR {
    pub fn serialize_unsigned(&self) -> Result<Vec<u8>> {
        let cid = parse_address("CID", &self.cid)?;
        Ok(cid.as_bytes().to_vec())
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
}

/// Council member claims a node public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CRCouncilMemberClaimNode {
    pub node_public_key: String,
    #[serde(rename = "CRCouncilMemberDID")]
    pub cr_council_member_did: String,
    #[serde(rename = "CRCouncilMemberSignature", default)]
    pub cr_council_member_signature: String,
}

impl CRCouncilMemberClaimNode {
    pub fn serialize_unsigned(&self) -> Result<Vec<u8>> {
        let node = parse_public_key_field("NodePublicKey", &self.node_public_key)?;
        let did: ProgramHash = parse_address("CRCouncilMemberDID", &self.cr_council_member_did)?;
        let mut w = ByteWriter::new();
        w.var_bytes(&node).bytes(did.as_bytes());
        Ok(w.into_bytes())
    }

    pub fn digest(&self) -> Result<String> {
        Ok(digest_hex(&self.serialize_unsigned()?))
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        w.bytes(&self.serialize_unsigned()?).var_bytes(&parse_signature(
            "CRCouncilMemberSignature",
            &self.cr_council_member_signature,
        )?);
        Ok(w.into_bytes())
    }
}

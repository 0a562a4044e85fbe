//! Producer (DPoS supernode) registration payloads.

use super::{digest_hex, parse_public_key_field, parse_signature};
use crate::blockchain::elastos::codec::ByteWriter;
use crate::core::errors::Result;
use serde::{Deserialize, Serialize};

/// Register and update producer payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProducerInfo {
    pub owner_public_key: String,
    pub node_public_key: String,
    pub nick_name: String,
    pub url: String,
    pub location: u64,
    pub net_address: String,
    #[serde(default)]
    pub signature: String,
}

impl ProducerInfo {
    pub fn serialize_unsigned(&self) -> Result<Vec<u8>> {
        let owner = parse_public_key_field("OwnerPublicKey", &self.owner_public_key)?;
        let node = parse_public_key_field("NodePublicKey", &self.node_public_key)?;
        let mut w = ByteWriter::new();
        w.var_bytes(&owner)
            .var_bytes(&node)
            .var_str(&self.nick_name)
            .var_str(&self.url)
            .u64(self.location)
            .var_str(&self.net_address);
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
}

/// Cancel producer payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessProducerInfo {
    pub owner_public_key: String,
    #[serde(default)]
    pub signature: String,
}

impl ProcessProducerInfo {
    pub fn serialize_unsigned(&self) -> Result<Vec<u8>> {
        let owner = parse_public_key_field("OwnerPublicKey", &self.owner_public_key)?;
        let mut w = ByteWriter::new();
        w.var_bytes(&owner);
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
}

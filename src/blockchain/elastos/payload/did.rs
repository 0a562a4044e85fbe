//! DID document operation carried by ID chain transactions (tx type 0x0a).

use super::{tx_type, PayloadBytes};
use crate::blockchain::elastos::codec::ByteWriter;
use crate::core::errors::{Result, WalletError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidHeader {
    pub specification: String,
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_txid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidProof {
    #[serde(rename = "type", default = "DidProof::default_type")]
    pub proof_type: String,
    pub verification_method: String,
    pub signature: String,
}

impl DidProof {
    fn default_type() -> String {
        "ECDSAsecp256r1".to_string()
    }
}

/// Signed DID operation as published by a DID client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidOperation {
    pub header: DidHeader,
    pub payload: String,
    pub proof: DidProof,
}

impl DidOperation {
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let op: Self = serde_json::from_value(value.clone())?;
        match op.header.operation.as_str() {
            "create" | "update" | "transfer" | "deactivate" => {}
            other => return Err(WalletError::validation(format!("unknown DID operation {}", other))),
        }
        if op.header.operation == "update" && op.header.previous_txid.is_none() {
            return Err(WalletError::validation("DID update requires previousTxid"));
        }
        Ok(op)
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.var_str(&self.header.specification).var_str(&self.header.operation);
        if self.header.operation == "update" {
            w.var_str(self.header.previous_txid.as_deref().unwrap_or_default());
        }
        w.var_str(&self.payload)
            .var_str(&self.proof.proof_type)
            .var_str(&self.proof.verification_method)
            .var_str(&self.proof.signature);
        w.into_bytes()
    }

    pub fn to_payload(&self) -> PayloadBytes {
        PayloadBytes::new(tx_type::DID_OPERATION, 0, self.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(operation: &str) -> serde_json::Value {
        serde_json::json!({
            "header": {"specification": "elastos/did/1.0", "operation": operation},
            "payload": "eyJpZCI6ImRpZDplbGFzdG9zOmlxIn0",
            "proof": {"verificationMethod": "#primary", "signature": "c2ln"},
        })
    }

    #[test]
    fn test_create_operation() {
        let op = DidOperation::from_json(&json("create")).unwrap();
        assert_eq!(op.proof.proof_type, "ECDSAsecp256r1");
        let bytes = op.serialize();
        assert_eq!(bytes[0] as usize, "elastos/did/1.0".len());
        assert_eq!(op.to_payload().tx_type, 0x0a);
    }

    #[test]
    fn test_update_needs_previous_txid() {
        assert!(DidOperation::from_json(&json("update")).is_err());
        assert!(DidOperation::from_json(&json("erase")).is_err());
    }
}

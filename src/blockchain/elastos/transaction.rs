//! Elastos transaction wire format and its JSON envelope
//!
//! The envelope keeps the unsigned serialization as hex in `Data`. Signing
//! and co-signing only touch `Programs`, so the digest every signer sees is
//! the digest the creator computed.

use super::address::ProgramHash;
use super::codec::{ByteReader, ByteWriter};
use super::payload::{hash_to_hex, parse_hash, PayloadBytes};
use super::utxo::UtxoInput;
use crate::core::errors::{Result, WalletError};
use crate::crypto::hash::{sha256, sha256d};
use serde::{Deserialize, Serialize};

/// First version with output types and output payloads.
pub const TX_VERSION_09: u8 = 0x09;

/// ELA asset id, display order.
pub const ELA_ASSET_ID: &str = "a3d0eaa466df74983b5d7c543de6904f4c9418ead5ffd6d25814234a96db37b0";

pub const DEFAULT_SEQUENCE: u32 = 0xFFFF_FFFE;

pub mod attribute_usage {
    pub const NONCE: u8 = 0x00;
    pub const MEMO: u8 = 0x81;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub usage: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Hash byte order.
    pub txid: [u8; 32],
    pub index: u16,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub asset_id: [u8; 32],
    pub value: i64,
    pub output_lock: u32,
    pub program_hash: ProgramHash,
    pub output_type: u8,
    pub payload: Vec<u8>,
}

impl TxOutput {
    pub fn ela(program_hash: ProgramHash, value: i64) -> Result<Self> {
        Ok(Self {
            asset_id: parse_hash("AssetID", ELA_ASSET_ID)?,
            value,
            output_lock: 0,
            program_hash,
            output_type: super::payload::output_type::NONE,
            payload: Vec::new(),
        })
    }

    pub fn with_payload(mut self, output_type: u8, payload: Vec<u8>) -> Self {
        self.output_type = output_type;
        self.payload = payload;
        self
    }
}

/// Unsigned part of a transaction: everything the digest covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    pub version: u8,
    pub tx_type: u8,
    pub payload_version: u8,
    pub payload: Vec<u8>,
    pub attributes: Vec<Attribute>,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl UnsignedTx {
    pub fn new(payload: PayloadBytes) -> Self {
        Self {
            version: TX_VERSION_09,
            tx_type: payload.tx_type,
            payload_version: payload.version,
            payload: payload.bytes,
            attributes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        if self.version >= TX_VERSION_09 {
            w.u8(self.version);
        }
        w.u8(self.tx_type).u8(self.payload_version).bytes(&self.payload);

        w.varint(self.attributes.len() as u64);
        for attr in &self.attributes {
            w.u8(attr.usage).var_bytes(&attr.data);
        }
        w.varint(self.inputs.len() as u64);
        for input in &self.inputs {
            w.bytes(&input.txid).u16(input.index).u32(input.sequence);
        }
        w.varint(self.outputs.len() as u64);
        for output in &self.outputs {
            w.bytes(&output.asset_id)
                .i64(output.value)
                .u32(output.output_lock)
                .bytes(output.program_hash.as_bytes());
            if self.version >= TX_VERSION_09 {
                w.u8(output.output_type).bytes(&output.payload);
            }
        }
        w.u32(self.lock_time);
        w.into_bytes()
    }
}

/// Redeem script and its collected signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Program {
    pub code: String,
    #[serde(default)]
    pub parameter: String,
}

impl Program {
    pub fn code_bytes(&self) -> Result<Vec<u8>> {
        Ok(hex::decode(&self.code)?)
    }

    /// Splits the parameter into its `0x40 <sig64>` pushes.
    pub fn signatures(&self) -> Result<Vec<Vec<u8>>> {
        let param = hex::decode(&self.parameter)?;
        let mut reader = ByteReader::new(&param);
        let mut out = Vec::new();
        while reader.remaining() > 0 {
            let sig = reader.var_bytes()?;
            if sig.len() != 64 {
                return Err(WalletError::validation("program parameter holds a malformed signature"));
            }
            out.push(sig.to_vec());
        }
        Ok(out)
    }

    pub fn set_signatures(&mut self, signatures: &[Vec<u8>]) {
        let mut w = ByteWriter::new();
        for sig in signatures {
            w.var_bytes(sig);
        }
        self.parameter = hex::encode(w.as_slice());
    }
}

/// Transaction as exchanged with callers and co-signers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transaction {
    #[serde(rename = "ChainID")]
    pub chain_id: String,
    #[serde(rename = "ID")]
    pub id: String,
    pub version: u8,
    #[serde(rename = "Type")]
    pub tx_type: u8,
    pub fee: String,
    /// Hex of the unsigned serialization.
    pub data: String,
    pub inputs: Vec<UtxoInput>,
    #[serde(default)]
    pub programs: Vec<Program>,
}

impl Transaction {
    pub fn new(chain_id: &str, unsigned: &UnsignedTx, fee: i64, inputs: Vec<UtxoInput>) -> Self {
        let data = unsigned.serialize();
        Self {
            chain_id: chain_id.to_string(),
            id: hash_to_hex(&sha256d(&data)),
            version: unsigned.version,
            tx_type: unsigned.tx_type,
            fee: fee.to_string(),
            data: hex::encode(&data),
            inputs,
            programs: Vec::new(),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let tx: Self = serde_json::from_value(value.clone())?;
        let data = tx.unsigned_bytes()?;
        if hash_to_hex(&sha256d(&data)) != tx.id.to_lowercase() {
            return Err(WalletError::validation("transaction ID does not match its data"));
        }
        Ok(tx)
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn unsigned_bytes(&self) -> Result<Vec<u8>> {
        Ok(hex::decode(&self.data)?)
    }

    /// SHA256 of the unsigned serialization; what every program signs.
    pub fn digest(&self) -> Result<[u8; 32]> {
        Ok(sha256(&self.unsigned_bytes()?))
    }

    /// Unsigned data followed by the programs, ready for broadcast.
    pub fn raw(&self) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        w.bytes(&self.unsigned_bytes()?).varint(self.programs.len() as u64);
        for program in &self.programs {
            w.var_bytes(&program.code_bytes()?)
                .var_bytes(&hex::decode(&program.parameter)?);
        }
        Ok(w.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::elastos::address::{standard_code, Prefix};
    use crate::blockchain::elastos::payload::tx_type;
    use crate::crypto::signature_utils::CurveKind;

    fn sample() -> UnsignedTx {
        let pk = CurveKind::Secp256r1.public_key(&[1u8; 32]).unwrap();
        let mut tx = UnsignedTx::new(PayloadBytes::empty(tx_type::TRANSFER_ASSET));
        tx.inputs.push(TxInput { txid: [7u8; 32], index: 1, sequence: DEFAULT_SEQUENCE });
        tx.outputs.push(
            TxOutput::ela(ProgramHash::from_code(Prefix::Standard, &standard_code(&pk)), 500).unwrap(),
        );
        tx
    }

    #[test]
    fn test_unsigned_layout() {
        let bytes = sample().serialize();
        assert_eq!(&bytes[..3], &[0x09, 0x02, 0x00]);
        // version, type, payload version, attrs, inputs, outputs, locktime
        assert_eq!(bytes.len(), 3 + 1 + (1 + 38) + (1 + 32 + 8 + 4 + 21 + 1) + 4);
        // Asset id is written in hash order.
        assert_eq!(bytes[3 + 1 + 39 + 1], 0xb0);
    }

    #[test]
    fn test_memo_changes_digest() {
        let plain = sample();
        let mut with_memo = sample();
        with_memo.attributes.push(Attribute { usage: attribute_usage::MEMO, data: b"hi".to_vec() });
        let a = Transaction::new("ELA", &plain, 100, Vec::new());
        let b = Transaction::new("ELA", &with_memo, 100, Vec::new());
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_program_parameter_round_trip() {
        let mut program = Program { code: "00".into(), parameter: String::new() };
        program.set_signatures(&[vec![1u8; 64], vec![2u8; 64]]);
        assert_eq!(program.parameter.len(), 2 * 65 * 2);
        assert_eq!(program.signatures().unwrap()[1], vec![2u8; 64]);

        program.parameter = "0401020304".into();
        assert!(program.signatures().is_err());
    }

    #[test]
    fn test_json_rejects_tampered_data() {
        let tx = Transaction::new("ELA", &sample(), 100, Vec::new());
        let mut json = tx.to_json().unwrap();
        assert_eq!(Transaction::from_json(&json).unwrap(), tx);
        json["Data"] = serde_json::Value::String(format!("{}00", tx.data));
        assert!(Transaction::from_json(&json).is_err());
    }

    #[test]
    fn test_raw_appends_programs() {
        let mut tx = Transaction::new("ELA", &sample(), 100, Vec::new());
        tx.programs.push(Program { code: "aa".into(), parameter: String::new() });
        let raw = tx.raw().unwrap();
        assert_eq!(raw.len(), tx.unsigned_bytes().unwrap().len() + 1 + 2 + 1);
    }
}

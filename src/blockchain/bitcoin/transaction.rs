//! Bitcoin transaction construction and signing
//!
//! Transactions are built unsigned from caller supplied UTXOs, returned as
//! hex, and signed in a second step once the keys owning each input address
//! are unlocked. P2WPKH inputs get a witness, P2PKH inputs a script_sig.

use super::address::{self, AddressType};
use crate::core::errors::{Result, WalletError};
use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::{deserialize, serialize};
use bitcoin::hashes::Hash;
use bitcoin::script::PushBytesBuf;
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, Network, OutPoint, PublicKey, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;
use zeroize::Zeroizing;

/// Outputs below this many satoshis are not relayed.
pub const DUST_THRESHOLD: u64 = 546;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BtcInput {
    pub tx_hash: String,
    pub index: u32,
    pub address: String,
    /// Satoshis.
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BtcOutput {
    pub address: String,
    pub amount: u64,
}

/// Transaction as handed to callers between construction and broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BtcTransaction {
    #[serde(rename = "ChainID")]
    pub chain_id: String,
    pub unsigned: String,
    pub inputs: Vec<BtcInput>,
    pub fee: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed: Option<String>,
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Virtual size estimate for P2WPKH spends.
pub fn estimate_vsize(inputs: usize, outputs: usize) -> u64 {
    10 + 68 * inputs as u64 + 31 * outputs as u64
}

/// Fee for `inputs` and `outputs`, counting one extra output for change.
pub fn estimate_fee(inputs: usize, outputs: usize, fee_per_kb: u64) -> u64 {
    fee_per_kb.saturating_mul(estimate_vsize(inputs, outputs + 1)) / 1000
}

impl BtcTransaction {
    pub fn create(
        network: Network,
        inputs: Vec<BtcInput>,
        outputs: &[BtcOutput],
        change_address: &str,
        fee_per_kb: u64,
    ) -> Result<Self> {
        if inputs.is_empty() || outputs.is_empty() {
            return Err(WalletError::validation("inputs and outputs must not be empty"));
        }
        let total_in = inputs
            .iter()
            .try_fold(0u64, |acc, i| acc.checked_add(i.amount))
            .ok_or_else(|| WalletError::validation("input total overflows"))?;
        let total_out = outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
            .ok_or_else(|| WalletError::validation("output total overflows"))?;
        if outputs.iter().any(|o| o.amount < DUST_THRESHOLD) {
            return Err(WalletError::validation("output below dust threshold"));
        }
        let fee = estimate_fee(inputs.len(), outputs.len(), fee_per_kb);
        let needed = total_out.saturating_add(fee);
        if total_in < needed {
            return Err(WalletError::InsufficientFundsError(format!(
                "need {} sat, inputs hold {} sat",
                needed, total_in
            )));
        }

        let mut tx_inputs = Vec::with_capacity(inputs.len());
        for input in &inputs {
            address::detect_type(&input.address, network)?;
            let txid = Txid::from_str(&input.tx_hash)
                .map_err(|e| WalletError::validation(format!("invalid TxHash {}: {}", input.tx_hash, e)))?;
            tx_inputs.push(TxIn {
                previous_output: OutPoint { txid, vout: input.index },
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::new(),
            });
        }
        let mut tx_outputs = Vec::with_capacity(outputs.len() + 1);
        for output in outputs {
            tx_outputs.push(TxOut {
                value: Amount::from_sat(output.amount),
                script_pubkey: address::script_pubkey(&output.address, network)?,
            });
        }
        let change = total_in - needed;
        let fee = if change > DUST_THRESHOLD {
            tx_outputs.push(TxOut {
                value: Amount::from_sat(change),
                script_pubkey: address::script_pubkey(change_address, network)?,
            });
            fee
        } else {
            fee + change
        };

        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: tx_inputs,
            output: tx_outputs,
        };
        debug!(txid = %tx.txid(), fee, "built bitcoin transaction");
        Ok(Self {
            chain_id: "BTC".to_string(),
            unsigned: hex::encode(serialize(&tx)),
            inputs,
            fee,
            signed: None,
            id: None,
        })
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    fn decode_unsigned(&self) -> Result<Transaction> {
        let bytes = hex::decode(&self.unsigned)?;
        let tx: Transaction = deserialize(&bytes)
            .map_err(|e| WalletError::SerializationError(format!("bitcoin transaction: {}", e)))?;
        if tx.input.len() != self.inputs.len() {
            return Err(WalletError::validation("Inputs do not match the unsigned transaction"));
        }
        Ok(tx)
    }

    /// Signs every input. `key_for` returns the secret key owning an input
    /// address.
    pub fn sign(
        &mut self,
        network: Network,
        key_for: impl Fn(&str) -> Result<Zeroizing<[u8; 32]>>,
    ) -> Result<()> {
        let mut tx = self.decode_unsigned()?;
        let secp = Secp256k1::new();
        for (i, input) in self.inputs.iter().enumerate() {
            let secret = key_for(&input.address)?;
            let sk = SecretKey::from_slice(&secret[..])
                .map_err(|e| WalletError::crypto(format!("invalid bitcoin key: {}", e)))?;
            let pk = PublicKey::new(sk.public_key(&secp));

            let sighash_type = EcdsaSighashType::All;
            let digest = match address::detect_type(&input.address, network)? {
                AddressType::SegWit => {
                    let script_code = ScriptBuf::new_p2pkh(&pk.pubkey_hash());
                    let mut cache = SighashCache::new(&tx);
                    #[allow(deprecated)]
                    let hash = cache
                        .segwit_signature_hash(i, &script_code, Amount::from_sat(input.amount), sighash_type)
                        .map_err(|e| WalletError::crypto(format!("segwit sighash: {}", e)))?;
                    *hash.as_byte_array()
                }
                AddressType::Legacy => {
                    let script_pubkey = address::script_pubkey(&input.address, network)?;
                    let cache = SighashCache::new(&tx);
                    let hash = cache
                        .legacy_signature_hash(i, &script_pubkey, sighash_type.to_u32())
                        .map_err(|e| WalletError::crypto(format!("legacy sighash: {}", e)))?;
                    *hash.as_byte_array()
                }
            };

            let message = Message::from_digest(digest);
            let signature = secp.sign_ecdsa(&message, &sk);
            let mut sig_bytes = signature.serialize_der().to_vec();
            sig_bytes.push(sighash_type.to_u32() as u8);
            let pk_bytes = pk.to_bytes();

            match address::detect_type(&input.address, network)? {
                AddressType::SegWit => {
                    tx.input[i].witness = Witness::from_slice(&[sig_bytes, pk_bytes]);
                }
                AddressType::Legacy => {
                    let sig_push = PushBytesBuf::try_from(sig_bytes)
                        .map_err(|e| WalletError::crypto(format!("signature push: {:?}", e)))?;
                    let pk_push = PushBytesBuf::try_from(pk_bytes)
                        .map_err(|e| WalletError::crypto(format!("public key push: {:?}", e)))?;
                    tx.input[i].script_sig = bitcoin::blockdata::script::Builder::new()
                        .push_slice(sig_push)
                        .push_slice(pk_push)
                        .into_script();
                }
            }
        }
        self.id = Some(tx.txid().to_string());
        self.signed = Some(hex::encode(serialize(&tx)));
        debug!(txid = ?self.id, "signed bitcoin transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signature_utils::CurveKind;

    const SECRET: [u8; 32] = [0x51; 32];

    fn own(kind: AddressType) -> String {
        let pk = CurveKind::Secp256k1.public_key(&SECRET).unwrap();
        address::from_public_key(&pk, kind, Network::Testnet).unwrap()
    }

    fn input(kind: AddressType, amount: u64) -> BtcInput {
        BtcInput { tx_hash: "ab".repeat(32), index: 0, address: own(kind), amount }
    }

    fn to() -> Vec<BtcOutput> {
        let pk = CurveKind::Secp256k1.public_key(&[0x52; 32]).unwrap();
        vec![BtcOutput {
            address: address::from_public_key(&pk, AddressType::SegWit, Network::Testnet).unwrap(),
            amount: 50_000,
        }]
    }

    #[test]
    fn test_fee_estimate() {
        assert_eq!(estimate_vsize(1, 2), 10 + 68 + 62);
        assert_eq!(estimate_fee(1, 1, 10_000), 1400);
    }

    #[test]
    fn test_create_with_change() {
        let tx = BtcTransaction::create(
            Network::Testnet,
            vec![input(AddressType::SegWit, 100_000)],
            &to(),
            &own(AddressType::SegWit),
            10_000,
        )
        .unwrap();
        assert_eq!(tx.fee, 1400);
        let decoded = tx.decode_unsigned().unwrap();
        assert_eq!(decoded.output.len(), 2);
        assert_eq!(decoded.output[1].value, Amount::from_sat(100_000 - 50_000 - 1400));
        assert_eq!(decoded.version, Version::TWO);
    }

    #[test]
    fn test_small_change_goes_to_fee() {
        let tx = BtcTransaction::create(
            Network::Testnet,
            vec![input(AddressType::SegWit, 50_500)],
            &to(),
            &own(AddressType::SegWit),
            1_000,
        )
        .unwrap();
        assert_eq!(tx.decode_unsigned().unwrap().output.len(), 1);
        assert_eq!(tx.fee, 500);
    }

    #[test]
    fn test_insufficient_funds() {
        let err = BtcTransaction::create(
            Network::Testnet,
            vec![input(AddressType::SegWit, 50_000)],
            &to(),
            &own(AddressType::SegWit),
            10_000,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "InsufficientFundsError");
    }

    #[test]
    fn test_sign_segwit_and_legacy_inputs() {
        let mut tx = BtcTransaction::create(
            Network::Testnet,
            vec![input(AddressType::SegWit, 40_000), BtcInput { index: 1, ..input(AddressType::Legacy, 40_000) }],
            &to(),
            &own(AddressType::SegWit),
            1_000,
        )
        .unwrap();
        tx.sign(Network::Testnet, |_| Ok(Zeroizing::new(SECRET))).unwrap();
        let signed: Transaction = deserialize(&hex::decode(tx.signed.as_ref().unwrap()).unwrap()).unwrap();
        assert_eq!(signed.input[0].witness.len(), 2);
        assert!(signed.input[0].script_sig.is_empty());
        assert!(signed.input[1].witness.is_empty());
        assert!(!signed.input[1].script_sig.is_empty());
        assert_eq!(tx.id.as_deref().unwrap(), signed.txid().to_string());
    }
}

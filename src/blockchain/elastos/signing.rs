//! Program signing for Elastos transactions
//!
//! Each program is a redeem script plus the signatures collected so far.
//! Standard scripts take one signature. Multi-sign scripts collect up to N
//! signatures in signing order, and the transaction is complete once every
//! program holds at least M valid ones.

use super::address::Code;
use super::transaction::{Program, Transaction};
use crate::core::errors::{Result, WalletError};
use crate::crypto::multisig::{SignatureSet, ThresholdPolicy};
use crate::crypto::signature_utils::CurveKind;
use serde_json::json;
use tracing::debug;
use zeroize::Zeroizing;

/// Source of private keys for the public keys found in redeem scripts.
pub trait KeyProvider {
    /// Secret for `public_key`, or `None` when this wallet does not hold it.
    fn secret_for(&self, public_key: &[u8; 33]) -> Result<Option<Zeroizing<[u8; 32]>>>;
}

/// Rebuilds the signature set of a program, attributing every signature in
/// the parameter to the script key that verifies it.
fn collect_signatures(code: &Code, program: &Program, digest: &[u8; 32]) -> Result<SignatureSet> {
    let (m, n) = code.threshold();
    let mut set = SignatureSet::new(CurveKind::Secp256r1, ThresholdPolicy::new(m, n)?, digest.to_vec());
    let keys = code.public_keys();
    for sig in program.signatures()? {
        let signer = keys
            .iter()
            .find(|pk| !set.contains(&pk[..]) && CurveKind::Secp256r1.verify_prehash(&pk[..], digest, &sig))
            .ok_or_else(|| WalletError::validation("program carries a signature from no listed key"))?;
        set.add(&signer[..], &sig)?;
    }
    Ok(set)
}

/// Adds this wallet's signatures to every program it holds a key for.
/// Returns the number of signatures added.
pub fn sign_transaction(tx: &mut Transaction, keys: &dyn KeyProvider) -> Result<usize> {
    let digest = tx.digest()?;
    let mut added = 0;
    let mut already_signed = false;

    for program in tx.programs.iter_mut() {
        let code = Code::parse(&program.code_bytes()?)?;
        let mut set = collect_signatures(&code, program, &digest)?;
        for pk in code.public_keys() {
            let Some(secret) = keys.secret_for(&pk)? else {
                continue;
            };
            if set.contains(&pk[..]) {
                already_signed = true;
                continue;
            }
            let sig = CurveKind::Secp256r1.sign_prehash(&secret[..], &digest)?;
            set.add(&pk[..], &sig)?;
            added += 1;
        }
        let sigs: Vec<Vec<u8>> = set.contributions().iter().map(|c| c.signature.clone()).collect();
        program.set_signatures(&sigs);
    }

    if added == 0 {
        if already_signed {
            return Err(WalletError::DuplicateSignerError(
                "this wallet already signed the transaction".into(),
            ));
        }
        return Err(WalletError::validation("no input of this transaction belongs to the wallet"));
    }
    debug!(id = %tx.id, added, "signed transaction");
    Ok(added)
}

/// Adds an externally produced signature from `signer` to the program whose
/// script lists that key.
pub fn add_signature(tx: &mut Transaction, signer: &[u8; 33], signature: &[u8]) -> Result<()> {
    let digest = tx.digest()?;
    for program in tx.programs.iter_mut() {
        let code = Code::parse(&program.code_bytes()?)?;
        if !code.public_keys().contains(signer) {
            continue;
        }
        let mut set = collect_signatures(&code, program, &digest)?;
        set.add(&signer[..], signature)?;
        let sigs: Vec<Vec<u8>> = set.contributions().iter().map(|c| c.signature.clone()).collect();
        program.set_signatures(&sigs);
        return Ok(());
    }
    Err(WalletError::validation(format!("{} signs no input of this transaction", hex::encode(signer))))
}

/// Per program signing summary, in program order.
pub fn signed_info(tx: &Transaction) -> Result<serde_json::Value> {
    let digest = tx.digest()?;
    let mut out = Vec::with_capacity(tx.programs.len());
    for program in &tx.programs {
        let code = Code::parse(&program.code_bytes()?)?;
        let set = collect_signatures(&code, program, &digest)?;
        let signers: Vec<String> = set.contributions().iter().map(|c| hex::encode(&c.signer)).collect();
        out.push(match code {
            Code::MultiSign { m, public_keys } => json!({
                "SignType": "MultiSign",
                "M": m,
                "N": public_keys.len(),
                "Signers": signers,
            }),
            _ => json!({"SignType": "Standard", "Signers": signers}),
        });
    }
    Ok(serde_json::Value::Array(out))
}

/// True when every program holds enough valid signatures.
pub fn is_complete(tx: &Transaction) -> Result<bool> {
    let digest = tx.digest()?;
    for program in &tx.programs {
        let code = Code::parse(&program.code_bytes()?)?;
        if !collect_signatures(&code, program, &digest)?.is_complete() {
            return Ok(false);
        }
    }
    Ok(!tx.programs.is_empty())
}

/// Raw hex for broadcast. Fails unless the transaction is complete.
pub fn convert_to_raw(tx: &Transaction) -> Result<String> {
    let digest = tx.digest()?;
    for (i, program) in tx.programs.iter().enumerate() {
        let code = Code::parse(&program.code_bytes()?)?;
        let set = collect_signatures(&code, program, &digest)?;
        if !set.is_complete() {
            let (m, _) = code.threshold();
            return Err(WalletError::IncompleteSignatureError(format!(
                "program {} has {} of {} signatures",
                i,
                set.len(),
                m
            )));
        }
    }
    if tx.programs.is_empty() {
        return Err(WalletError::IncompleteSignatureError("transaction has no programs".into()));
    }
    Ok(hex::encode(tx.raw()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::elastos::address::{multisig_address, multisig_code, standard_address, standard_code};
    use crate::blockchain::elastos::builder::TxBuilder;
    use crate::blockchain::elastos::payload::{tx_type, PayloadBytes};
    use crate::blockchain::elastos::utxo::UtxoInput;
    use crate::core::chain::ChainId;
    use std::collections::HashMap;

    struct Keys(HashMap<[u8; 33], [u8; 32]>);

    impl Keys {
        fn of(seeds: &[u8]) -> Self {
            Self(
                seeds
                    .iter()
                    .map(|s| (CurveKind::Secp256r1.public_key(&[*s; 32]).unwrap(), [*s; 32]))
                    .collect(),
            )
        }
    }

    impl KeyProvider for Keys {
        fn secret_for(&self, public_key: &[u8; 33]) -> Result<Option<Zeroizing<[u8; 32]>>> {
            Ok(self.0.get(public_key).map(|s| Zeroizing::new(*s)))
        }
    }

    fn pk(seed: u8) -> [u8; 33] {
        CurveKind::Secp256r1.public_key(&[seed; 32]).unwrap()
    }

    fn tx_from(address: String, code: Vec<u8>) -> Transaction {
        TxBuilder::new(ChainId::Ela, PayloadBytes::empty(tx_type::TRANSFER_ASSET))
            .inputs(vec![UtxoInput {
                tx_hash: "33".repeat(32),
                index: 0,
                address: address.clone(),
                amount: "1000".into(),
            }])
            .pay_to(&address, 500)
            .unwrap()
            .fee(10)
            .build(move |_| Ok(code.clone()))
            .unwrap()
    }

    #[test]
    fn test_standard_sign_then_raw() {
        let mut tx = tx_from(standard_address(&pk(1)), standard_code(&pk(1)));
        assert_eq!(convert_to_raw(&tx).unwrap_err().kind(), "IncompleteSignatureError");
        assert_eq!(sign_transaction(&mut tx, &Keys::of(&[1])).unwrap(), 1);
        assert!(is_complete(&tx).unwrap());
        assert!(convert_to_raw(&tx).is_ok());
        let err = sign_transaction(&mut tx, &Keys::of(&[1])).unwrap_err();
        assert_eq!(err.kind(), "DuplicateSignerError");
    }

    #[test]
    fn test_two_of_three() {
        let keys = [pk(1), pk(2), pk(3)];
        let mut tx = tx_from(multisig_address(2, &keys).unwrap(), multisig_code(2, &keys).unwrap());

        sign_transaction(&mut tx, &Keys::of(&[2])).unwrap();
        assert!(!is_complete(&tx).unwrap());
        assert!(convert_to_raw(&tx).is_err());

        sign_transaction(&mut tx, &Keys::of(&[1])).unwrap();
        assert!(is_complete(&tx).unwrap());
        let info = signed_info(&tx).unwrap();
        assert_eq!(info[0]["M"], 2);
        assert_eq!(info[0]["N"], 3);
        assert_eq!(info[0]["Signers"], json!([hex::encode(pk(2)), hex::encode(pk(1))]));

        assert_eq!(
            sign_transaction(&mut tx, &Keys::of(&[2])).unwrap_err().kind(),
            "DuplicateSignerError"
        );
        // A third signature beyond M keeps the transaction complete.
        sign_transaction(&mut tx, &Keys::of(&[3])).unwrap();
        assert!(is_complete(&tx).unwrap());
    }

    #[test]
    fn test_foreign_wallet_cannot_sign() {
        let mut tx = tx_from(standard_address(&pk(1)), standard_code(&pk(1)));
        assert_eq!(sign_transaction(&mut tx, &Keys::of(&[9])).unwrap_err().kind(), "ValidationError");
    }

    #[test]
    fn test_add_external_signature() {
        let keys = [pk(1), pk(2)];
        let mut tx = tx_from(multisig_address(1, &keys).unwrap(), multisig_code(1, &keys).unwrap());
        let sig = CurveKind::Secp256r1.sign_prehash(&[2u8; 32], &tx.digest().unwrap()).unwrap();
        add_signature(&mut tx, &pk(2), &sig).unwrap();
        assert!(is_complete(&tx).unwrap());
        assert!(add_signature(&mut tx, &pk(2), &sig).is_err());
        assert!(add_signature(&mut tx, &pk(5), &sig).is_err());
    }
}

// Main chain transactions: deposits, votes, producers, CR and proposals.
mod util;

use ela_wallet::blockchain::elastos::address;
use ela_wallet::blockchain::elastos::payload::producer::ProducerInfo;
use ela_wallet::blockchain::elastos::Transaction;
use ela_wallet::subwallet::mainchain::ProposalFamily;
use ela_wallet::{MasterWalletManager, SubWallet};
use pretty_assertions::{assert_eq, assert_ne};
use serde_json::{json, Value};
use std::sync::Arc;
use util::{create_small_window_manager, create_test_manager, utxo, MNEMONIC, MNEMONIC_B, PASSWORD};

const DRAFT_HASH: &str = "9c3f6a7b2d1e0f8a4b5c6d7e8f9a0b1c2d3e4f5a6b7c8d9e0f1a2b3c4d5e6f70";

fn main_chain(manager: &MasterWalletManager) -> Arc<dyn SubWallet> {
    manager.create_master_wallet("w", MNEMONIC, "", PASSWORD, false).unwrap();
    manager.create_sub_wallet("w", "ELA").unwrap()
}

fn lock_address() -> String {
    address::cross_chain_address(&[7u8; 32])
}

fn sign(ela: &Arc<dyn SubWallet>, address: &str, digest: &str) -> String {
    ela.sign_digest(address, digest, PASSWORD).unwrap()
}

#[test]
fn test_deposit_versions_produce_different_transactions() {
    let manager = create_test_manager();
    let ela = main_chain(&manager);
    let main = ela.as_mainchain().unwrap();
    let from = ela.get_addresses(0, 1, false).unwrap().remove(0);
    let inputs = utxo(&from, "100000000");
    let target = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";

    let v0 = main
        .create_deposit_transaction(0, &inputs, "ETHSC", "50000000", target, &lock_address(), "10000", "")
        .unwrap();
    let v1 = main
        .create_deposit_transaction(1, &inputs, "ETHSC", "50000000", target, &lock_address(), "10000", "")
        .unwrap();

    assert_eq!(v0["Type"], 0x08);
    assert_eq!(v1["Type"], 0x08);
    assert_ne!(v0["ID"], v1["ID"]);
    assert_ne!(v0["Data"], v1["Data"]);

    let err = main
        .create_deposit_transaction(2, &inputs, "ETHSC", "50000000", target, &lock_address(), "10000", "")
        .unwrap_err();
    assert_eq!(err.kind(), "ValidationError");

    let signed = ela.sign_transaction(&v1, PASSWORD).unwrap();
    assert!(ela.convert_to_raw_transaction(&signed).is_ok());
}

#[test]
fn test_vote_cannot_exceed_inputs() {
    let manager = create_test_manager();
    let ela = main_chain(&manager);
    let from = ela.get_addresses(0, 1, false).unwrap().remove(0);
    let candidate = ela.get_public_keys(0, 1, false).unwrap().remove(0);

    let votes = json!([{"Type": "Delegate", "Candidates": {candidate: "200000000"}}]);
    let err = ela
        .as_mainchain()
        .unwrap()
        .create_vote_transaction(&utxo(&from, "100000000"), &votes, "10000", "")
        .unwrap_err();
    assert_eq!(err.kind(), "InsufficientFundsError");
}

#[test]
fn test_producer_registration_flow() {
    let manager = create_test_manager();
    let ela = main_chain(&manager);
    let main = ela.as_mainchain().unwrap();
    let owner = main.get_owner_public_key().unwrap();

    let payload = main
        .generate_producer_payload(&owner, &owner, "node-1", "https://node.example", "127.0.0.1:20339", 86, PASSWORD)
        .unwrap();
    let info: ProducerInfo = serde_json::from_value(payload.clone()).unwrap();
    assert!(ela.verify_digest(&owner, &info.digest().unwrap(), &info.signature).unwrap());

    let from = ela.get_addresses(0, 1, false).unwrap().remove(0);
    let tx = main
        .create_register_producer_transaction(&utxo(&from, "600000000000"), &payload, "500000000000", "10000", "")
        .unwrap();
    assert_eq!(tx["Type"], 0x09);
    let signed = ela.sign_transaction(&tx, PASSWORD).unwrap();
    ela.convert_to_raw_transaction(&signed).unwrap();

    // Only this wallet's owner key can sign producer payloads.
    let other = MasterWalletManager::new(util::test_config()).unwrap();
    other.create_master_wallet("o", MNEMONIC_B, "", PASSWORD, false).unwrap();
    let other_owner = other.create_sub_wallet("o", "ELA").unwrap().as_mainchain().unwrap().get_owner_public_key().unwrap();
    let err = main.generate_cancel_producer_payload(&other_owner, PASSWORD).unwrap_err();
    assert_eq!(err.kind(), "ValidationError");
}

#[test]
fn test_retrieve_deposit_signs_with_owner_key() {
    let manager = create_test_manager();
    let ela = main_chain(&manager);
    let main = ela.as_mainchain().unwrap();
    let deposit = main.get_owner_deposit_address().unwrap();

    let tx = main
        .create_retrieve_deposit_transaction(&utxo(&deposit, "500000000000"), "499999990000", "10000", "")
        .unwrap();
    assert_eq!(tx["Type"], 0x0c);
    let signed = ela.sign_transaction(&tx, PASSWORD).unwrap();
    let info = ela.get_transaction_signed_info(&signed).unwrap();
    assert_eq!(info[0]["SignType"], "Standard");
    assert_eq!(info[0]["Signers"][0], main.get_owner_public_key().unwrap());
}

#[test]
fn test_cr_registration_payload() {
    let manager = create_test_manager();
    let ela = main_chain(&manager);
    let main = ela.as_mainchain().unwrap();
    let cr_key = main.get_cr_public_key().unwrap();
    let cr_address = ela.get_addresses(0, 1, false).unwrap().remove(0);

    let mut payload = main.generate_cr_info_payload(&cr_key, "council", "https://cr.example", 86).unwrap();
    let digest = payload["Digest"].as_str().unwrap().to_string();
    payload["Signature"] = Value::String(sign(&ela, &cr_address, &digest));

    let tx = main
        .create_register_cr_transaction(&utxo(&cr_address, "600000000000"), &payload, "500000000000", "10000", "")
        .unwrap();
    assert_eq!(tx["Type"], 0x21);
    assert_eq!(tx["Version"], 9);
    assert_eq!(main.get_cr_deposit_address().unwrap().chars().next(), Some('D'));
}

#[test]
fn test_normal_proposal_flow() {
    let manager = create_test_manager();
    let ela = main_chain(&manager);
    let main = ela.as_mainchain().unwrap();
    let id = manager.create_sub_wallet("w", "IDChain").unwrap();
    let did = id.as_idchain().unwrap().get_did(0, 1).unwrap().remove(0);
    let owner = main.get_owner_public_key().unwrap();
    let owner_address = main.get_owner_address().unwrap();
    let recipient = ela.get_addresses(0, 1, false).unwrap().remove(0);

    let mut proposal = json!({
        "Type": 0x0000,
        "CategoryData": "community",
        "OwnerPublicKey": owner,
        "DraftHash": DRAFT_HASH,
        "Budgets": [{"Type": 0, "Stage": 0, "Amount": "100000000"}],
        "Recipient": recipient,
    });
    let owner_digest = main.proposal_owner_digest(ProposalFamily::Normal, &proposal).unwrap();
    proposal["Signature"] = Value::String(sign(&ela, &owner_address, &owner_digest));
    proposal["CRCouncilMemberDID"] = Value::String(did.clone());

    let council_digest = main.proposal_council_member_digest(ProposalFamily::Normal, &proposal).unwrap();
    assert_ne!(owner_digest, council_digest);
    let council_sig = id.as_idchain().unwrap().did_sign_digest(&did, &council_digest, PASSWORD).unwrap();
    proposal["CRCouncilMemberSignature"] = Value::String(council_sig);

    let hash = main.calculate_proposal_hash(&proposal).unwrap();
    assert_eq!(hash.len(), 64);

    let tx = main
        .create_proposal_transaction(ProposalFamily::Normal, &utxo(&recipient, "100000000"), &proposal, "10000", "")
        .unwrap();
    assert_eq!(tx["Type"], 0x25);

    let err = main
        .create_proposal_transaction(ProposalFamily::Terminate, &utxo(&recipient, "100000000"), &proposal, "10000", "")
        .unwrap_err();
    assert_eq!(err.kind(), "ValidationError");
}

#[test]
fn test_oversized_category_data_rejected() {
    let manager = create_test_manager();
    let ela = main_chain(&manager);
    let main = ela.as_mainchain().unwrap();

    let proposal = json!({
        "Type": 0x0000,
        "CategoryData": "x".repeat(4097),
        "OwnerPublicKey": main.get_owner_public_key().unwrap(),
        "DraftHash": DRAFT_HASH,
        "Budgets": [{"Type": 0, "Stage": 0, "Amount": "1"}],
        "Recipient": main.get_owner_address().unwrap(),
    });
    let err = main.proposal_owner_digest(ProposalFamily::Normal, &proposal).unwrap_err();
    assert_eq!(err.kind(), "ValidationError");
}

#[test]
fn test_proposal_withdraw_carries_no_programs() {
    let manager = create_test_manager();
    let ela = main_chain(&manager);
    let main = ela.as_mainchain().unwrap();
    let owner_address = main.get_owner_address().unwrap();
    let recipient = ela.get_addresses(0, 1, false).unwrap().remove(0);
    let expense = address::standard_address(&[
        0x02, 0x1b, 0x84, 0xcc, 0x25, 0x91, 0x54, 0x5d, 0x83, 0x15, 0x28, 0xf3, 0x2a, 0xcc, 0x61, 0x91, 0x0e,
        0x8b, 0x74, 0x7c, 0x42, 0x22, 0xb8, 0x4f, 0xb9, 0x0d, 0x6c, 0x42, 0x44, 0x0b, 0xbb, 0xc5, 0x8f,
    ]);

    let mut withdraw = json!({
        "ProposalHash": DRAFT_HASH,
        "OwnerPublicKey": main.get_owner_public_key().unwrap(),
        "Recipient": recipient,
        "Amount": "50000000",
    });
    let digest = main.proposal_withdraw_digest(&withdraw).unwrap();
    withdraw["Signature"] = Value::String(sign(&ela, &owner_address, &digest));

    let tx = main
        .create_proposal_withdraw_transaction(&utxo(&expense, "100000000"), &withdraw, "10000", "")
        .unwrap();
    assert_eq!(tx["Type"], 0x29);
    assert_eq!(tx["Programs"], json!([]));

    let raw = ela.convert_to_raw_transaction(&tx).unwrap();
    let parsed = Transaction::from_json(&tx).unwrap();
    assert_eq!(raw, hex::encode(parsed.raw().unwrap()));
}

#[test]
fn test_memo_changes_transaction_id() {
    let manager = create_test_manager();
    let ela = main_chain(&manager);
    let from = ela.get_addresses(0, 1, false).unwrap().remove(0);
    let to = ela.get_addresses(1, 1, false).unwrap().remove(0);
    let outputs = json!([{"Address": to, "Amount": "1000"}]);

    let plain = ela.create_transaction(&utxo(&from, "100000000"), &outputs, "10000", "").unwrap();
    let memo = ela.create_transaction(&utxo(&from, "100000000"), &outputs, "10000", "hello").unwrap();
    assert_ne!(plain["ID"], memo["ID"]);
    assert_eq!(plain["Fee"], "10000");
}

#[test]
fn test_addresses_past_lookup_limit_stay_spendable() {
    let manager = create_small_window_manager();
    let ela = main_chain(&manager);
    let digest = "22".repeat(32);

    // Build the signing index while it only covers the lookup limit.
    let first = ela.create_address().unwrap();
    sign(&ela, &first, &digest);

    for _ in 0..6 {
        let address = ela.create_address().unwrap();
        ela.update_used_address(&[address]).unwrap();
    }
    let next = ela.create_address().unwrap();
    assert_eq!(next, ela.get_addresses(6, 1, false).unwrap()[0]);

    let outputs = json!([{"Address": first, "Amount": "1000"}]);
    let tx = ela.create_transaction(&utxo(&next, "100000000"), &outputs, "10000", "").unwrap();
    let signed = ela.sign_transaction(&tx, PASSWORD).unwrap();
    let info = ela.get_transaction_signed_info(&signed).unwrap();
    assert_eq!(info[0]["Signers"][0], ela.get_public_keys(6, 1, false).unwrap()[0]);
    ela.convert_to_raw_transaction(&signed).unwrap();

    let signature = sign(&ela, &next, &digest);
    let public_key = ela.get_public_keys(6, 1, false).unwrap().remove(0);
    assert!(ela.verify_digest(&public_key, &digest, &signature).unwrap());
}

#[test]
fn test_update_used_address_near_lookup_limit() {
    let manager = create_small_window_manager();
    let ela = main_chain(&manager);
    let issued = |ela: &Arc<dyn SubWallet>| ela.get_all_address(0, 100, false).unwrap();

    assert_eq!(issued(&ela)["MaxCount"], 2);
    assert_eq!(issued(&ela)["Addresses"].as_array().unwrap().len(), 2);

    // Addresses the book never issued are ignored, even when they are ours.
    let far = ela.get_addresses(50, 1, false).unwrap().remove(0);
    ela.update_used_address(&["EHLhCEbwViWBPwh1VhpECzYEA7jQHZ4zLv".to_string(), far.clone()]).unwrap();
    assert_eq!(issued(&ela)["MaxCount"], 2);
    assert_eq!(ela.create_address().unwrap(), ela.get_addresses(0, 1, false).unwrap()[0]);
    assert_eq!(
        ela.sign_digest(&far, &"33".repeat(32), PASSWORD).unwrap_err().kind(),
        "ValidationError"
    );

    let second = ela.get_addresses(1, 1, false).unwrap().remove(0);
    ela.update_used_address(&[second]).unwrap();
    assert_eq!(issued(&ela)["MaxCount"], 4);

    let fourth = ela.get_addresses(3, 1, false).unwrap().remove(0);
    ela.update_used_address(&[fourth]).unwrap();
    let page = issued(&ela);
    assert_eq!(page["MaxCount"], 6);
    let addresses: Vec<String> = serde_json::from_value(page["Addresses"].clone()).unwrap();
    assert_eq!(addresses, ela.get_addresses(0, 6, false).unwrap());
    assert_eq!(ela.get_last_addresses(false).unwrap(), ela.get_addresses(4, 2, false).unwrap());

    // The newest issued address lies past the lookup limit and still signs.
    sign(&ela, &addresses[5], &"33".repeat(32));
}

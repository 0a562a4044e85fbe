// tests/util.rs
// Shared helpers for the integration tests.
#![allow(dead_code)]

use ela_wallet::{MasterWalletManager, NetworkType, WalletConfig};
use serde_json::{json, Value};

pub const MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
pub const MNEMONIC_B: &str = "legal winner thank year wave sausage worth useful legal winner thank yellow";
pub const MNEMONIC_C: &str = "letter advice cage absurd amount doctor acoustic avoid letter advice cage above";
pub const PASSWORD: &str = "password123";

/// Test config: MainNet with cheap key stretching.
pub fn test_config() -> WalletConfig {
    let mut config = WalletConfig::for_network(NetworkType::MainNet);
    config.security.pbkdf2_iterations = 1_000;
    config.security.keystore_scrypt_log_n = 4;
    config
}

pub fn create_test_manager() -> MasterWalletManager {
    MasterWalletManager::new(test_config()).expect("test config is valid")
}

/// Manager whose key search covers 4 indexes per branch and whose address
/// books keep a gap of 2.
pub fn create_small_window_manager() -> MasterWalletManager {
    let mut config = test_config();
    config.chains.address_lookup_limit = 4;
    config.chains.gap_limit = 2;
    MasterWalletManager::new(config).expect("test config is valid")
}

/// xPubKeyHDPM of a mnemonic, read through a throwaway standard wallet.
pub fn multisig_xpub(manager: &MasterWalletManager, mnemonic: &str) -> String {
    let id = format!("cosigner-{}", &mnemonic[..12].replace(' ', "-"));
    manager.create_master_wallet(&id, mnemonic, "", PASSWORD, false).expect("cosigner wallet");
    let info = manager.get_pub_key_info(&id).expect("pub key info");
    manager.destroy_wallet(&id).expect("destroy cosigner wallet");
    info["xPubKeyHDPM"].as_str().expect("xPubKeyHDPM").to_string()
}

/// Creates participant wallets "A" and "B" of a 2-of-3 multi-sign wallet
/// over `MNEMONIC`, `MNEMONIC_B` and `MNEMONIC_C`.
pub fn create_two_of_three(manager: &MasterWalletManager) {
    let a = multisig_xpub(manager, MNEMONIC);
    let b = multisig_xpub(manager, MNEMONIC_B);
    let c = multisig_xpub(manager, MNEMONIC_C);
    manager
        .create_multi_sign_master_wallet_with_mnemonic("A", MNEMONIC, "", PASSWORD, &[b, c.clone()], 2, false, None)
        .expect("participant A");
    manager
        .create_multi_sign_master_wallet_with_mnemonic("B", MNEMONIC_B, "", PASSWORD, &[a, c], 2, false, None)
        .expect("participant B");
}

/// One input of `amount` sela at `address`.
pub fn utxo(address: &str, amount: &str) -> Value {
    json!([{
        "TxHash": "a3d0eaa466df74983b5d7c543de6904f4c9418ead5ffd6d25814234a96db37b0",
        "Index": 0,
        "Address": address,
        "Amount": amount,
    }])
}

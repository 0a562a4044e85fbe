// Shared manager access from many tasks.
mod util;

use std::sync::Arc;
use std::time::Duration;
use util::{create_test_manager, utxo, MNEMONIC, PASSWORD};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_returns_one_wallet() {
    let manager = Arc::new(create_test_manager());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::task::spawn_blocking(move || {
                manager.create_master_wallet("shared", MNEMONIC, "", PASSWORD, false).unwrap()
            })
        })
        .collect();

    let mut wallets = Vec::new();
    for handle in handles {
        wallets.push(handle.await.unwrap());
    }
    assert!(wallets.iter().all(|w| Arc::ptr_eq(w, &wallets[0])));
    assert_eq!(manager.get_all_master_wallet_ids().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_signing_on_one_wallet() {
    let manager = Arc::new(create_test_manager());
    manager.create_master_wallet("w", MNEMONIC, "", PASSWORD, false).unwrap();
    let ela = manager.create_sub_wallet("w", "ELA").unwrap();
    let from = ela.get_addresses(0, 1, false).unwrap().remove(0);

    let handles: Vec<_> = (1..=6u64)
        .map(|i| {
            let ela = Arc::clone(&ela);
            let from = from.clone();
            tokio::task::spawn_blocking(move || {
                let outputs = serde_json::json!([{"Address": from.clone(), "Amount": (i * 1000).to_string()}]);
                let tx = ela.create_transaction(&utxo(&from, "100000000"), &outputs, "10000", "").unwrap();
                let signed = ela.sign_transaction(&tx, PASSWORD).unwrap();
                ela.convert_to_raw_transaction(&signed).unwrap()
            })
        })
        .collect();

    let mut raws = Vec::new();
    for handle in handles {
        raws.push(tokio::time::timeout(Duration::from_secs(60), handle).await.unwrap().unwrap());
    }
    raws.sort();
    raws.dedup();
    assert_eq!(raws.len(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_destroy_while_reading() {
    let manager = Arc::new(create_test_manager());
    manager.create_master_wallet("w", MNEMONIC, "", PASSWORD, false).unwrap();
    let ela = manager.create_sub_wallet("w", "ELA").unwrap();

    let reader = {
        let ela = Arc::clone(&ela);
        tokio::task::spawn_blocking(move || {
            (0..50).map(|i| ela.get_addresses(i, 1, false).is_ok()).filter(|ok| !ok).count()
        })
    };
    manager.destroy_wallet("w").unwrap();
    reader.await.unwrap();

    assert_eq!(ela.get_addresses(0, 1, false).unwrap_err().kind(), "NotFoundError");
    assert_eq!(manager.get_master_wallet("w").unwrap_err().kind(), "NotFoundError");
}

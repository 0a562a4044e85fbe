pub mod bip44;
pub mod chain;
pub mod config;
pub mod derivation;
pub mod errors;
pub mod key_ring;
pub mod master_wallet;
pub mod wallet_info;
pub mod wallet_manager;

pub use errors::WalletError;
pub use master_wallet::MasterWallet;
pub use wallet_info::{WalletInfo, WalletKind};
pub use wallet_manager::MasterWalletManager;

// src/lib.rs
//! Multi-chain wallet engine for the Elastos main chain, the ID chain, the
//! EVM side chains and Bitcoin.
//!
//! [`MasterWalletManager`] is the entry point. It holds master wallets by ID;
//! each master wallet seals its root key material in a
//! [`KeyVault`](security::KeyVault) and hands out per-chain
//! [`SubWallet`](subwallet::SubWallet) façades that build, sign and
//! serialize transactions offline.

pub mod blockchain;
pub mod core;
pub mod crypto;
pub mod security;
pub mod subwallet;

pub use crate::core::chain::{ChainFamily, ChainId, NetworkType};
pub use crate::core::config::WalletConfig;
pub use crate::core::errors::{Result, WalletError};
pub use crate::core::master_wallet::MasterWallet;
pub use crate::core::wallet_manager::MasterWalletManager;
pub use crate::subwallet::SubWallet;

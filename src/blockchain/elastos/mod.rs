//! Elastos main chain and ID chain
//!
//! - `address` - program hashes, redeem scripts and address strings
//! - `codec` - little-endian wire primitives
//! - `payload` - transaction payloads and governance digests
//! - `transaction` / `builder` - unsigned transactions and their JSON form
//! - `signing` - program signatures and multi-sign progress
//! - `utxo` - caller supplied inputs and outputs

pub mod address;
pub mod builder;
pub mod codec;
pub mod payload;
pub mod signing;
pub mod transaction;
pub mod utxo;

pub use builder::TxBuilder;
pub use signing::KeyProvider;
pub use transaction::Transaction;

//! Bitcoin-compatible chain: P2WPKH receiving addresses, legacy P2PKH
//! addresses of the same keys, and offline transaction signing.

pub mod address;
pub mod transaction;

pub use address::AddressType;
pub use transaction::{BtcInput, BtcOutput, BtcTransaction};

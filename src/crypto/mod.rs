pub mod base58;
pub mod encryption;
pub mod hash;
pub mod kdf;
pub mod multisig;
pub mod signature_utils;

pub use self::kdf::KeyDerivation;
pub use self::multisig::{SignatureSet, ThresholdPolicy};
pub use self::signature_utils::CurveKind;

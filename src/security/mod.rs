//! Secret handling: zeroizing buffers, password policy and the sealed key
//! vault.

pub mod password_validator;
pub mod secret;
pub mod vault;

pub use secret::{SecretString, SecretVec};
pub use vault::{KeyVault, RootMaterial};

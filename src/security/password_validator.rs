//! Password length policy
//!
//! Pay and backup passwords must be 8 to 128 bytes. A BIP39 pass phrase is
//! optional, but when present follows the same bounds.

use crate::core::errors::{Result, WalletError};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Length policy for one kind of password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_empty: bool,
    label: &'static str,
}

impl PasswordPolicy {
    /// Policy for pay passwords, which seal the vault.
    pub fn pay() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            max_length: MAX_PASSWORD_LENGTH,
            allow_empty: false,
            label: "pay password",
        }
    }

    /// Policy for keystore backup passwords.
    pub fn backup() -> Self {
        Self { label: "backup password", ..Self::pay() }
    }

    /// Policy for BIP39 pass phrases. Empty means no pass phrase.
    pub fn passphrase() -> Self {
        Self { allow_empty: true, label: "pass phrase", ..Self::pay() }
    }
}

/// Checks a password against `policy`.
///
/// Lengths are measured in bytes of the UTF-8 encoding.
pub fn validate_password(password: &str, policy: &PasswordPolicy) -> Result<()> {
    if password.is_empty() && policy.allow_empty {
        return Ok(());
    }
    if password.len() < policy.min_length {
        return Err(WalletError::validation(format!(
            "{} must be at least {} characters",
            policy.label, policy.min_length
        )));
    }
    if password.len() > policy.max_length {
        return Err(WalletError::validation(format!(
            "{} must be at most {} characters",
            policy.label, policy.max_length
        )));
    }
    Ok(())
}

pub fn validate_pay_password(password: &str) -> Result<()> {
    validate_password(password, &PasswordPolicy::pay())
}

pub fn validate_backup_password(password: &str) -> Result<()> {
    validate_password(password, &PasswordPolicy::backup())
}

pub fn validate_passphrase(passphrase: &str) -> Result<()> {
    validate_password(passphrase, &PasswordPolicy::passphrase())
}

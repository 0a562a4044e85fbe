//! Pay password and passphrase operations.

use super::MasterWalletManager;
use crate::core::errors::Result;

impl MasterWalletManager {
    /// Re-seals every secret under `new`. On failure the old password stays
    /// valid.
    pub fn change_password(&self, id: &str, old: &str, new: &str) -> Result<()> {
        self.wallet(id)?.change_password(old, new)
    }

    /// Sets a new pay password after proving ownership with the mnemonic and
    /// passphrase the wallet was created from.
    pub fn reset_password(&self, id: &str, mnemonic: &str, passphrase: &str, new: &str) -> Result<()> {
        self.wallet(id)?.reset_password(mnemonic, passphrase, new)
    }

    pub fn verify_pay_password(&self, id: &str, pay_password: &str) -> Result<()> {
        self.wallet(id)?.verify_pay_password(pay_password)
    }

    pub fn verify_pass_phrase(&self, id: &str, passphrase: &str, pay_password: &str) -> Result<()> {
        self.wallet(id)?.verify_passphrase(passphrase, pay_password)
    }
}

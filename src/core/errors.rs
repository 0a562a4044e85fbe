use thiserror::Error;

/// Error type shared by every wallet component.
///
/// The first seven variants are the kinds surfaced to callers at the
/// boundary; the remaining ones wrap failures of the underlying primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Malformed or out-of-range input.
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Wrong pay, backup or pass phrase password.
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
    /// Unknown master wallet or sub wallet.
    #[error("Not found: {0}")]
    NotFoundError(String),
    /// Operation not supported by this wallet or chain family.
    #[error("Capability error: {0}")]
    CapabilityError(String),
    /// The signer already contributed a signature for this digest.
    #[error("Duplicate signer: {0}")]
    DuplicateSignerError(String),
    /// Inputs cannot cover amount plus fee.
    #[error("Insufficient funds: {0}")]
    InsufficientFundsError(String),
    /// Transaction is below its signature threshold.
    #[error("Incomplete signature: {0}")]
    IncompleteSignatureError(String),
    /// Key, signature or cipher failure.
    #[error("Crypto error: {0}")]
    CryptoError(String),
    /// Encoding or decoding failure.
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl WalletError {
    /// Stable name of the error kind, as reported across the bridge.
    pub fn kind(&self) -> &'static str {
        match self {
            WalletError::ValidationError(_) => "ValidationError",
            WalletError::AuthenticationError(_) => "AuthenticationError",
            WalletError::NotFoundError(_) => "NotFoundError",
            WalletError::CapabilityError(_) => "CapabilityError",
            WalletError::DuplicateSignerError(_) => "DuplicateSignerError",
            WalletError::InsufficientFundsError(_) => "InsufficientFundsError",
            WalletError::IncompleteSignatureError(_) => "IncompleteSignatureError",
            WalletError::CryptoError(_) => "CryptoError",
            WalletError::SerializationError(_) => "SerializationError",
            WalletError::ConfigError(_) => "ConfigError",
            WalletError::InternalError(_) => "InternalError",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn capability(message: impl Into<String>) -> Self {
        Self::CapabilityError(message.into())
    }

    pub fn crypto(message: impl Into<String>) -> Self {
        Self::CryptoError(message.into())
    }

    /// Structured form handed to the host application.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "Kind": self.kind(),
            "Message": self.to_string(),
        })
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::SerializationError(err.to_string())
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(err: hex::FromHexError) -> Self {
        WalletError::ValidationError(format!("invalid hex: {}", err))
    }
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        WalletError::InternalError(err.to_string())
    }
}

impl From<toml::de::Error> for WalletError {
    fn from(err: toml::de::Error) -> Self {
        WalletError::ConfigError(err.to_string())
    }
}

impl From<anyhow::Error> for WalletError {
    fn from(err: anyhow::Error) -> Self {
        WalletError::InternalError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_are_stable() {
        assert_eq!(WalletError::validation("x").kind(), "ValidationError");
        assert_eq!(
            WalletError::DuplicateSignerError("x".into()).kind(),
            "DuplicateSignerError"
        );
        assert_eq!(WalletError::capability("x").kind(), "CapabilityError");
    }

    #[test]
    fn test_json_error_converts_to_serialization() {
        let err: WalletError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.kind(), "SerializationError");
    }

    #[test]
    fn test_to_json_carries_kind_and_message() {
        let v = WalletError::AuthenticationError("wrong password".into()).to_json();
        assert_eq!(v["Kind"], "AuthenticationError");
        assert!(v["Message"].as_str().unwrap().contains("wrong password"));
    }
}

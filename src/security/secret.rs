//! Aliases for buffers that must be zeroized on drop.
use zeroize::Zeroizing;

/// Secret byte buffer, zeroed when dropped.
pub type SecretVec = Zeroizing<Vec<u8>>;

/// Secret string (mnemonics, serialized extended private keys).
pub type SecretString = Zeroizing<String>;

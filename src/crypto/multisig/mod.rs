//! Multi-signature coordination
//!
//! - `policy` - M-of-N thresholds
//! - `signing` - append-only signature collection per digest

pub mod policy;
pub mod signing;

pub use policy::ThresholdPolicy;
pub use signing::{Contribution, SignatureSet, SigningState};

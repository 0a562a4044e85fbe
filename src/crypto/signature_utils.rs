//! Curve primitives used by key derivation and signing.
//!
//! The Elastos chains sign with ECDSA over secp256r1; the EVM and Bitcoin
//! chains use secp256k1. Both expose the same set of operations on raw
//! byte encodings so callers can stay curve-agnostic.

use crate::core::errors::{Result, WalletError};
use zeroize::Zeroizing;

/// Elliptic curve a key lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveKind {
    Secp256r1,
    Secp256k1,
}

macro_rules! curve_ops {
    ($module:ident, $krate:ident) => {
        mod $module {
            use super::*;
            use $krate::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
            use $krate::ecdsa::{Signature, SigningKey, VerifyingKey};
            use $krate::elliptic_curve::group::{Curve as _, Group as _};
            use $krate::elliptic_curve::sec1::ToEncodedPoint;
            use $krate::elliptic_curve::PrimeField;
            use $krate::{FieldBytes, ProjectivePoint, PublicKey, Scalar, SecretKey};

            fn secret_key(secret: &[u8]) -> Result<SecretKey> {
                if secret.len() != 32 {
                    return Err(WalletError::crypto("private key must be 32 bytes"));
                }
                SecretKey::from_slice(secret).map_err(|_| WalletError::crypto("invalid private key"))
            }

            fn compress(pk: &PublicKey) -> Result<[u8; 33]> {
                pk.to_encoded_point(true)
                    .as_bytes()
                    .try_into()
                    .map_err(|_| WalletError::crypto("unexpected point encoding"))
            }

            fn parse_scalar(bytes: &[u8; 32]) -> Result<Scalar> {
                Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(bytes)))
                    .ok_or_else(|| WalletError::crypto("tweak exceeds curve order"))
            }

            pub fn validate_secret(secret: &[u8]) -> Result<()> {
                secret_key(secret).map(|_| ())
            }

            pub fn public_key(secret: &[u8]) -> Result<[u8; 33]> {
                compress(&secret_key(secret)?.public_key())
            }

            pub fn normalize_public(public: &[u8]) -> Result<[u8; 33]> {
                let pk = PublicKey::from_sec1_bytes(public)
                    .map_err(|_| WalletError::validation("invalid public key"))?;
                compress(&pk)
            }

            pub fn uncompressed_public(public: &[u8]) -> Result<Vec<u8>> {
                let pk = PublicKey::from_sec1_bytes(public)
                    .map_err(|_| WalletError::validation("invalid public key"))?;
                Ok(pk.to_encoded_point(false).as_bytes().to_vec())
            }

            pub fn tweak_add_secret(secret: &[u8], tweak: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>> {
                let sk = secret_key(secret)?;
                let child: Scalar = *sk.to_nonzero_scalar() + parse_scalar(tweak)?;
                let child = SecretKey::from_bytes(&child.to_repr())
                    .map_err(|_| WalletError::crypto("derived key is zero"))?;
                let mut out = Zeroizing::new([0u8; 32]);
                out.copy_from_slice(&child.to_bytes());
                Ok(out)
            }

            pub fn tweak_add_public(public: &[u8], tweak: &[u8; 32]) -> Result<[u8; 33]> {
                let pk = PublicKey::from_sec1_bytes(public)
                    .map_err(|_| WalletError::crypto("invalid parent public key"))?;
                let point = pk.to_projective() + ProjectivePoint::generator() * parse_scalar(tweak)?;
                let child = PublicKey::from_affine(point.to_affine())
                    .map_err(|_| WalletError::crypto("derived point at infinity"))?;
                compress(&child)
            }

            pub fn sign_prehash(secret: &[u8], digest: &[u8; 32]) -> Result<[u8; 64]> {
                let key = SigningKey::from_slice(secret)
                    .map_err(|_| WalletError::crypto("invalid signing key"))?;
                let signature: Signature = key
                    .sign_prehash(digest)
                    .map_err(|e| WalletError::crypto(format!("signing failed: {}", e)))?;
                let mut out = [0u8; 64];
                out.copy_from_slice(&signature.to_bytes());
                Ok(out)
            }

            pub fn verify_prehash(public: &[u8], digest: &[u8], signature: &[u8]) -> bool {
                let Ok(key) = VerifyingKey::from_sec1_bytes(public) else {
                    return false;
                };
                let Ok(signature) = Signature::from_slice(signature) else {
                    return false;
                };
                key.verify_prehash(digest, &signature).is_ok()
            }
        }
    };
}

curve_ops!(r1, p256);
curve_ops!(k1, k256);

impl CurveKind {
    pub fn validate_secret(self, secret: &[u8]) -> Result<()> {
        match self {
            CurveKind::Secp256r1 => r1::validate_secret(secret),
            CurveKind::Secp256k1 => k1::validate_secret(secret),
        }
    }

    /// Compressed SEC1 public key of a 32-byte secret.
    pub fn public_key(self, secret: &[u8]) -> Result<[u8; 33]> {
        match self {
            CurveKind::Secp256r1 => r1::public_key(secret),
            CurveKind::Secp256k1 => k1::public_key(secret),
        }
    }

    /// Parses any SEC1 encoding and returns the compressed form.
    pub fn normalize_public(self, public: &[u8]) -> Result<[u8; 33]> {
        match self {
            CurveKind::Secp256r1 => r1::normalize_public(public),
            CurveKind::Secp256k1 => k1::normalize_public(public),
        }
    }

    pub fn uncompressed_public(self, public: &[u8]) -> Result<Vec<u8>> {
        match self {
            CurveKind::Secp256r1 => r1::uncompressed_public(public),
            CurveKind::Secp256k1 => k1::uncompressed_public(public),
        }
    }

    /// `(secret + tweak) mod n`
    pub fn tweak_add_secret(self, secret: &[u8], tweak: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>> {
        match self {
            CurveKind::Secp256r1 => r1::tweak_add_secret(secret, tweak),
            CurveKind::Secp256k1 => k1::tweak_add_secret(secret, tweak),
        }
    }

    /// `public + tweak·G`
    pub fn tweak_add_public(self, public: &[u8], tweak: &[u8; 32]) -> Result<[u8; 33]> {
        match self {
            CurveKind::Secp256r1 => r1::tweak_add_public(public, tweak),
            CurveKind::Secp256k1 => k1::tweak_add_public(public, tweak),
        }
    }

    /// Deterministic (RFC6979) ECDSA over an already hashed message,
    /// returned as 64-byte `r || s`.
    pub fn sign_prehash(self, secret: &[u8], digest: &[u8; 32]) -> Result<[u8; 64]> {
        match self {
            CurveKind::Secp256r1 => r1::sign_prehash(secret, digest),
            CurveKind::Secp256k1 => k1::sign_prehash(secret, digest),
        }
    }

    /// Never fails; malformed keys or signatures simply do not verify.
    pub fn verify_prehash(self, public: &[u8], digest: &[u8], signature: &[u8]) -> bool {
        match self {
            CurveKind::Secp256r1 => r1::verify_prehash(public, digest, signature),
            CurveKind::Secp256k1 => k1::verify_prehash(public, digest, signature),
        }
    }
}

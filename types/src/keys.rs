//! Key material for wallet identity and signing.
//!
//! Keys and signatures travel as lowercase hex strings (SHA3-512 digests,
//! 128 characters each).

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::Address;

/// Length in hex characters of public keys, private keys and signatures.
pub const KEY_HEX_LEN: usize = 128;

/// A hex-encoded public key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(String);

impl PublicKey {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_valid_shape(&self) -> bool {
        is_key_shaped(&self.0)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A hex-encoded private key.
///
/// Does not implement `Debug` or `Clone` so it is not copied or logged by
/// accident. The backing string is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Raw hex form. Only hand this to signing and key export.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

/// A hex-encoded signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_valid_shape(&self) -> bool {
        is_key_shaped(&self.0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A wallet: private key, public key and the address derived from it.
///
/// Built by `qnode_crypto::generate_keypair()` or `qnode_crypto::keypair_from_private()`.
pub struct KeyPair {
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
    pub address: Address,
}

fn is_key_shaped(s: &str) -> bool {
    s.len() == KEY_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_shape_requires_128_hex_chars() {
        assert!(Signature::new("a".repeat(128)).has_valid_shape());
        assert!(!Signature::new("a".repeat(127)).has_valid_shape());
        assert!(!Signature::new("z".repeat(128)).has_valid_shape());
    }

    #[test]
    fn public_key_roundtrips_as_string() {
        let pk = PublicKey::new("ab".repeat(64));
        let json = serde_json::to_string(&pk).unwrap();
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(pk, back);
    }
}

//! Key generation.
//!
//! A private key is the SHA3-512 of 32 bytes of entropy; the public key is
//! the SHA3-512 of the private key's hex form.

use qnode_types::keys::KEY_HEX_LEN;
use qnode_types::{KeyPair, PrivateKey, PublicKey};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::{derive_address, sha3_512_hex, CryptoError};

/// Generate a new key pair from the OS random source.
pub fn generate_keypair() -> KeyPair {
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    keypair_from_seed(&seed)
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let private_key = PrivateKey::new(sha3_512_hex(hex::encode(seed)));
    let public_key = public_from_private(&private_key);
    let address = derive_address(&public_key);
    KeyPair {
        private_key,
        public_key,
        address,
    }
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    PublicKey::new(sha3_512_hex(private.expose()))
}

/// Reconstruct a full key pair from a hex private key.
pub fn keypair_from_private(private_key: PrivateKey) -> Result<KeyPair, CryptoError> {
    let raw = private_key.expose();
    if raw.len() != KEY_HEX_LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CryptoError::MalformedPrivateKey {
            expected: KEY_HEX_LEN,
        });
    }
    let public_key = public_from_private(&private_key);
    let address = derive_address(&public_key);
    Ok(KeyPair {
        private_key,
        public_key,
        address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_well_formed_keys() {
        let kp = generate_keypair();
        assert_eq!(kp.private_key.expose().len(), 128);
        assert!(kp.public_key.has_valid_shape());
        assert!(kp.address.is_wallet_shaped());
    }

    #[test]
    fn public_from_private_is_deterministic() {
        let kp = generate_keypair();
        assert_eq!(public_from_private(&kp.private_key), kp.public_key);
    }

    #[test]
    fn keypair_from_private_roundtrip() {
        let kp = keypair_from_seed(&[7u8; 32]);
        let rebuilt = keypair_from_private(PrivateKey::new(kp.private_key.expose())).unwrap();
        assert_eq!(rebuilt.public_key, kp.public_key);
        assert_eq!(rebuilt.address, kp.address);
    }

    #[test]
    fn malformed_private_key_rejected() {
        assert!(keypair_from_private(PrivateKey::new("abc")).is_err());
        assert!(keypair_from_private(PrivateKey::new("x".repeat(128))).is_err());
    }

    #[test]
    fn different_seeds_different_keys() {
        let a = keypair_from_seed(&[1u8; 32]);
        let b = keypair_from_seed(&[2u8; 32]);
        assert_ne!(a.public_key, b.public_key);
        assert_ne!(a.address, b.address);
    }
}

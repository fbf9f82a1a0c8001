//! Message signing.
//!
//! A signature is `SHA3-512(message + ":" + private_key)`. Verification
//! only checks that the signature and public key are each 128 hex
//! characters; it does not bind the signature to the message or key, so
//! any well-formed string passes. Authenticity is enforced solely by the
//! node that admits a transaction, at submission time.

use qnode_types::{PrivateKey, PublicKey, Signature};

use crate::sha3_512_hex;

/// Sign `message` with `private_key`. Deterministic.
pub fn sign_message(message: &str, private_key: &PrivateKey) -> Signature {
    let mut preimage = String::with_capacity(message.len() + 1 + private_key.expose().len());
    preimage.push_str(message);
    preimage.push(':');
    preimage.push_str(private_key.expose());
    Signature::new(sha3_512_hex(preimage))
}

/// Shape check of a signature and public key. The message is not consulted.
pub fn verify_signature(_message: &str, signature: &Signature, public_key: &PublicKey) -> bool {
    signature.has_valid_shape() && public_key.has_valid_shape()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn sign_and_verify() {
        let kp = generate_keypair();
        let sig = sign_message("hello", &kp.private_key);
        assert!(verify_signature("hello", &sig, &kp.public_key));
    }

    #[test]
    fn signing_is_deterministic_and_message_dependent() {
        let kp = keypair_from_seed(&[3u8; 32]);
        assert_eq!(
            sign_message("m", &kp.private_key),
            sign_message("m", &kp.private_key)
        );
        assert_ne!(
            sign_message("m", &kp.private_key),
            sign_message("n", &kp.private_key)
        );
    }

    #[test]
    fn verification_ignores_message_and_key_binding() {
        let kp = generate_keypair();
        let other = generate_keypair();
        let sig = sign_message("original", &kp.private_key);
        assert!(verify_signature("tampered", &sig, &other.public_key));
        assert!(verify_signature(
            "anything",
            &Signature::new("0".repeat(128)),
            &kp.public_key
        ));
    }

    #[test]
    fn malformed_shapes_fail() {
        let kp = generate_keypair();
        assert!(!verify_signature(
            "m",
            &Signature::new("ab".repeat(63)),
            &kp.public_key
        ));
        assert!(!verify_signature(
            "m",
            &Signature::new("g".repeat(128)),
            &kp.public_key
        ));
        assert!(!verify_signature(
            "m",
            &sign_message("m", &kp.private_key),
            &PublicKey::new("short")
        ));
    }
}

//! Cryptographic primitives for qnode.
//!
//! - **SHA3-256** for transaction, block and address hashing
//! - **SHA3-512** for key derivation and signatures
//! - Address derivation with `Q` prefix and a 6-hex-char checksum
//!
//! Signatures are a keyed hash, not an asymmetric scheme: [`verify_signature`]
//! checks shape only. See the crate's `sign` module.

pub mod address;
pub mod error;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::{derive_address, parse_address, validate_address};
pub use error::CryptoError;
pub use hash::{sha3_256_hex, sha3_512_hex};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};

//! Fundamental types for the qnode ledger.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! addresses, hashes, amounts, timestamps, key material, and protocol parameters.

pub mod address;
pub mod amount;
pub mod error;
pub mod hash;
pub mod keys;
pub mod params;
pub mod time;

pub use address::Address;
pub use amount::{canonical_float, Amount};
pub use error::TypesError;
pub use hash::{BlockHash, TxHash};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use params::{ProtocolParams, CANONICAL_TREASURY};
pub use time::{Clock, SystemClock, Timestamp};

//! Account address type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An account identifier on the ledger.
///
/// Wallet addresses are derived from a public key as
/// `"Q" + 40 hex chars + 6 hex checksum chars` (see `qnode_crypto::derive_address`).
/// The ledger itself accepts any string here: the minting authority
/// [`Address::SYSTEM`] and the genesis sink [`Address::GENESIS`] are
/// not derived from keys.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Prefix of every key-derived wallet address.
    pub const PREFIX: &'static str = "Q";

    /// Number of hex characters taken from the public-key digest.
    pub const BODY_LEN: usize = 40;

    /// Number of hex characters in the trailing checksum.
    pub const CHECKSUM_LEN: usize = 6;

    /// Total length of a wallet address.
    pub const LEN: usize = 1 + Self::BODY_LEN + Self::CHECKSUM_LEN;

    /// Literal sender of minting and genesis transactions.
    pub const SYSTEM: &'static str = "SYSTEM";

    /// Recipient of the genesis transaction.
    pub const GENESIS: &'static str = "GENESIS";

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn system() -> Self {
        Self(Self::SYSTEM.to_string())
    }

    pub fn genesis() -> Self {
        Self(Self::GENESIS.to_string())
    }

    /// Whether this is the minting authority, which bypasses signature,
    /// nonce, quota and balance rules.
    pub fn is_system(&self) -> bool {
        self.0 == Self::SYSTEM
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shape check for a key-derived address. Does not verify the checksum.
    pub fn is_wallet_shaped(&self) -> bool {
        self.0.len() == Self::LEN
            && self.0.starts_with(Self::PREFIX)
            && self.0[1..].bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

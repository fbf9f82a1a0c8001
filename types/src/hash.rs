//! Content hashes for transactions and blocks.
//!
//! Both are lowercase hex strings of a SHA3-256 digest. They are kept as
//! strings because the genesis block's parent is the literal `"0"`, and
//! because the hex form is what peers exchange on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Content hash identifying a transaction (dedup, replay history, pool membership).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 16 characters, used in rejection messages and logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(16)]
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.short())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content hash of a block.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(String);

impl BlockHash {
    /// Parent hash recorded in the genesis block.
    pub const GENESIS_PARENT: &'static str = "0";

    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn genesis_parent() -> Self {
        Self(Self::GENESIS_PARENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(16)]
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.short())
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_truncates_long_hashes() {
        let h = TxHash::new("0123456789abcdef0123456789abcdef");
        assert_eq!(h.short(), "0123456789abcdef");
        assert_eq!(TxHash::new("abc").short(), "abc");
    }

    #[test]
    fn genesis_parent_is_literal_zero() {
        assert_eq!(BlockHash::genesis_parent().as_str(), "0");
    }
}

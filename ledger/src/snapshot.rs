//! Full-ledger snapshot: the sync payload and the persisted format.
//!
//! Fields that older or partial documents may omit are default-filled.

use qnode_types::{Address, Amount, ProtocolParams, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::block::Block;
use crate::transaction::Transaction;
use crate::validators::ValidatorSet;

fn default_min_stake() -> Amount {
    ProtocolParams::default().min_stake
}

fn default_block_reward() -> Amount {
    ProtocolParams::default().block_reward
}

fn default_inactivity_threshold() -> u64 {
    ProtocolParams::default().inactivity_threshold_secs
}

/// Chain, mempool, validators, balances, activity and consensus constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub chain: Vec<Block>,
    #[serde(default)]
    pub pending_transactions: Vec<Transaction>,
    #[serde(default)]
    pub validators: ValidatorSet,
    #[serde(default)]
    pub balances: BTreeMap<Address, Amount>,
    #[serde(default)]
    pub last_activity: BTreeMap<Address, Timestamp>,
    #[serde(default = "default_min_stake")]
    pub min_stake: Amount,
    #[serde(default = "default_block_reward")]
    pub block_reward: Amount,
    #[serde(default)]
    pub transaction_fees_pool: Amount,
    #[serde(default)]
    pub treasury_address: Option<Address>,
    /// Seconds of inactivity before an account reads as inactive.
    #[serde(default = "default_inactivity_threshold")]
    pub inactivity_threshold: u64,
}

impl LedgerSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Read a snapshot written by [`LedgerSnapshot::save`].
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Write atomically: a temp file beside `path`, then rename over it.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_fields_are_default_filled() {
        let genesis = serde_json::to_value(Block::genesis()).unwrap();
        let doc = serde_json::json!({ "chain": [genesis] });
        let snap: LedgerSnapshot = serde_json::from_value(doc).unwrap();
        assert_eq!(snap.len(), 1);
        assert!(snap.pending_transactions.is_empty());
        assert!(snap.last_activity.is_empty());
        assert!(snap.treasury_address.is_none());
        assert_eq!(snap.min_stake, Amount::new(100.0));
        assert_eq!(snap.block_reward, Amount::new(10.0));
        assert_eq!(snap.inactivity_threshold, 2_592_000);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let snap = crate::Ledger::new(ProtocolParams::default(), Some(Address::new("Qt"))).snapshot();
        snap.save(&path).unwrap();
        let loaded = LedgerSnapshot::load(&path).unwrap();
        assert_eq!(loaded, snap);
        assert!(!path.with_extension("json.tmp").exists());
    }
}

//! Protocol parameters shared by every node.
//!
//! Loaded from the `[ledger]` table of the node config; any field left out
//! falls back to the network default.

use serde::{Deserialize, Serialize};

use crate::Amount;

/// Treasury address the public network expects. Nodes configured with a
/// different treasury run on their own and log a warning at startup.
pub const CANONICAL_TREASURY: &str = "Qbd7901a83d578aabe02710c57540c19242a3941d178bed";

/// Consensus and admission parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolParams {
    // ── Staking ──────────────────────────────────────────────────────────
    /// Minimum amount a validator must lock to register.
    #[serde(default = "default_min_stake")]
    pub min_stake: Amount,

    /// Amount minted to the proposer of every block (plus collected fees).
    #[serde(default = "default_block_reward")]
    pub block_reward: Amount,

    // ── Mempool ──────────────────────────────────────────────────────────
    /// Maximum pending transactions per sender.
    #[serde(default = "default_max_pending_per_address")]
    pub max_pending_per_address: usize,

    /// Maximum transactions drawn from the mempool into one block.
    #[serde(default = "default_max_block_size")]
    pub max_block_size: usize,

    /// Transactions older than this (seconds) are rejected as expired.
    #[serde(default = "default_tx_max_age_secs")]
    pub tx_max_age_secs: u64,

    // ── Accounts ─────────────────────────────────────────────────────────
    /// Seconds without activity after which an account reads as inactive.
    #[serde(default = "default_inactivity_threshold_secs")]
    pub inactivity_threshold_secs: u64,

    /// Maximum drift tolerated when auditing balances against history.
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance: f64,

    /// Fee applied to transfers when the client does not specify one.
    #[serde(default = "default_fee")]
    pub default_fee: Amount,
}

fn default_min_stake() -> Amount {
    Amount::new(100.0)
}

fn default_block_reward() -> Amount {
    Amount::new(10.0)
}

fn default_max_pending_per_address() -> usize {
    10
}

fn default_max_block_size() -> usize {
    100
}

fn default_tx_max_age_secs() -> u64 {
    3600
}

fn default_inactivity_threshold_secs() -> u64 {
    30 * 24 * 3600 // 30 days
}

fn default_balance_tolerance() -> f64 {
    1e-4
}

fn default_fee() -> Amount {
    Amount::new(0.01)
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            min_stake: default_min_stake(),
            block_reward: default_block_reward(),
            max_pending_per_address: default_max_pending_per_address(),
            max_block_size: default_max_block_size(),
            tx_max_age_secs: default_tx_max_age_secs(),
            inactivity_threshold_secs: default_inactivity_threshold_secs(),
            balance_tolerance: default_balance_tolerance(),
            default_fee: default_fee(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_network_values() {
        let p = ProtocolParams::default();
        assert_eq!(p.min_stake, Amount::new(100.0));
        assert_eq!(p.block_reward, Amount::new(10.0));
        assert_eq!(p.max_pending_per_address, 10);
        assert_eq!(p.max_block_size, 100);
        assert_eq!(p.tx_max_age_secs, 3600);
        assert_eq!(p.inactivity_threshold_secs, 2_592_000);
        assert_eq!(p.default_fee, Amount::new(0.01));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let p: ProtocolParams = serde_json::from_str(r#"{"min_stake": 50.0}"#).unwrap();
        assert_eq!(p.min_stake, Amount::new(50.0));
        assert_eq!(p.block_reward, Amount::new(10.0));
    }

    #[test]
    fn canonical_treasury_is_wallet_shaped() {
        assert!(crate::Address::new(CANONICAL_TREASURY).is_wallet_shaped());
    }
}

//! Blocks and the genesis block.

use qnode_crypto::sha3_256_hex;
use qnode_types::{Address, Amount, BlockHash, Timestamp, TxHash};
use serde::{Deserialize, Serialize};

use crate::canonical::to_canonical_json;
use crate::transaction::{Transaction, TxType};

/// Fixed genesis timestamp (2024-01-01T00:00:00Z) so every node derives
/// the same genesis hash.
pub const GENESIS_TIMESTAMP: f64 = 1_704_067_200.0;

/// An ordered batch of transactions linked to its predecessor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: Timestamp,
    pub transactions: Vec<Transaction>,
    pub previous_hash: BlockHash,
    pub validator: Address,
    pub stake: Amount,
    pub hash: BlockHash,
}

/// Hash preimage: every field except `hash`.
#[derive(Serialize)]
struct BlockContent<'a> {
    index: u64,
    timestamp: Timestamp,
    transactions: &'a [Transaction],
    previous_hash: &'a BlockHash,
    validator: &'a Address,
    stake: Amount,
}

impl Block {
    /// Assemble a block and seal it with its content hash.
    pub fn new(
        index: u64,
        timestamp: Timestamp,
        transactions: Vec<Transaction>,
        previous_hash: BlockHash,
        validator: Address,
        stake: Amount,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            validator,
            stake,
            hash: BlockHash::new(String::new()),
        };
        block.hash = block.compute_hash();
        block
    }

    /// The genesis block: index 0, parent `"0"`, proposer SYSTEM with stake
    /// 0, and a single zero-amount SYSTEM transaction to GENESIS.
    pub fn genesis() -> Self {
        let timestamp = Timestamp::new(GENESIS_TIMESTAMP);
        let tx = Transaction::system(Address::genesis(), Amount::ZERO, TxType::Transfer, timestamp);
        Self::new(
            0,
            timestamp,
            vec![tx],
            BlockHash::genesis_parent(),
            Address::system(),
            Amount::ZERO,
        )
    }

    /// SHA3-256 of the canonical JSON of every field except `hash`.
    pub fn compute_hash(&self) -> BlockHash {
        let content = BlockContent {
            index: self.index,
            timestamp: self.timestamp,
            transactions: &self.transactions,
            previous_hash: &self.previous_hash,
            validator: &self.validator,
            stake: self.stake,
        };
        // Every field is a string, number or null, so encoding cannot fail.
        let json = to_canonical_json(&content).unwrap_or_default();
        BlockHash::new(sha3_256_hex(json))
    }

    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    pub fn is_genesis_shaped(&self) -> bool {
        self.index == 0
            && self.previous_hash.as_str() == BlockHash::GENESIS_PARENT
            && self.validator.is_system()
    }

    pub fn tx_hashes(&self) -> impl Iterator<Item = TxHash> + '_ {
        self.transactions.iter().map(Transaction::hash)
    }

    /// Fees collectable by the proposer: the sum over non-SYSTEM transactions.
    pub fn collected_fees(&self) -> Amount {
        self.transactions
            .iter()
            .filter(|tx| !tx.is_system())
            .map(|tx| tx.fee)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_deterministic() {
        let a = Block::genesis();
        let b = Block::genesis();
        assert_eq!(a.hash, b.hash);
        assert!(a.has_valid_hash());
        assert!(a.is_genesis_shaped());
        assert_eq!(a.transactions.len(), 1);
        assert_eq!(a.transactions[0].recipient, Address::genesis());
        assert!(a.transactions[0].amount.is_zero());
    }

    #[test]
    fn any_field_change_changes_hash() {
        let g = Block::genesis();
        let b = Block::new(
            1,
            Timestamp::new(GENESIS_TIMESTAMP + 10.0),
            vec![],
            g.hash.clone(),
            Address::new("Qv"),
            Amount::new(100.0),
        );
        let mut tampered = b.clone();
        tampered.stake = Amount::new(101.0);
        assert!(!tampered.has_valid_hash());

        let mut tampered = b.clone();
        tampered.validator = Address::new("Qw");
        assert!(!tampered.has_valid_hash());

        let mut tampered = b;
        tampered.index = 2;
        assert!(!tampered.has_valid_hash());
    }

    #[test]
    fn hash_covers_transaction_signature() {
        let mut tx = Transaction::transfer(
            Address::new("Qa"),
            Address::new("Qb"),
            Amount::new(1.0),
            Amount::ZERO,
            0,
            Timestamp::new(GENESIS_TIMESTAMP),
        );
        tx.signature = Some(qnode_types::Signature::new("a".repeat(128)));
        let block = Block::new(
            1,
            Timestamp::new(GENESIS_TIMESTAMP),
            vec![tx],
            BlockHash::new("p"),
            Address::system(),
            Amount::ZERO,
        );
        let mut tampered = block.clone();
        tampered.transactions[0].signature = Some(qnode_types::Signature::new("b".repeat(128)));
        assert!(!tampered.has_valid_hash());
    }

    #[test]
    fn collected_fees_skip_system() {
        let user = Transaction::transfer(
            Address::new("Qa"),
            Address::new("Qb"),
            Amount::new(1.0),
            Amount::new(0.5),
            0,
            Timestamp::new(0.0),
        );
        let mut sys = Transaction::system(Address::new("Qa"), Amount::new(10.0), TxType::Mint, Timestamp::new(0.0));
        sys.fee = Amount::new(3.0);
        let block = Block::new(
            1,
            Timestamp::new(0.0),
            vec![user, sys],
            BlockHash::new("p"),
            Address::new("Qv"),
            Amount::ZERO,
        );
        assert_eq!(block.collected_fees(), Amount::new(0.5));
    }
}

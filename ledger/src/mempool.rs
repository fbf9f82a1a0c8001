//! Pool of admitted, unsettled transactions.
//!
//! FIFO order determines inclusion order. Membership is O(1) via a hash
//! set, and a per-sender count backs the pending quota.

use qnode_types::{Address, Amount, TxHash};
use std::collections::{HashMap, HashSet};

use crate::transaction::Transaction;

#[derive(Clone, Debug)]
struct Pending {
    hash: TxHash,
    tx: Transaction,
}

/// Ordered mempool with a cached fee total.
#[derive(Clone, Debug, Default)]
pub struct Mempool {
    entries: Vec<Pending>,
    hashes: HashSet<TxHash>,
    per_sender: HashMap<Address, usize>,
    fees_pool: Amount,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a pool from an ordered list, e.g. a snapshot.
    pub fn from_transactions(txs: impl IntoIterator<Item = Transaction>) -> Self {
        let mut pool = Self::new();
        for tx in txs {
            pool.push(tx.hash(), tx);
        }
        pool
    }

    /// Append without checks. Admission rules live in [`crate::Ledger`].
    pub fn push(&mut self, hash: TxHash, tx: Transaction) {
        if !self.hashes.insert(hash.clone()) {
            return;
        }
        *self.per_sender.entry(tx.sender.clone()).or_insert(0) += 1;
        self.fees_pool += tx.fee;
        self.entries.push(Pending { hash, tx });
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.hashes.contains(hash)
    }

    pub fn pending_for(&self, sender: &Address) -> usize {
        self.per_sender.get(sender).copied().unwrap_or(0)
    }

    /// Highest nonce pending from `sender`, skipping hashes in `exclude`.
    pub fn max_nonce_for(&self, sender: &Address, exclude: &HashSet<TxHash>) -> Option<u64> {
        self.entries
            .iter()
            .filter(|p| &p.tx.sender == sender && !exclude.contains(&p.hash))
            .map(|p| p.tx.nonce)
            .max()
    }

    /// Up to `n` transactions from the front, in FIFO order.
    pub fn front(&self, n: usize) -> impl Iterator<Item = (&TxHash, &Transaction)> {
        self.entries.iter().take(n).map(|p| (&p.hash, &p.tx))
    }

    /// Drop every entry whose hash is in `hashes` and recompute the fee pool.
    pub fn remove(&mut self, hashes: &HashSet<TxHash>) {
        if hashes.is_empty() {
            return;
        }
        self.entries.retain(|p| !hashes.contains(&p.hash));
        self.hashes.retain(|h| !hashes.contains(h));
        self.per_sender.clear();
        for p in &self.entries {
            *self.per_sender.entry(p.tx.sender.clone()).or_insert(0) += 1;
        }
        self.fees_pool = self.entries.iter().map(|p| p.tx.fee).sum();
    }

    /// Cached sum of pending fees.
    pub fn fees_pool(&self) -> Amount {
        self.fees_pool
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.iter().map(|p| &p.tx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnode_types::Timestamp;

    fn tx(sender: &str, nonce: u64, fee: f64) -> Transaction {
        Transaction::transfer(
            Address::new(sender),
            Address::new("Qr"),
            Amount::new(1.0),
            Amount::new(fee),
            nonce,
            Timestamp::new(100.0),
        )
    }

    #[test]
    fn push_tracks_counts_and_fees() {
        let mut pool = Mempool::new();
        let a = tx("Qa", 0, 0.5);
        let b = tx("Qa", 1, 0.25);
        pool.push(a.hash(), a.clone());
        pool.push(b.hash(), b);
        pool.push(a.hash(), a);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.pending_for(&Address::new("Qa")), 2);
        assert_eq!(pool.fees_pool(), Amount::new(0.75));
    }

    #[test]
    fn remove_recomputes() {
        let mut pool = Mempool::new();
        let a = tx("Qa", 0, 0.5);
        let b = tx("Qb", 0, 0.25);
        pool.push(a.hash(), a.clone());
        pool.push(b.hash(), b.clone());
        pool.remove(&HashSet::from([a.hash()]));
        assert_eq!(pool.len(), 1);
        assert!(!pool.contains(&a.hash()));
        assert!(pool.contains(&b.hash()));
        assert_eq!(pool.pending_for(&Address::new("Qa")), 0);
        assert_eq!(pool.fees_pool(), Amount::new(0.25));
    }

    #[test]
    fn max_nonce_respects_exclusions() {
        let mut pool = Mempool::new();
        let a0 = tx("Qa", 0, 0.0);
        let a4 = tx("Qa", 4, 0.0);
        pool.push(a0.hash(), a0);
        pool.push(a4.hash(), a4.clone());
        let sender = Address::new("Qa");
        assert_eq!(pool.max_nonce_for(&sender, &HashSet::new()), Some(4));
        assert_eq!(pool.max_nonce_for(&sender, &HashSet::from([a4.hash()])), Some(0));
        assert_eq!(pool.max_nonce_for(&Address::new("Qz"), &HashSet::new()), None);
    }

    #[test]
    fn front_is_fifo() {
        let mut pool = Mempool::new();
        for n in 0..5 {
            let t = tx("Qa", n, 0.0);
            pool.push(t.hash(), t);
        }
        let nonces: Vec<u64> = pool.front(3).map(|(_, t)| t.nonce).collect();
        assert_eq!(nonces, vec![0, 1, 2]);
    }
}

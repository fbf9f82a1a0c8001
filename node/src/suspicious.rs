//! Suspicious-activity log.
//!
//! A bounded ring of the most recent rejections that look like abuse
//! (expired or malformed transactions, double spends, pool spam, replayed
//! or mis-nonced transactions inside received blocks). Observability only:
//! recording never blocks anything.

use qnode_ledger::{AdmissionError, BlockRejection, Transaction};
use qnode_types::Timestamp;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspicionCategory {
    TransactionExpired,
    InvalidTransaction,
    DoubleSpendAttempt,
    SpamAttempt,
    InvalidBlockTransaction,
    ReplayAttackAttempt,
    InvalidNonceInBlock,
}

impl SuspicionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransactionExpired => "transaction_expired",
            Self::InvalidTransaction => "invalid_transaction",
            Self::DoubleSpendAttempt => "double_spend_attempt",
            Self::SpamAttempt => "spam_attempt",
            Self::InvalidBlockTransaction => "invalid_block_transaction",
            Self::ReplayAttackAttempt => "replay_attack_attempt",
            Self::InvalidNonceInBlock => "invalid_nonce_in_block",
        }
    }
}

impl fmt::Display for SuspicionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category and details for an admission rejection, or `None` when the
/// rejection is ordinary (insufficient funds, duplicates).
pub fn classify_admission(
    tx: &Transaction,
    error: &AdmissionError,
    now: Timestamp,
) -> Option<(SuspicionCategory, Value)> {
    match error {
        AdmissionError::Invalid(e) if e.is_expiry() => Some((
            SuspicionCategory::TransactionExpired,
            json!({
                "sender": tx.sender,
                "age_seconds": tx.timestamp.elapsed_since(now),
            }),
        )),
        AdmissionError::Invalid(e) => Some((
            SuspicionCategory::InvalidTransaction,
            json!({ "sender": tx.sender, "reason": e.to_string() }),
        )),
        AdmissionError::StaleNonce { expected, received } => Some((
            SuspicionCategory::DoubleSpendAttempt,
            json!({
                "sender": tx.sender,
                "expected_nonce": expected,
                "received_nonce": received,
            }),
        )),
        AdmissionError::PoolQuotaExceeded { pending, .. } => Some((
            SuspicionCategory::SpamAttempt,
            json!({ "sender": tx.sender, "pending_count": pending }),
        )),
        _ => None,
    }
}

/// Category and details for a block rejection, or `None` when it is a
/// plain protocol mismatch (stale tip, unknown validator, ...).
pub fn classify_block(block_index: u64, rejection: &BlockRejection) -> Option<(SuspicionCategory, Value)> {
    match rejection {
        BlockRejection::InvalidTransaction { hash, reason } => Some((
            SuspicionCategory::InvalidBlockTransaction,
            json!({
                "block_index": block_index,
                "tx_hash": hash.short(),
                "reason": reason.to_string(),
            }),
        )),
        BlockRejection::Replay(hash) => Some((
            SuspicionCategory::ReplayAttackAttempt,
            json!({ "block_index": block_index, "tx_hash": hash.short() }),
        )),
        BlockRejection::InvalidNonce {
            hash,
            sender,
            expected,
            received,
        } => Some((
            SuspicionCategory::InvalidNonceInBlock,
            json!({
                "block_index": block_index,
                "tx_hash": hash.short(),
                "sender": sender,
                "expected_nonce": expected,
                "received_nonce": received,
            }),
        )),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SuspiciousActivity {
    pub timestamp: Timestamp,
    #[serde(rename = "type")]
    pub category: SuspicionCategory,
    pub details: Value,
    /// Request origin, usually the client IP.
    pub source: String,
}

pub struct SuspiciousLog {
    entries: VecDeque<SuspiciousActivity>,
    capacity: usize,
}

impl SuspiciousLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a record, evicting the oldest when full, and emit it as a
    /// `warn!` event.
    pub fn record(
        &mut self,
        category: SuspicionCategory,
        details: Value,
        source: &str,
        now: Timestamp,
    ) {
        tracing::warn!(%category, %details, source, "suspicious activity");
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(SuspiciousActivity {
            timestamp: now,
            category,
            details,
            source: source.to_string(),
        });
    }

    /// The `limit` most recent records, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<SuspiciousActivity> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
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
    use qnode_ledger::TransactionError;
    use qnode_types::{Address, Amount, TxHash};

    fn tx() -> Transaction {
        Transaction::transfer(
            Address::new("Qa"),
            Address::new("Qb"),
            Amount::new(1.0),
            Amount::ZERO,
            0,
            Timestamp::new(100.0),
        )
    }

    #[test]
    fn ring_keeps_the_newest() {
        let mut log = SuspiciousLog::new(3);
        for i in 0..5 {
            log.record(
                SuspicionCategory::SpamAttempt,
                json!({ "i": i }),
                "1.2.3.4",
                Timestamp::new(i as f64),
            );
        }
        assert_eq!(log.len(), 3);
        let recent = log.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].details["i"], 3);
        assert_eq!(recent[1].details["i"], 4);
        assert_eq!(log.recent(100).len(), 3);
    }

    #[test]
    fn stale_nonce_is_a_double_spend() {
        let error = AdmissionError::StaleNonce {
            expected: 2,
            received: 1,
        };
        let (category, details) = classify_admission(&tx(), &error, Timestamp::new(100.0)).unwrap();
        assert_eq!(category, SuspicionCategory::DoubleSpendAttempt);
        assert_eq!(details["expected_nonce"], 2);
        assert_eq!(details["received_nonce"], 1);
    }

    #[test]
    fn expiry_is_distinguished_from_malformed() {
        let expired = AdmissionError::Invalid(TransactionError::Expired {
            age_secs: 4000.0,
            max_age_secs: 3600,
        });
        let malformed = AdmissionError::Invalid(TransactionError::MissingSignature);
        let now = Timestamp::new(4100.0);
        assert_eq!(
            classify_admission(&tx(), &expired, now).unwrap().0,
            SuspicionCategory::TransactionExpired
        );
        assert_eq!(
            classify_admission(&tx(), &malformed, now).unwrap().0,
            SuspicionCategory::InvalidTransaction
        );
    }

    #[test]
    fn insufficient_funds_is_not_suspicious() {
        let error = AdmissionError::InsufficientFunds {
            needed: Amount::new(2.0),
            available: Amount::new(1.0),
        };
        assert!(classify_admission(&tx(), &error, Timestamp::new(100.0)).is_none());
    }

    #[test]
    fn replay_in_block_is_classified() {
        let rejection = BlockRejection::Replay(TxHash::new("ab".repeat(32)));
        let (category, details) = classify_block(7, &rejection).unwrap();
        assert_eq!(category, SuspicionCategory::ReplayAttackAttempt);
        assert_eq!(details["block_index"], 7);
        assert_eq!(details["tx_hash"], "ab".repeat(8));
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&SuspicionCategory::InvalidNonceInBlock).unwrap();
        assert_eq!(json, r#""invalid_nonce_in_block""#);
    }
}

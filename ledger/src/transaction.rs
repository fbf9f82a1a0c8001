//! Transactions: an immutable intent to move value.

use qnode_crypto::{sha3_256_hex, sign_message};
use qnode_types::{Address, Amount, KeyPair, Signature, Timestamp, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TransactionError;

/// Transaction kind. Only informational: every kind follows the same
/// debit/credit rules, with SYSTEM senders exempt from debits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TxType {
    #[default]
    Transfer,
    Mint,
    Distribution,
    ValidatorReward,
    Other(String),
}

impl TxType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Transfer => "TRANSFER",
            Self::Mint => "MINT",
            Self::Distribution => "DISTRIBUTION",
            Self::ValidatorReward => "VALIDATOR_REWARD",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TxType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "TRANSFER" => Self::Transfer,
            "MINT" => Self::Mint,
            "DISTRIBUTION" => Self::Distribution,
            "VALIDATOR_REWARD" => Self::ValidatorReward,
            _ => Self::Other(s),
        }
    }
}

impl From<TxType> for String {
    fn from(t: TxType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_wire_fee() -> Amount {
    Amount::new(0.01)
}

/// A transfer of `amount` from `sender` to `recipient`, paying `fee` to the
/// block proposer.
///
/// The content hash covers sender, recipient, amount, fee, nonce and
/// timestamp; it is the transaction's identity for dedup and replay checks.
/// Signature and type are not part of the hash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Address,
    pub recipient: Address,
    pub amount: Amount,
    #[serde(default = "default_wire_fee")]
    pub fee: Amount,
    #[serde(default)]
    pub nonce: u64,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub signature: Option<Signature>,
    #[serde(default)]
    pub tx_type: TxType,
}

impl Transaction {
    /// An unsigned transfer.
    pub fn transfer(
        sender: Address,
        recipient: Address,
        amount: Amount,
        fee: Amount,
        nonce: u64,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            sender,
            recipient,
            amount,
            fee,
            nonce,
            timestamp,
            signature: None,
            tx_type: TxType::Transfer,
        }
    }

    /// A SYSTEM-sourced transaction. Carries no fee and needs no signature.
    pub fn system(recipient: Address, amount: Amount, tx_type: TxType, timestamp: Timestamp) -> Self {
        Self {
            sender: Address::system(),
            recipient,
            amount,
            fee: Amount::ZERO,
            nonce: 0,
            timestamp,
            signature: None,
            tx_type,
        }
    }

    pub fn with_type(mut self, tx_type: TxType) -> Self {
        self.tx_type = tx_type;
        self
    }

    pub fn is_system(&self) -> bool {
        self.sender.is_system()
    }

    /// `amount + fee`, the sender's debit when the transaction settles.
    pub fn total_debit(&self) -> Amount {
        self.amount + self.fee
    }

    /// SHA3-256 of `sender‖recipient‖amount‖fee‖nonce‖timestamp`.
    pub fn hash(&self) -> TxHash {
        let preimage = format!(
            "{}{}{}{}{}{}",
            self.sender,
            self.recipient,
            self.amount.canonical(),
            self.fee.canonical(),
            self.nonce,
            self.timestamp.canonical(),
        );
        TxHash::new(sha3_256_hex(preimage))
    }

    /// Sign the content hash with the sender's wallet.
    pub fn sign(&mut self, wallet: &KeyPair) -> Result<(), TransactionError> {
        if wallet.address != self.sender {
            return Err(TransactionError::WalletMismatch {
                wallet: wallet.address.clone(),
                sender: self.sender.clone(),
            });
        }
        let hash = self.hash();
        self.signature = Some(sign_message(hash.as_str(), &wallet.private_key));
        Ok(())
    }

    pub fn is_expired(&self, now: Timestamp, max_age_secs: u64) -> bool {
        self.timestamp.is_older_than(max_age_secs, now)
    }

    /// Well-formedness and freshness. SYSTEM transactions always pass.
    pub fn validate(&self, now: Timestamp, max_age_secs: u64) -> Result<(), TransactionError> {
        if self.is_system() {
            return Ok(());
        }
        let signature = self
            .signature
            .as_ref()
            .ok_or(TransactionError::MissingSignature)?;
        if !signature.has_valid_shape() {
            return Err(TransactionError::MalformedSignature);
        }
        if !self.amount.is_positive() {
            return Err(TransactionError::NonPositiveAmount(self.amount));
        }
        if self.fee.is_negative() {
            return Err(TransactionError::NegativeFee(self.fee));
        }
        if self.is_expired(now, max_age_secs) {
            return Err(TransactionError::Expired {
                age_secs: self.timestamp.elapsed_since(now),
                max_age_secs,
            });
        }
        Ok(())
    }

    pub fn is_valid(&self, now: Timestamp, max_age_secs: u64) -> bool {
        self.validate(now, max_age_secs).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnode_crypto::keypair_from_seed;

    const MAX_AGE: u64 = 3600;

    fn signed(amount: f64, fee: f64, ts: f64) -> Transaction {
        let wallet = keypair_from_seed(&[1u8; 32]);
        let mut tx = Transaction::transfer(
            wallet.address.clone(),
            Address::new("Qrecipient"),
            Amount::new(amount),
            Amount::new(fee),
            0,
            Timestamp::new(ts),
        );
        tx.sign(&wallet).unwrap();
        tx
    }

    #[test]
    fn hash_uses_canonical_floats() {
        let tx = Transaction::transfer(
            Address::new("A"),
            Address::new("B"),
            Amount::new(5.0),
            Amount::new(0.01),
            2,
            Timestamp::new(1_700_000_000.5),
        );
        assert_eq!(
            tx.hash().as_str(),
            sha3_256_hex("AB5.00.0121700000000.5")
        );
    }

    #[test]
    fn hash_ignores_signature_and_type() {
        let tx = signed(5.0, 0.01, 1000.0);
        let mut other = tx.clone().with_type(TxType::Distribution);
        other.signature = None;
        assert_eq!(tx.hash(), other.hash());
    }

    #[test]
    fn signed_fresh_transaction_is_valid() {
        let tx = signed(5.0, 0.01, 1000.0);
        assert!(tx.validate(Timestamp::new(1000.0), MAX_AGE).is_ok());
    }

    #[test]
    fn sign_with_wrong_wallet_fails() {
        let wallet = keypair_from_seed(&[2u8; 32]);
        let mut tx = Transaction::transfer(
            Address::new("Qsomeoneelse"),
            Address::new("Qrecipient"),
            Amount::new(1.0),
            Amount::ZERO,
            0,
            Timestamp::new(0.0),
        );
        assert!(matches!(
            tx.sign(&wallet),
            Err(TransactionError::WalletMismatch { .. })
        ));
    }

    #[test]
    fn unsigned_or_malformed_signature_is_invalid() {
        let mut tx = signed(5.0, 0.01, 1000.0);
        tx.signature = None;
        assert_eq!(
            tx.validate(Timestamp::new(1000.0), MAX_AGE),
            Err(TransactionError::MissingSignature)
        );
        tx.signature = Some(Signature::new("xyz"));
        assert_eq!(
            tx.validate(Timestamp::new(1000.0), MAX_AGE),
            Err(TransactionError::MalformedSignature)
        );
    }

    #[test]
    fn any_well_formed_signature_passes() {
        let mut tx = signed(5.0, 0.01, 1000.0);
        tx.signature = Some(Signature::new("f".repeat(128)));
        assert!(tx.is_valid(Timestamp::new(1000.0), MAX_AGE));
    }

    #[test]
    fn amounts_are_checked() {
        let tx = signed(0.0, 0.01, 1000.0);
        assert!(matches!(
            tx.validate(Timestamp::new(1000.0), MAX_AGE),
            Err(TransactionError::NonPositiveAmount(_))
        ));
        let tx = signed(1.0, -0.5, 1000.0);
        assert!(matches!(
            tx.validate(Timestamp::new(1000.0), MAX_AGE),
            Err(TransactionError::NegativeFee(_))
        ));
    }

    #[test]
    fn expiry_boundary() {
        let tx = signed(1.0, 0.0, 1000.0);
        assert!(tx.is_valid(Timestamp::new(4600.0), MAX_AGE));
        let err = tx.validate(Timestamp::new(4601.0), MAX_AGE).unwrap_err();
        assert!(err.is_expiry());
    }

    #[test]
    fn system_transactions_are_always_valid() {
        let tx = Transaction::system(
            Address::new("Qx"),
            Amount::ZERO,
            TxType::Mint,
            Timestamp::new(0.0),
        );
        assert!(tx.is_valid(Timestamp::new(1e9), MAX_AGE));
    }

    #[test]
    fn wire_defaults() {
        let tx: Transaction = serde_json::from_str(
            r#"{"sender":"A","recipient":"B","amount":1.0,"timestamp":5.0}"#,
        )
        .unwrap();
        assert_eq!(tx.fee, Amount::new(0.01));
        assert_eq!(tx.nonce, 0);
        assert_eq!(tx.tx_type, TxType::Transfer);
        assert!(tx.signature.is_none());
    }

    #[test]
    fn tx_type_roundtrips_unknown_tags() {
        let t: TxType = serde_json::from_str(r#""AIRDROP""#).unwrap();
        assert_eq!(t, TxType::Other("AIRDROP".into()));
        assert_eq!(serde_json::to_string(&t).unwrap(), r#""AIRDROP""#);
    }
}

use qnode_types::{Address, Amount, BlockHash, TxHash};
use thiserror::Error;

/// A transaction failed its own well-formedness or freshness check.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransactionError {
    #[error("transaction is not signed")]
    MissingSignature,

    #[error("signature must be 128 hex characters")]
    MalformedSignature,

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Amount),

    #[error("fee must not be negative, got {0}")]
    NegativeFee(Amount),

    #[error("transaction expired: {age_secs:.0}s old, max {max_age_secs}s")]
    Expired { age_secs: f64, max_age_secs: u64 },

    #[error("signing wallet {wallet} does not match sender {sender}")]
    WalletMismatch { wallet: Address, sender: Address },
}

impl TransactionError {
    pub fn is_expiry(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }
}

/// Mempool admission rejected a transaction. No state was changed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdmissionError {
    #[error("invalid transaction: {0}")]
    Invalid(#[from] TransactionError),

    #[error("invalid nonce (expected: {expected}, received: {received}), possible double spend")]
    StaleNonce { expected: u64, received: u64 },

    #[error("nonce {0} leaves no successor nonce for this sender")]
    NonceExhausted(u64),

    #[error("transaction {0} already settled (replay)")]
    AlreadySettled(TxHash),

    #[error("transaction {0} already pending")]
    DuplicatePending(TxHash),

    #[error("too many pending transactions for this address ({pending}, max: {max})")]
    PoolQuotaExceeded { pending: usize, max: usize },

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },
}

/// A block received from a peer was refused. No state was changed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BlockRejection {
    #[error("block hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch { stored: BlockHash, computed: BlockHash },

    #[error("block index {received} does not extend chain of length {expected}")]
    WrongIndex { expected: u64, received: u64 },

    #[error("previous hash {received} does not match tip {expected}")]
    WrongPrevious { expected: BlockHash, received: BlockHash },

    #[error("invalid transaction in block: {hash}: {reason}")]
    InvalidTransaction { hash: TxHash, reason: TransactionError },

    #[error("transaction already settled (replay): {0}")]
    Replay(TxHash),

    #[error("invalid nonce in transaction {hash} from {sender} (expected: {expected}, received: {received})")]
    InvalidNonce {
        hash: TxHash,
        sender: Address,
        expected: u64,
        received: u64,
    },

    #[error("transaction {hash} from {sender} uses the last possible nonce")]
    NonceExhausted { hash: TxHash, sender: Address },

    #[error("insufficient funds in transaction {hash}: need {needed}, have {available}")]
    InsufficientFunds {
        hash: TxHash,
        needed: Amount,
        available: Amount,
    },

    #[error("unknown validator {0}")]
    UnknownValidator(Address),

    #[error("validator {validator} stake mismatch: recorded {recorded}, claimed {claimed}")]
    StakeMismatch {
        validator: Address,
        recorded: Amount,
        claimed: Amount,
    },

    #[error("block too large: {count} transactions (max: {max})")]
    Oversized { count: usize, max: usize },
}

/// Full-chain validation failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,

    #[error("genesis block is malformed")]
    BadGenesis,

    #[error("block {index} hash mismatch")]
    HashMismatch { index: u64 },

    #[error("block {index} does not link to its predecessor")]
    BrokenLink { index: u64 },

    #[error("block {index} contains invalid transaction {hash}: {reason}")]
    InvalidTransaction {
        index: u64,
        hash: TxHash,
        reason: TransactionError,
    },
}

/// A peer's full-ledger snapshot was not adopted.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncRejection {
    #[error("untrusted treasury anchor: received {received:?}, official {official}")]
    UntrustedTreasury {
        received: Option<Address>,
        official: Address,
    },

    #[error("candidate chain ({candidate}) is not longer than local chain ({local})")]
    NotLonger { candidate: usize, local: usize },

    #[error("candidate chain is invalid: {0}")]
    InvalidChain(#[from] ChainError),
}

/// Ledger-level failure for operations outside admission and acceptance.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("stake {stake} below minimum {min}")]
    StakeBelowMinimum { stake: Amount, min: Amount },

    #[error("insufficient funds to stake: need {needed}, have {available}")]
    InsufficientStakeFunds { needed: Amount, available: Amount },

    #[error("no treasury configured")]
    NoTreasury,

    #[error("treasury amount must be positive, got {0}")]
    NonPositiveTreasuryAmount(Amount),

    #[error("treasury already initialised (balance {0})")]
    TreasuryInitialised(Amount),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

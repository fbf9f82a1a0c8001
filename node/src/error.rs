use qnode_crypto::CryptoError;
use qnode_ledger::{AdmissionError, BlockRejection, LedgerError, SyncRejection, TransactionError};
use qnode_network::{NetworkError, PeerError};
use qnode_types::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    /// Mempool admission refused the transaction. Carries the sender's
    /// current nonce and pending count so the client can self-correct.
    #[error("{error}")]
    Admission {
        #[source]
        error: AdmissionError,
        expected_nonce: u64,
        pending: usize,
    },

    #[error("invalid transaction: {0}")]
    Transaction(#[from] TransactionError),

    #[error("block rejected: {0}")]
    BlockRejected(#[from] BlockRejection),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("sync rejected: {0}")]
    Sync(#[from] SyncRejection),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("invalid key: {0}")]
    Crypto(#[from] CryptoError),

    #[error("private key does not match sender {sender}")]
    KeyMismatch { sender: Address },

    #[error("private key does not match the treasury")]
    TreasuryKeyMismatch,

    #[error("SYSTEM transactions cannot be submitted from outside the node")]
    SystemSender,

    #[error("nothing to include in a block")]
    NothingToProduce,

    #[error("rate limit exceeded: max {max_requests} requests per {window_secs}s")]
    RateLimited {
        max_requests: usize,
        window_secs: u64,
        retry_after_secs: u64,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

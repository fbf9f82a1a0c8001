//! Proof-of-stake chain ledger.
//!
//! A single append-only chain of blocks plus derived account state
//! (spendable balances, stakes, activity). Blocks are assembled locally
//! from the mempool by a stake-weighted proposer, or accepted from peers
//! after the same validation rules. Synchronisation replaces the whole
//! ledger with a strictly longer valid chain ("longest valid chain wins").

pub mod block;
pub mod canonical;
pub mod error;
pub mod ledger;
pub mod mempool;
pub mod snapshot;
pub mod sync;
pub mod transaction;
pub mod validators;

pub use block::{Block, GENESIS_TIMESTAMP};
pub use error::{
    AdmissionError, BlockRejection, ChainError, LedgerError, SyncRejection, TransactionError,
};
pub use ledger::{replay_balances, validate_chain, AccountInfo, BalanceDiscrepancy, Ledger};
pub use mempool::Mempool;
pub use snapshot::LedgerSnapshot;
pub use sync::SyncOutcome;
pub use transaction::{Transaction, TxType};
pub use validators::ValidatorSet;
